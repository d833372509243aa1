//! HTTP API integration tests.
//!
//! Tests for REST API endpoints (health check, connection list, topic list, job queue).

mod fixtures;
use std::time::Duration;

use fixtures::TestServer;
use serde_json::{Value, json};

/// Poll `/api/topics` until `predicate` holds or two seconds pass.
async fn wait_for_topics(
    client: &reqwest::Client,
    server: &TestServer,
    predicate: impl Fn(&[Value]) -> bool,
) -> Vec<Value> {
    let mut topics = Vec::new();
    for _ in 0..40 {
        topics = client
            .get(format!("{}/api/topics", server.base_url()))
            .send()
            .await
            .expect("Failed to send request")
            .json::<Vec<Value>>()
            .await
            .expect("Failed to parse JSON");
        if predicate(&topics) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    topics
}

#[tokio::test]
async fn test_health_endpoint() {
    // テスト項目: /api/health エンドポイントが正常に動作する
    // given (前提条件):
    let port = 19080;
    let server = TestServer::start(port);
    let client = reqwest::Client::new();

    // when (操作):
    let response = client
        .get(format!("{}/api/health", server.base_url()))
        .send()
        .await
        .expect("Failed to send request");

    // then (期待する結果):
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["status"], "ok");
    assert_eq!(body["connections"], 0);
    assert_eq!(body["topics"], 0);
    assert!(body["uptime"].as_f64().unwrap() >= 0.0);
}

#[tokio::test]
async fn test_connections_list_endpoint_empty() {
    // テスト項目: /api/connections は接続がなければ空配列を返す
    // given (前提条件):
    let port = 19081;
    let server = TestServer::start(port);
    let client = reqwest::Client::new();

    // when (操作):
    let response = client
        .get(format!("{}/api/connections", server.base_url()))
        .send()
        .await
        .expect("Failed to send request");

    // then (期待する結果):
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.expect("Failed to parse JSON");
    assert!(body.is_array(), "Response should be an array");
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_register_topic_job() {
    // テスト項目: RegisterTopic ジョブを投入するとトピック一覧に反映される
    // given (前提条件):
    let port = 19082;
    let server = TestServer::start(port);
    let client = reqwest::Client::new();

    // when (操作):
    let response = client
        .post(format!("{}/api/jobs", server.base_url()))
        .json(&json!({"job": "RegisterTopic", "data": {"name": "lobby"}}))
        .send()
        .await
        .expect("Failed to send request");

    // then (期待する結果):
    assert_eq!(response.status(), 202);
    let accepted: Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(accepted["queue"], "default");
    assert!(accepted["id"].is_string());

    // キューはティックごとにポーリングされるので、反映を待つ
    let topics = wait_for_topics(&client, &server, |topics| !topics.is_empty()).await;
    assert_eq!(topics.len(), 1);
    assert_eq!(topics[0]["name"], "lobby");
    assert!(topics[0]["uuid"].is_string());
    assert_eq!(topics[0]["subscribers"], json!([]));
}

#[tokio::test]
async fn test_unregister_topic_job() {
    // テスト項目: UnregisterTopic ジョブで登録済みトピックが削除される
    // given (前提条件):
    let port = 19083;
    let server = TestServer::start(port);
    let client = reqwest::Client::new();
    client
        .post(format!("{}/api/jobs", server.base_url()))
        .json(&json!({"job": "RegisterTopic", "data": {"name": "lobby"}}))
        .send()
        .await
        .expect("Failed to send request");
    let topics = wait_for_topics(&client, &server, |topics| !topics.is_empty()).await;
    let uuid = topics[0]["uuid"].clone();

    // when (操作):
    let response = client
        .post(format!("{}/api/jobs", server.base_url()))
        .json(&json!({"job": "UnregisterTopic", "data": {"topic": uuid}}))
        .send()
        .await
        .expect("Failed to send request");

    // then (期待する結果):
    assert_eq!(response.status(), 202);
    let topics = wait_for_topics(&client, &server, |topics| topics.is_empty()).await;
    assert!(topics.is_empty());
}

#[tokio::test]
async fn test_unknown_job_is_rejected() {
    // テスト項目: 存在しないコマンド名のジョブは 400 Bad Request になる
    // given (前提条件):
    let port = 19084;
    let server = TestServer::start(port);
    let client = reqwest::Client::new();

    // when (操作):
    let response = client
        .post(format!("{}/api/jobs", server.base_url()))
        .json(&json!({"job": "LaunchRockets", "data": {}}))
        .send()
        .await
        .expect("Failed to send request");

    // then (期待する結果):
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn test_job_without_data_is_accepted() {
    // テスト項目: data を省略したジョブも受け付けられる（引数の検証はワーカー側で行う）
    // given (前提条件):
    let port = 19085;
    let server = TestServer::start(port);
    let client = reqwest::Client::new();

    // when (操作):
    let response = client
        .post(format!("{}/api/jobs", server.base_url()))
        .json(&json!({"job": "RunQueuedCommands"}))
        .send()
        .await
        .expect("Failed to send request");

    // then (期待する結果):
    assert_eq!(response.status(), 202);
}

#[tokio::test]
async fn test_stop_server_job_stops_process() {
    // テスト項目: StopServer ジョブでサーバープロセスが終了する
    // given (前提条件):
    let port = 19086;
    let mut server = TestServer::start(port);
    let client = reqwest::Client::new();

    // when (操作):
    let response = client
        .post(format!("{}/api/jobs", server.base_url()))
        .json(&json!({"job": "StopServer"}))
        .send()
        .await
        .expect("Failed to send request");

    // then (期待する結果):
    assert_eq!(response.status(), 202);
    let mut exited = false;
    for _ in 0..100 {
        if server.has_exited() {
            exited = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert!(exited, "Server should exit after StopServer");
}
