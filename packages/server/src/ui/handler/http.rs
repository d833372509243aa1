//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode};

use crate::{
    infrastructure::dto::http::{
        ConnectionSummaryDto, HealthDto, JobAcceptedDto, JobRequestDto, TopicSummaryDto,
    },
    ui::state::AppState,
    usecase::CommandKind,
};

/// Health check endpoint
pub async fn health_check(State(state): State<Arc<AppState>>) -> (StatusCode, Json<HealthDto>) {
    match state.handle.inspect().await {
        Some(snapshot) => (
            StatusCode::OK,
            Json(HealthDto {
                status: "ok".to_string(),
                connections: snapshot.connections.len(),
                topics: snapshot.topics.len(),
                uptime: snapshot.uptime,
            }),
        ),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthDto {
                status: "stopped".to_string(),
                connections: 0,
                topics: 0,
                uptime: 0.0,
            }),
        ),
    }
}

/// Get list of open connections
pub async fn get_connections(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ConnectionSummaryDto>>, StatusCode> {
    let snapshot = state
        .handle
        .inspect()
        .await
        .ok_or(StatusCode::SERVICE_UNAVAILABLE)?;

    Ok(Json(
        snapshot
            .connections
            .iter()
            .map(ConnectionSummaryDto::from)
            .collect(),
    ))
}

/// Get list of registered topics
pub async fn get_topics(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<TopicSummaryDto>>, StatusCode> {
    let snapshot = state
        .handle
        .inspect()
        .await
        .ok_or(StatusCode::SERVICE_UNAVAILABLE)?;

    Ok(Json(snapshot.topics.iter().map(TopicSummaryDto::from).collect()))
}

/// Push a job onto the queue the Manager polls
pub async fn enqueue_job(
    State(state): State<Arc<AppState>>,
    Json(request): Json<JobRequestDto>,
) -> Result<(StatusCode, Json<JobAcceptedDto>), StatusCode> {
    if CommandKind::from_name(&request.job).is_err() {
        tracing::warn!("Rejecting job for unknown command '{}'", request.job);
        return Err(StatusCode::BAD_REQUEST);
    }

    let body = serde_json::to_string(&request).map_err(|e| {
        tracing::error!("Failed to encode job '{}': {}", request.job, e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    let job = state.jobs.push(&state.queue, body).map_err(|e| {
        tracing::warn!("Failed to enqueue job '{}': {}", request.job, e);
        StatusCode::SERVICE_UNAVAILABLE
    })?;
    tracing::info!(job = %job.id(), queue = %job.queue(), "Job '{}' enqueued", request.job);

    Ok((
        StatusCode::ACCEPTED,
        Json(JobAcceptedDto {
            id: job.id().to_string(),
            queue: job.queue().to_string(),
        }),
    ))
}
