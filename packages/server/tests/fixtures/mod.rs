//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::{
    net::TcpStream,
    process::{Child, Command, Stdio},
    thread,
    time::{Duration, Instant},
};

/// Admin password every test server is started with
pub const PASSWORD: &str = "test-secret";

/// A `hiroba-server` process listening on a local port, killed on drop.
pub struct TestServer {
    port: u16,
    process: Child,
}

impl TestServer {
    /// Start the server binary and wait until it accepts TCP connections.
    pub fn start(port: u16) -> Self {
        Self::start_with_args(port, &[])
    }

    pub fn start_with_args(port: u16, extra: &[&str]) -> Self {
        let process = Command::new(env!("CARGO_BIN_EXE_hiroba-server"))
            .args(["--host", "127.0.0.1", "--port", &port.to_string()])
            .args(["--password", PASSWORD])
            .args(extra)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .expect("Failed to start hiroba-server");

        let server = Self { port, process };
        server.wait_until_ready(Duration::from_secs(10));
        server
    }

    fn wait_until_ready(&self, timeout: Duration) {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if TcpStream::connect(("127.0.0.1", self.port)).is_ok() {
                return;
            }
            thread::sleep(Duration::from_millis(50));
        }
        panic!("hiroba-server did not start on port {}", self.port);
    }

    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://127.0.0.1:{}/ws", self.port)
    }

    /// Whether the process has exited on its own.
    pub fn has_exited(&mut self) -> bool {
        matches!(self.process.try_wait(), Ok(Some(_)))
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.process.kill();
        let _ = self.process.wait();
    }
}
