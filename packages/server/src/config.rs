//! Command line configuration.

use std::time::Duration;

use clap::Parser;

use crate::usecase::{ManagerConfig, manager::QUEUE_POLL_INTERVAL};

/// Hiroba publish/subscribe connection server
#[derive(Parser, Debug, Clone)]
#[command(name = "hiroba-server", version, about = "Hiroba publish/subscribe connection server")]
pub struct Args {
    /// Bind address
    #[arg(long, env = "HIROBA_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "HIROBA_PORT", default_value_t = 8080)]
    pub port: u16,

    /// Shared admin secret; without it nobody can authenticate
    #[arg(long, env = "HIROBA_PASSWORD")]
    pub password: Option<String>,

    /// Name of the job queue to poll
    #[arg(long, default_value = "default")]
    pub queue: String,

    /// Broadcast CurrentUptime at this interval (milliseconds)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub uptime_interval_ms: Option<u64>,

    /// Stop the server after this many minutes
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub auto_restart_minutes: Option<u64>,

    /// Default log level when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

/// Where the HTTP server binds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Everything `run` needs.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub manager: ManagerConfig,
}

impl From<Args> for AppConfig {
    fn from(args: Args) -> Self {
        Self {
            server: ServerConfig {
                host: args.host,
                port: args.port,
            },
            manager: ManagerConfig {
                // An empty secret would let an empty password through
                password: args.password.filter(|password| !password.is_empty()),
                queue: args.queue,
                queue_interval: QUEUE_POLL_INTERVAL,
                uptime_interval: args.uptime_interval_ms.map(Duration::from_millis),
                auto_restart: args
                    .auto_restart_minutes
                    .map(|minutes| Duration::from_secs(minutes * 60)),
            },
        }
    }
}
