//! Hiroba publish/subscribe connection server.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin hiroba-server -- --password secret
//! ```

use clap::Parser;
use hiroba_server::{AppConfig, Args};
use hiroba_shared::logger::setup_logger;

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), &args.log_level);

    // Run the server
    if let Err(e) = hiroba_server::run(AppConfig::from(args)).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
