//! Reconciler entry point
//!
//! Run with:
//! ```bash
//! cargo run -p roomsync-reconciler
//! ```
//!
//! Configuration is loaded from environment variables.

use roomsync_common::{try_init_tracing, AppConfig, AppError, TracingConfig};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    // Load configuration first; it decides the log format
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            let e = AppError::from(e);
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(e.exit_code());
        }
    };

    if let Err(e) = try_init_tracing(TracingConfig::for_environment(config.app.env)) {
        eprintln!("Warning: Failed to initialize tracing: {e}");
    }

    info!(
        env = ?config.app.env,
        default_provider = %config.communication.default_provider,
        "Configuration loaded"
    );

    if let Err(e) = roomsync_reconciler::run(config).await {
        error!(code = e.error_code(), error = %e, "Reconciler failed");
        std::process::exit(e.exit_code());
    }
}
