//! Tracing setup for the roomsync binaries
//!
//! `RUST_LOG` always wins over the level picked here.

use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::config::Environment;

/// Log output settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TracingConfig {
    /// Level used when `RUST_LOG` is unset
    pub default_level: Level,
    /// One JSON object per line instead of human readable output
    pub json: bool,
    /// Log span open and close, useful to time provider calls
    pub span_events: bool,
}

impl TracingConfig {
    /// Output suited to the deployment environment
    ///
    /// Development gets debug logs with spans; production gets JSON.
    #[must_use]
    pub fn for_environment(env: Environment) -> Self {
        Self {
            default_level: match env {
                Environment::Development => Level::DEBUG,
                Environment::Staging | Environment::Production => Level::INFO,
            },
            json: env == Environment::Production,
            span_events: env == Environment::Development,
        }
    }
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self::for_environment(Environment::default())
    }
}

/// Install the global subscriber
///
/// Fails instead of panicking when one is already installed, so tests and
/// binaries can both call it.
pub fn try_init_tracing(config: TracingConfig) -> Result<(), TracingError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.default_level.to_string()));
    let span_events = if config.span_events {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    // Exactly one of the two layers is present
    let (json, plain) = if config.json {
        (Some(fmt::layer().json().with_span_events(span_events)), None)
    } else {
        (None, Some(fmt::layer().with_span_events(span_events)))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(json)
        .with(plain)
        .try_init()
        .map_err(|_| TracingError::AlreadyInitialized)
}

#[derive(Debug, thiserror::Error)]
pub enum TracingError {
    #[error("Tracing subscriber already initialized")]
    AlreadyInitialized,
}
