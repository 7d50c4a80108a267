//! Application configuration structs
//!
//! Loads configuration from environment variables (and a `.env` file).

use roomsync_core::ProviderId;
use serde::Deserialize;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub app: AppSettings,
    pub communication: CommunicationConfig,
    pub database: DatabaseConfig,
    /// Present when a Matrix homeserver is configured
    pub matrix: Option<MatrixConfig>,
    pub reconcile: ReconcileConfig,
}

/// General application settings
#[derive(Debug, Clone, Deserialize)]
pub struct AppSettings {
    #[serde(default = "default_app_name")]
    pub name: String,
    #[serde(default = "default_env")]
    pub env: Environment,
}

/// Environment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    #[must_use]
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }
}

/// Communication subsystem switches
#[derive(Debug, Clone)]
pub struct CommunicationConfig {
    /// Global capability switch; when false every helper is a no-op
    pub enabled: bool,
    /// Provider given to newly configured course rooms
    pub default_provider: ProviderId,
}

impl Default for CommunicationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            default_provider: ProviderId::None,
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Matrix homeserver configuration
#[derive(Clone, Deserialize)]
pub struct MatrixConfig {
    pub homeserver_url: String,
    pub access_token: String,
    /// Server part of generated Matrix user ids
    pub server_name: String,
    #[serde(default = "default_matrix_user_prefix")]
    pub user_prefix: String,
    #[serde(default = "default_matrix_timeout_secs")]
    pub timeout_secs: u64,
}

impl MatrixConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl std::fmt::Debug for MatrixConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatrixConfig")
            .field("homeserver_url", &self.homeserver_url)
            .field("access_token", &"***")
            .field("server_name", &self.server_name)
            .field("user_prefix", &self.user_prefix)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Reconciliation sweep configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ReconcileConfig {
    #[serde(default = "default_reconcile_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_reconcile_batch_size")]
    pub batch_size: i64,
}

impl ReconcileConfig {
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_reconcile_interval_secs(),
            batch_size: default_reconcile_batch_size(),
        }
    }
}

// Default value functions
fn default_app_name() -> String {
    "roomsync".to_string()
}

fn default_env() -> Environment {
    Environment::Development
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

fn default_matrix_user_prefix() -> String {
    "user".to_string()
}

fn default_matrix_timeout_secs() -> u64 {
    10
}

fn default_reconcile_interval_secs() -> u64 {
    300 // 5 minutes
}

fn default_reconcile_batch_size() -> i64 {
    100
}

/// Parse an optional variable, rejecting values that are present but malformed
fn parse_var<T, F>(lookup: &F, name: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue(name, raw)),
        None => Ok(None),
    }
}

fn parse_bool(name: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue(name, raw.to_string())),
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if required environment variables are missing or malformed
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let app = AppSettings {
            name: lookup("APP_NAME").unwrap_or_else(default_app_name),
            env: lookup("APP_ENV")
                .and_then(|s| match s.to_lowercase().as_str() {
                    "production" => Some(Environment::Production),
                    "staging" => Some(Environment::Staging),
                    "development" => Some(Environment::Development),
                    _ => None,
                })
                .unwrap_or_default(),
        };

        let communication = CommunicationConfig {
            enabled: match lookup("COMMUNICATION_ENABLED") {
                Some(raw) => parse_bool("COMMUNICATION_ENABLED", &raw)?,
                None => true,
            },
            default_provider: match lookup("COMMUNICATION_DEFAULT_PROVIDER") {
                Some(raw) => ProviderId::parse(&raw)
                    .map_err(|_| ConfigError::InvalidValue("COMMUNICATION_DEFAULT_PROVIDER", raw))?,
                None => ProviderId::None,
            },
        };

        let database = DatabaseConfig {
            url: lookup("DATABASE_URL").ok_or(ConfigError::MissingVar("DATABASE_URL"))?,
            max_connections: parse_var(&lookup, "DATABASE_MAX_CONNECTIONS")?
                .unwrap_or_else(default_max_connections),
            min_connections: parse_var(&lookup, "DATABASE_MIN_CONNECTIONS")?
                .unwrap_or_else(default_min_connections),
        };

        let matrix = match lookup("MATRIX_HOMESERVER_URL") {
            Some(homeserver_url) => Some(MatrixConfig {
                homeserver_url: homeserver_url.trim_end_matches('/').to_string(),
                access_token: lookup("MATRIX_ACCESS_TOKEN")
                    .ok_or(ConfigError::MissingVar("MATRIX_ACCESS_TOKEN"))?,
                server_name: lookup("MATRIX_SERVER_NAME")
                    .ok_or(ConfigError::MissingVar("MATRIX_SERVER_NAME"))?,
                user_prefix: lookup("MATRIX_USER_PREFIX")
                    .unwrap_or_else(default_matrix_user_prefix),
                timeout_secs: parse_var(&lookup, "MATRIX_TIMEOUT_SECS")?
                    .unwrap_or_else(default_matrix_timeout_secs),
            }),
            None => None,
        };

        if communication.default_provider == ProviderId::Matrix && matrix.is_none() {
            return Err(ConfigError::MissingVar("MATRIX_HOMESERVER_URL"));
        }

        let reconcile = ReconcileConfig {
            interval_secs: parse_var(&lookup, "RECONCILE_INTERVAL_SECS")?
                .unwrap_or_else(default_reconcile_interval_secs),
            batch_size: parse_var(&lookup, "RECONCILE_BATCH_SIZE")?
                .unwrap_or_else(default_reconcile_batch_size),
        };

        if reconcile.interval_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "RECONCILE_INTERVAL_SECS",
                "0".to_string(),
            ));
        }

        Ok(Self {
            app,
            communication,
            database,
            matrix,
            reconcile,
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}
