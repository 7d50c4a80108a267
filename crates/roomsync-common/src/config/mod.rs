//! Configuration structs

mod app_config;

pub use app_config::{
    AppConfig, AppSettings, CommunicationConfig, ConfigError, DatabaseConfig, Environment,
    MatrixConfig, ReconcileConfig,
};
