//! # roomsync-db
//!
//! Storage layer implementing the communication repository ports.
//!
//! ## Overview
//!
//! - Connection pool management and schema setup for PostgreSQL
//! - Database models with SQLx `FromRow` derives
//! - Entity ↔ Model mappers
//! - PostgreSQL repository implementations
//! - In-memory store and directory used by tests and local runs
//!
//! ## Usage
//!
//! ```rust,ignore
//! use roomsync_db::pool::{create_pool, run_migrations, DatabaseConfig};
//! use roomsync_db::PgInstanceRepository;
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = create_pool(&DatabaseConfig::from_env()).await?;
//!     run_migrations(&pool).await?;
//!     let instances = PgInstanceRepository::new(pool);
//!     Ok(())
//! }
//! ```

pub mod mappers;
pub mod memory;
pub mod models;
pub mod pool;
pub mod repositories;

// Re-export commonly used types
pub use memory::{MemoryCommunicationStore, MemoryDirectory};
pub use pool::{create_pool, run_migrations, DatabaseConfig, PgPool};
pub use repositories::{PgInstanceRepository, PgMappingRepository};
