//! PostgreSQL repository implementations

mod error;
mod instance;
mod mapping;

pub use instance::PgInstanceRepository;
pub use mapping::PgMappingRepository;
