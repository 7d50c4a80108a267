//! In-memory implementations of the storage and directory ports
//!
//! Used by unit and scenario tests, and for running the service without a
//! database. Behaviour mirrors the PostgreSQL repositories, including
//! optimistic versioning and cascade delete.

mod directory;
mod store;

pub use directory::MemoryDirectory;
pub use store::MemoryCommunicationStore;
