//! # roomsync-provider
//!
//! Adapters implementing [`RoomProvider`](roomsync_core::RoomProvider) for
//! each supported chat backend, and the registry that resolves a stored
//! provider identifier to its adapter.
//!
//! - [`MatrixRoomProvider`]: Matrix homeserver with the Synapse admin API
//! - [`LinkOnlyProvider`]: external meeting link, no membership concept
//! - [`MemoryRoomProvider`]: simulated backend with fault injection

pub mod customlink;
pub mod matrix;
pub mod memory;
pub mod registry;

pub use customlink::LinkOnlyProvider;
pub use matrix::MatrixRoomProvider;
pub use memory::{MemoryRoom, MemoryRoomProvider, ProviderCall};
pub use registry::ProviderRegistry;
