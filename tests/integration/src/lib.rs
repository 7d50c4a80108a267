//! Integration test utilities for roomsync
//!
//! Wires the services over the in-memory store, directory and provider so
//! scenarios can run end to end through the hook dispatcher.

pub mod fixtures;
pub mod helpers;

pub use fixtures::*;
pub use helpers::*;
