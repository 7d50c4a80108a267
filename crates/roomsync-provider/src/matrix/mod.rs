//! Matrix homeserver adapter

mod client;
mod error;

pub use client::MatrixRoomProvider;
