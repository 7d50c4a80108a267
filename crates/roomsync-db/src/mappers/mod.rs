//! Entity ↔ Model mappers

mod instance;
mod mapping;

pub use instance::InstanceWrite;
