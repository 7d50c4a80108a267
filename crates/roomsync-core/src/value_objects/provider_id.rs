//! Provider identifiers - the known room provider backends

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::DomainError;

/// Known room provider backends
///
/// `None` is the sentinel that disables synchronisation for an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ProviderId {
    #[default]
    #[serde(rename = "none")]
    None,
    #[serde(rename = "communication_matrix")]
    Matrix,
    #[serde(rename = "communication_customlink")]
    CustomLink,
    #[serde(rename = "communication_memory")]
    Memory,
}

impl ProviderId {
    /// All backends that can hold a room (everything except `None`)
    pub const BACKENDS: [ProviderId; 3] = [Self::Matrix, Self::CustomLink, Self::Memory];

    /// Stored identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Matrix => "communication_matrix",
            Self::CustomLink => "communication_customlink",
            Self::Memory => "communication_memory",
        }
    }

    /// Check if this is the `none` sentinel
    #[inline]
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Parse a stored identifier
    ///
    /// Unknown identifiers are a configuration problem, not a lookup failure.
    pub fn parse(s: &str) -> Result<Self, DomainError> {
        match s.trim() {
            "" | "none" => Ok(Self::None),
            "communication_matrix" => Ok(Self::Matrix),
            "communication_customlink" => Ok(Self::CustomLink),
            "communication_memory" => Ok(Self::Memory),
            other => Err(DomainError::NotConfigured(format!(
                "unknown room provider '{other}'"
            ))),
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProviderId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
