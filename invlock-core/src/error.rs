//! Error types for the inventory lock core.

use thiserror::Error;

/// Top-level error type for all core operations.
#[derive(Error, Debug)]
pub enum InvLockError {
    /// A container-type token did not name a known compartment.
    #[error("Invalid container type: {0:?}")]
    InvalidContainerType(String),

    /// A manual override targeted a user holding the bypass permission.
    #[error("User {0} holds the bypass permission")]
    TargetHasBypass(crate::UserId),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization or deserialization failure.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for InvLockError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, InvLockError>;
