//! Error taxonomy shared by every resource operation.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResourceError {
    /// Malformed input: unparseable id, mismatched content, bad path root.
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    /// A locked resource on the path, or a mutation without a session.
    #[error("{0}")]
    Unauthorized(String),

    /// The stored tree no longer satisfies its shape invariants.
    #[error("{0}")]
    Integrity(String),

    #[error("storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

impl ResourceError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn integrity(msg: impl Into<String>) -> Self {
        Self::Integrity(msg.into())
    }

    /// Whether the error points at a server-side fault rather than bad input.
    pub fn is_server_fault(&self) -> bool {
        matches!(self, Self::Integrity(_) | Self::Storage(_))
    }
}

pub type ResourceResult<T> = Result<T, ResourceError>;
