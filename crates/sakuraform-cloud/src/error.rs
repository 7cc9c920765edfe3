//! Cloud provider error types

use thiserror::Error;

/// Errors surfaced by the reconciliation core.
///
/// Every core function returns the first error it hits. Nothing is rolled
/// back; callers converge by re-invoking the same operation.
#[derive(Error, Debug)]
pub enum CloudError {
    /// The target no longer exists remotely (deleted out-of-band).
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Failure that may succeed on retry (rate limiting, network blip).
    /// The core never retries these itself.
    #[error("Transient API error: {0}")]
    Transient(String),

    /// A status transition did not settle within its budget.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// A disruptive operation was requested against an object that is
    /// already transitioning, or is in the wrong power state for it.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CloudError {
    /// Whether a later attempt of the same reconciliation may succeed
    /// without any change to the desired state.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CloudError::Transient(_) | CloudError::Timeout(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, CloudError::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, CloudError>;
