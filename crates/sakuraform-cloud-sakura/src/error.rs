//! Sakura Cloud provider error types

use sakuraform_cloud::CloudError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SakuraError {
    #[error("usacloud not found ({0}). Please install: brew install usacloud")]
    UsacloudNotFound(String),

    #[error("usacloud command failed: {0}")]
    CommandFailed(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Resource is busy: {0}")]
    Conflict(String),

    #[error("Temporary API failure: {0}")]
    Transient(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Cloud error: {0}")]
    CloudError(#[from] CloudError),
}

impl SakuraError {
    /// Classify a failed usacloud invocation from its stderr
    ///
    /// usacloud prints the API's HTTP status and error code in its message,
    /// e.g. `Error: ... 404 Not Found: ...` or `... 409 Conflict: ...`.
    pub fn from_stderr(stderr: &str) -> Self {
        let message = stderr.trim().to_string();
        let lower = message.to_lowercase();

        if lower.contains("404") || lower.contains("not found") {
            SakuraError::NotFound(message)
        } else if lower.contains("409")
            || lower.contains("conflict")
            || lower.contains("still_migrating")
            || lower.contains("in progress")
            || lower.contains("is busy")
        {
            SakuraError::Conflict(message)
        } else if lower.contains("429")
            || lower.contains("too many requests")
            || lower.contains("500 ")
            || lower.contains("502")
            || lower.contains("503")
            || lower.contains("504")
            || lower.contains("timeout")
            || lower.contains("timed out")
            || lower.contains("connection reset")
        {
            SakuraError::Transient(message)
        } else {
            SakuraError::CommandFailed(message)
        }
    }
}

impl From<SakuraError> for CloudError {
    fn from(err: SakuraError) -> Self {
        match err {
            SakuraError::NotFound(m) => CloudError::NotFound(m),
            SakuraError::Conflict(m) => CloudError::Conflict(m),
            SakuraError::Transient(m) => CloudError::Transient(m),
            SakuraError::InvalidParameter(m) => CloudError::InvalidConfig(m),
            SakuraError::UsacloudNotFound(_) => CloudError::InvalidConfig(err.to_string()),
            SakuraError::CommandFailed(m) => CloudError::ApiError(m),
            SakuraError::JsonError(e) => CloudError::Json(e),
            SakuraError::IoError(e) => CloudError::Io(e),
            SakuraError::CloudError(e) => e,
        }
    }
}

pub type Result<T> = std::result::Result<T, SakuraError>;
