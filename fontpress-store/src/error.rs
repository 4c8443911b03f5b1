//! Storage error types.
//!
//! Every store failure is classified as transient (worth retrying) or
//! permanent (retrying cannot help). The uploader's state machine branches
//! only on that classification.

use thiserror::Error;

/// The store operation that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    Head,
    Put,
    Get,
}

impl std::fmt::Display for StoreOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            StoreOp::Head => "HEAD",
            StoreOp::Put => "PUT",
            StoreOp::Get => "GET",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Network failure, timeout, 408, 429 or 5xx.
    #[error("{op} failed (transient): {message}")]
    Transient { op: StoreOp, message: String },

    /// Authorization failure or any other 4xx.
    #[error("{op} failed: {message}")]
    Permanent { op: StoreOp, message: String },

    /// The store cannot be used as configured (missing credentials, bad endpoint).
    #[error("storage configuration error: {0}")]
    Config(String),

    /// The object read back after a PUT does not match what was written.
    #[error("verification failed for {key}: {reason}")]
    Verify { key: String, reason: String },

    /// GET of a key that does not exist.
    #[error("object {0} not found")]
    NotFound(String),
}

impl StoreError {
    pub fn transient(op: StoreOp, message: impl Into<String>) -> Self {
        StoreError::Transient {
            op,
            message: message.into(),
        }
    }

    pub fn permanent(op: StoreOp, message: impl Into<String>) -> Self {
        StoreError::Permanent {
            op,
            message: message.into(),
        }
    }

    /// Whether a retry may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Transient { .. } | StoreError::Verify { .. })
    }

    /// Short machine-readable kind for tool error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            StoreError::Transient { .. } => "transient",
            StoreError::Permanent { .. } => "permanent",
            StoreError::Config(_) => "config",
            StoreError::Verify { .. } => "verify",
            StoreError::NotFound(_) => "not_found",
        }
    }

    /// Classify an HTTP status code returned by the store.
    pub fn from_status(op: StoreOp, status: u16, detail: &str) -> Self {
        let message = if detail.is_empty() {
            format!("HTTP {status}")
        } else {
            format!("HTTP {status}: {detail}")
        };
        match status {
            408 | 429 | 500..=599 => StoreError::transient(op, message),
            _ => StoreError::permanent(op, message),
        }
    }
}

/// Terminal failure of a content-addressed upload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("upload of {key} failed after {attempts} attempt(s): {cause}")]
pub struct UploadError {
    pub key: String,
    /// PUT attempts made before giving up.
    pub attempts: u32,
    #[source]
    pub cause: StoreError,
}
