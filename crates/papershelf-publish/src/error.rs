use thiserror::Error;

/// Errors from export, import, and release publishing.
#[derive(Debug, Error)]
pub enum PublishError {
    /// A release operation was attempted without its precondition (for
    /// example a missing credential token). Fails fast, no side effect.
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// Transport-level failure talking to the hosted-release API.
    /// Per-asset during batch upload; never aborts the batch.
    #[error("network error: {0}")]
    Network(String),

    /// The hosted-release API answered with a non-success status.
    #[error("release API returned status {status}: {body}")]
    Api { status: u16, body: String },

    #[error("invalid inline binary: {0}")]
    Decode(String),

    #[error("bundle file {path}: {message}")]
    Bundle { path: String, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
