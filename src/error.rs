// Error type shared by the remote task client and the orchestration
// core. Binary-side plumbing uses `anyhow` instead.

use thiserror::Error;

/// Errors raised while preparing, running or collecting a remote task.
#[derive(Debug, Error)]
pub enum TaskError {
    /// Missing or invalid local input, detected before any network call.
    #[error("Precondition failed: {0}")]
    Precondition(String),

    #[error("Submit error: {status} - {body}")]
    Submit { status: u16, body: String },

    #[error("Submit response carried no task id: {body}")]
    MissingHandle { body: String },

    #[error("Status error: {status} - {body}")]
    Status { status: u16, body: String },

    #[error("Result error: {status} - {body}")]
    Result { status: u16, body: String },

    /// The service reported a failure ordinal (>= 400).
    #[error("Task failed ({status})")]
    Rejected { status: i64 },

    #[error("Asset fetch failed ({status}): {url}")]
    AssetFetch { url: String, status: u16 },

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unexpected response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TaskError>;
