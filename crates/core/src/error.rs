//! Error taxonomy for the core data model.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("progress {0} out of range 0..=100")]
    InvalidProgress(u8),

    #[error("malformed store key: {0}")]
    MalformedKey(String),

    #[error("failed to decode JSON payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid id: {0}")]
    InvalidId(#[from] uuid::Error),
}
