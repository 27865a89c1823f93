use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store backend unavailable: {0}")]
    Unavailable(String),

    #[error("failed to encode value for key {key}: {source}")]
    Encode { key: String, #[source] source: serde_json::Error },

    #[error("failed to decode value for key {key}: {source}")]
    Decode { key: String, #[source] source: serde_json::Error },
}
