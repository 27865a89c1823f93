use thiserror::Error;

#[derive(Debug, Error)]
pub enum BusError {
    #[error("failed to encode message for queue {queue}: {source}")]
    Encode { queue: String, #[source] source: serde_json::Error },

    #[error("failed to decode message from queue {queue}: {source}")]
    Decode { queue: String, #[source] source: serde_json::Error },

    #[error("bus is shutting down")]
    Closed,
}
