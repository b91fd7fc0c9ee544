use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("fingerprint codec error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to decode persisted entry '{key}': {reason}")]
    Decode { key: String, reason: String },
}
