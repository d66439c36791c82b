// Keywarden — Store error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Could not decode stored '{key}': {reason}")]
    Codec { key: &'static str, reason: String },

    #[error("Invalid stored value for '{key}': {value}")]
    InvalidValue { key: &'static str, value: String },
}
