// Keywarden — Top-level error types
//
// Aggregates errors from the enclave, store and config modules into a single
// error enum for the application boundary.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum KeywardenError {
    #[error("Enclave error: {0}")]
    Enclave(#[from] crate::enclave::EnclaveError),

    #[error("Store error: {0}")]
    Store(#[from] crate::store::StoreError),

    #[error("Config error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, KeywardenError>;
