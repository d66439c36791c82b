// Keywarden — Interaction error types

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InteractionError {
    #[error("Couldn't open interaction surface: {0}")]
    Launch(String),

    #[error("Interaction surface closed without a reply")]
    Closed,

    #[error("Interaction surface reported an error: {0}")]
    Rejected(Value),

    #[error("Malformed surface message: {0}")]
    Protocol(String),

    #[error("Timed out waiting for {0}")]
    TimedOut(&'static str),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
