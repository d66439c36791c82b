// Keywarden — Enclave error types
//
// The operation-level taxonomy reported to the host. Origin mismatches never
// become an error value: the router drops those messages before dispatch.

use thiserror::Error;

use crate::auth::AssertionError;
use crate::crypto::{CryptoError, DerivationError};
use crate::interaction::InteractionError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum EnclaveError {
    #[error("Unexpected request from host: {0}")]
    UnrecognizedRequest(String),

    #[error("Invalid request parameters: {0}")]
    InvalidParams(String),

    #[error("Key derivation failed: {0}")]
    Derivation(#[from] DerivationError),

    #[error("{0}")]
    Crypto(#[from] CryptoError),

    #[error("Authentication rejected: {0}")]
    AuthenticationRejected(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("Interaction failed: {0}")]
    Interaction(String),

    #[error("Timed out waiting for {0}")]
    TimedOut(&'static str),

    #[error("No encryption keypair available; unlock first")]
    Locked,
}

impl EnclaveError {
    /// Stable machine-readable name, sent as `error.kind`.
    pub fn kind(&self) -> &'static str {
        match self {
            EnclaveError::UnrecognizedRequest(_) => "UnrecognizedRequest",
            EnclaveError::InvalidParams(_) => "InvalidParams",
            EnclaveError::Derivation(_) => "DerivationError",
            EnclaveError::Crypto(_) => "CryptoError",
            EnclaveError::AuthenticationRejected(_) => "AuthenticationRejected",
            EnclaveError::Storage(_) => "StorageError",
            EnclaveError::Interaction(_) => "InteractionError",
            EnclaveError::TimedOut(_) => "TimedOut",
            EnclaveError::Locked => "Locked",
        }
    }
}

impl From<InteractionError> for EnclaveError {
    fn from(e: InteractionError) -> Self {
        match e {
            InteractionError::TimedOut(what) => EnclaveError::TimedOut(what),
            InteractionError::Rejected(serde_json::Value::String(reason)) => {
                EnclaveError::AuthenticationRejected(reason)
            }
            InteractionError::Rejected(value) => {
                EnclaveError::AuthenticationRejected(value.to_string())
            }
            InteractionError::Closed => {
                EnclaveError::AuthenticationRejected("interaction closed without a reply".into())
            }
            other => EnclaveError::Interaction(other.to_string()),
        }
    }
}

impl From<AssertionError> for EnclaveError {
    fn from(e: AssertionError) -> Self {
        EnclaveError::AuthenticationRejected(e.to_string())
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_surface_rejection_maps_to_authentication_rejected() {
        let err = EnclaveError::from(InteractionError::Rejected(json!("user cancelled")));
        assert_eq!(err.kind(), "AuthenticationRejected");
        assert_eq!(err.to_string(), "Authentication rejected: user cancelled");
    }

    #[test]
    fn test_closed_surface_is_a_rejection() {
        let err = EnclaveError::from(InteractionError::Closed);
        assert_eq!(err.kind(), "AuthenticationRejected");
    }

    #[test]
    fn test_timeout_is_kept_distinct() {
        let err = EnclaveError::from(InteractionError::TimedOut("unlock trigger"));
        assert!(matches!(err, EnclaveError::TimedOut("unlock trigger")));
        assert_eq!(err.kind(), "TimedOut");
    }

    #[test]
    fn test_launch_failure_is_interaction_error() {
        let err = EnclaveError::from(InteractionError::Launch("no such file".into()));
        assert_eq!(err.kind(), "InteractionError");
    }

    #[test]
    fn test_derivation_kind() {
        let err = EnclaveError::from(DerivationError::MissingSalt);
        assert_eq!(err.kind(), "DerivationError");
    }
}
