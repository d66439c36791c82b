// Keywarden — Hardware credential assertions
//
// Platform authenticators are an external capability. The enclave asks for an
// assertion restricted to one credential id and reads the password back out of
// the assertion's user handle.

use async_trait::async_trait;
use thiserror::Error;

/// What the authenticator returns for a successful assertion.
#[derive(Clone, PartialEq, Eq)]
pub struct Assertion {
    /// Opaque user handle. Holds the UTF-8 password.
    pub user_handle: Vec<u8>,
    /// Raw id of the credential that signed.
    pub credential_id: Vec<u8>,
}

impl std::fmt::Debug for Assertion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Assertion")
            .field("user_handle", &"[REDACTED]")
            .field("credential_id", &self.credential_id)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum AssertionError {
    #[error("no platform authenticator is available")]
    Unavailable,

    #[error("assertion failed: {0}")]
    Failed(String),
}

#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Ask the platform for an assertion with `credential_id` over `challenge`.
    async fn request_assertion(
        &self,
        credential_id: &[u8],
        challenge: &[u8],
    ) -> Result<Assertion, AssertionError>;
}

/// Used when the platform has no authenticator.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableAuthenticator;

#[async_trait]
impl Authenticator for UnavailableAuthenticator {
    async fn request_assertion(
        &self,
        _credential_id: &[u8],
        _challenge: &[u8],
    ) -> Result<Assertion, AssertionError> {
        Err(AssertionError::Unavailable)
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
