// Keywarden — Store data models
//
// The key set is closed: every value the enclave persists lives under one of
// the `StoreKey` variants, addressed by its wire name.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// The fixed set of keys in enclave state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKey {
    HumanId,
    SignerAddress,
    SignerPublicKey,
    EncryptionPublicKey,
    /// Base64 through the codec layer. Never leaves the enclave.
    EncryptionPrivateKey,
    CredentialId,
    PreferredAuthMethod,
    /// Time-bounded; see `SecretStore::set_remember_duration`.
    Password,
    /// Seconds a password stays remembered.
    RememberDuration,
}

impl StoreKey {
    pub const ALL: [StoreKey; 9] = [
        StoreKey::HumanId,
        StoreKey::SignerAddress,
        StoreKey::SignerPublicKey,
        StoreKey::EncryptionPublicKey,
        StoreKey::EncryptionPrivateKey,
        StoreKey::CredentialId,
        StoreKey::PreferredAuthMethod,
        StoreKey::Password,
        StoreKey::RememberDuration,
    ];

    /// The persisted name of this key.
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreKey::HumanId => "human-id",
            StoreKey::SignerAddress => "signer-address",
            StoreKey::SignerPublicKey => "signer-public-key",
            StoreKey::EncryptionPublicKey => "encryption-public-key",
            StoreKey::EncryptionPrivateKey => "encryption-private-key",
            StoreKey::CredentialId => "credential-id",
            StoreKey::PreferredAuthMethod => "preferred-auth-method",
            StoreKey::Password => "password",
            StoreKey::RememberDuration => "remember-duration",
        }
    }

    /// Values under these keys must never be logged or displayed.
    pub fn is_secret(&self) -> bool {
        matches!(self, StoreKey::Password | StoreKey::EncryptionPrivateKey)
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Longest time a password may stay remembered.
pub const MAX_REMEMBER_DURATION: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// What a credential write does with the recorded remember-duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RememberPolicy {
    /// Apply whatever duration is already recorded.
    Keep,
    /// Forget the recorded duration; the password lives for this session.
    SessionOnly,
    /// Record this duration and remember the password for it.
    For(Duration),
}

/// One row of the audit log. Details never carry secret values.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    pub id: i64,
    pub action: String,
    pub timestamp: DateTime<Utc>,
    pub details: Option<String>,
}

impl fmt::Display for AuditEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.action
        )?;
        if let Some(ref details) = self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
