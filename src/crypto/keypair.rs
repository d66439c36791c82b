// Keywarden — Box KeyPair
//
// X25519 keypair for box encryption. The secret half is the derived seed
// itself (clamping happens inside scalar multiplication), wiped on drop and
// never shown in Debug output.

use std::fmt;

use zeroize::Zeroizing;

use super::CryptoError;

/// Length of both halves of the keypair.
pub const KEY_LEN: usize = 32;

#[derive(Clone)]
pub struct KeyPair {
    public_key: [u8; KEY_LEN],
    secret_key: Zeroizing<[u8; KEY_LEN]>,
}

impl KeyPair {
    /// Build a keypair whose secret key is `seed`.
    pub fn from_seed(seed: &[u8; KEY_LEN]) -> Self {
        let secret = crypto_box::SecretKey::from(*seed);
        let public_key = *secret.public_key().as_bytes();
        Self {
            public_key,
            secret_key: Zeroizing::new(*seed),
        }
    }

    /// Rebuild a keypair from stored secret key bytes.
    pub fn from_secret_key(bytes: &[u8]) -> Result<Self, CryptoError> {
        let seed: &[u8; KEY_LEN] = bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidSecretKey(bytes.len()))?;
        Ok(Self::from_seed(seed))
    }

    pub fn public_key(&self) -> &[u8; KEY_LEN] {
        &self.public_key
    }

    /// Raw secret key bytes, for persistence inside the enclave only.
    pub(crate) fn secret_key(&self) -> &[u8; KEY_LEN] {
        &self.secret_key
    }

    pub(super) fn box_secret(&self) -> crypto_box::SecretKey {
        crypto_box::SecretKey::from(*self.secret_key)
    }
}

impl PartialEq for KeyPair {
    fn eq(&self, other: &Self) -> bool {
        self.public_key == other.public_key && *self.secret_key == *other.secret_key
    }
}

impl Eq for KeyPair {}

/// Custom Debug implementation that NEVER reveals the secret key.
impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &self.public_key)
            .field("secret_key", &"[REDACTED]")
            .finish()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_keypair() {
        let a = KeyPair::from_seed(&[7u8; KEY_LEN]);
        let b = KeyPair::from_seed(&[7u8; KEY_LEN]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_public_key_differs_from_secret() {
        let kp = KeyPair::from_seed(&[7u8; KEY_LEN]);
        assert_ne!(kp.public_key(), kp.secret_key());
    }

    #[test]
    fn test_from_secret_key_round_trips() {
        let kp = KeyPair::from_seed(&[9u8; KEY_LEN]);
        let restored = KeyPair::from_secret_key(kp.secret_key()).unwrap();
        assert_eq!(kp, restored);
    }

    #[test]
    fn test_from_secret_key_rejects_wrong_length() {
        let err = KeyPair::from_secret_key(&[1u8; 31]).unwrap_err();
        assert_eq!(err, CryptoError::InvalidSecretKey(31));
    }

    #[test]
    fn test_debug_redacts_secret_key() {
        let kp = KeyPair::from_seed(&[0xabu8; KEY_LEN]);
        let debug_output = format!("{:?}", kp);
        assert!(debug_output.contains("[REDACTED]"));
        assert!(
            !debug_output.contains("171, 171"),
            "Debug output must NEVER contain the secret key bytes"
        );
    }
}
