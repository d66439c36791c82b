// Keywarden — Box Envelope
//
// Public-key authenticated encryption (X25519 + XSalsa20-Poly1305). An
// envelope is a fresh random 24-byte nonce followed by the ciphertext, whose
// last 16 bytes are the Poly1305 tag.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use crypto_box::aead::generic_array::GenericArray;
use crypto_box::aead::Aead;
use crypto_box::{PublicKey, SalsaBox};
use rand::RngCore;

use super::{CryptoError, KeyPair, KEY_LEN};

/// Length of the box nonce that prefixes every envelope.
pub const NONCE_LEN: usize = 24;

/// nonce ‖ ciphertext, as produced by [`seal`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedEnvelope(Vec<u8>);

impl EncryptedEnvelope {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn nonce(&self) -> &[u8] {
        &self.0[..NONCE_LEN.min(self.0.len())]
    }

    pub fn ciphertext(&self) -> &[u8] {
        &self.0[NONCE_LEN.min(self.0.len())..]
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn parse_public_key(bytes: &[u8]) -> Option<PublicKey> {
    let key: [u8; KEY_LEN] = bytes.try_into().ok()?;
    Some(PublicKey::from(key))
}

/// Encrypt `message` to `receiver_public_key`, authenticated as `own`.
pub fn seal(
    message: &[u8],
    receiver_public_key: &[u8],
    own: &KeyPair,
) -> Result<EncryptedEnvelope, CryptoError> {
    let mut nonce = [0u8; NONCE_LEN];
    rand::rng().fill_bytes(&mut nonce);

    let failure = |reason: &str| CryptoError::Encryption {
        reason: reason.to_string(),
        nonce: STANDARD.encode(nonce),
        receiver_public_key: STANDARD.encode(receiver_public_key),
        local_public_key: STANDARD.encode(own.public_key()),
    };

    let receiver = parse_public_key(receiver_public_key).ok_or_else(|| {
        failure(&format!(
            "receiver public key must be {} bytes, got {}",
            KEY_LEN,
            receiver_public_key.len()
        ))
    })?;

    let salsa = SalsaBox::new(&receiver, &own.box_secret());
    let ciphertext = salsa
        .encrypt(GenericArray::from_slice(&nonce), message)
        .map_err(|_| failure("box encryption failed"))?;

    let mut bytes = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    bytes.extend_from_slice(&nonce);
    bytes.extend_from_slice(&ciphertext);
    Ok(EncryptedEnvelope(bytes))
}

/// Verify and decrypt an envelope sent by `sender_public_key` to `own`.
pub fn open(
    envelope: &[u8],
    sender_public_key: &[u8],
    own: &KeyPair,
) -> Result<Vec<u8>, CryptoError> {
    let nonce = &envelope[..NONCE_LEN.min(envelope.len())];

    let failure = |reason: &str| CryptoError::Decryption {
        reason: reason.to_string(),
        nonce: STANDARD.encode(nonce),
        sender_public_key: STANDARD.encode(sender_public_key),
        local_public_key: STANDARD.encode(own.public_key()),
        envelope_len: envelope.len(),
    };

    if envelope.len() < NONCE_LEN {
        return Err(failure("envelope is shorter than the nonce"));
    }
    let sender = parse_public_key(sender_public_key).ok_or_else(|| {
        failure(&format!(
            "sender public key must be {} bytes, got {}",
            KEY_LEN,
            sender_public_key.len()
        ))
    })?;

    let salsa = SalsaBox::new(&sender, &own.box_secret());
    salsa
        .decrypt(GenericArray::from_slice(nonce), &envelope[NONCE_LEN..])
        .map_err(|_| failure("authentication failed"))
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(byte: u8) -> KeyPair {
        KeyPair::from_seed(&[byte; KEY_LEN])
    }

    #[test]
    fn test_seal_open_between_two_parties() {
        let alice = pair(1);
        let bob = pair(2);

        let envelope = seal(b"hello", bob.public_key(), &alice).unwrap();
        let plain = open(envelope.as_bytes(), alice.public_key(), &bob).unwrap();
        assert_eq!(plain, b"hello");
    }

    #[test]
    fn test_envelope_length_is_nonce_plus_tag_plus_message() {
        let kp = pair(3);
        let envelope = seal(b"abc", kp.public_key(), &kp).unwrap();
        assert_eq!(envelope.len(), NONCE_LEN + 16 + 3);
        assert_eq!(envelope.nonce().len(), NONCE_LEN);
        assert_eq!(envelope.ciphertext().len(), 16 + 3);
    }

    #[test]
    fn test_nonce_is_fresh_per_envelope() {
        let kp = pair(4);
        let a = seal(b"same", kp.public_key(), &kp).unwrap();
        let b = seal(b"same", kp.public_key(), &kp).unwrap();
        assert_ne!(a.nonce(), b.nonce(), "Every envelope must use a new nonce");
        assert_ne!(a, b);
    }

    #[test]
    fn test_wrong_sender_key_fails() {
        let alice = pair(1);
        let bob = pair(2);
        let mallory = pair(9);

        let envelope = seal(b"hello", bob.public_key(), &alice).unwrap();
        let err = open(envelope.as_bytes(), mallory.public_key(), &bob).unwrap_err();
        assert!(matches!(err, CryptoError::Decryption { .. }));
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let kp = pair(5);
        let mut bytes = seal(b"hello", kp.public_key(), &kp).unwrap().into_bytes();
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;
        assert!(open(&bytes, kp.public_key(), &kp).is_err());
    }

    #[test]
    fn test_short_envelope_fails() {
        let kp = pair(6);
        let err = open(&[0u8; 10], kp.public_key(), &kp).unwrap_err();
        match err {
            CryptoError::Decryption { envelope_len, .. } => assert_eq!(envelope_len, 10),
            other => panic!("expected decryption error, got {other:?}"),
        }
    }

    #[test]
    fn test_bad_receiver_key_length() {
        let kp = pair(7);
        let err = seal(b"hello", &[1u8; 5], &kp).unwrap_err();
        assert!(matches!(err, CryptoError::Encryption { .. }));
    }

    #[test]
    fn test_error_never_contains_plaintext() {
        let kp = pair(8);
        let err = seal(b"top-secret-plaintext", &[1u8; 5], &kp).unwrap_err();
        assert!(!err.to_string().contains("top-secret-plaintext"));
    }
}
