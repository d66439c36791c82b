// Keywarden — Crypto error types
//
// Diagnostics carry nonces and public keys (base64) only. Plaintext and secret
// key bytes never appear in an error.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DerivationError {
    #[error("a password is required for key derivation")]
    MissingPassword,

    #[error("an identity salt (human id) is required for key derivation")]
    MissingSalt,

    #[error("Argon2id failure: {0}")]
    Argon2(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    #[error(
        "Couldn't encrypt: {reason} (nonce: {nonce}, receiver public key: {receiver_public_key}, local public key: {local_public_key})"
    )]
    Encryption {
        reason: String,
        nonce: String,
        receiver_public_key: String,
        local_public_key: String,
    },

    #[error(
        "Couldn't decrypt: {reason} (nonce: {nonce}, sender public key: {sender_public_key}, local public key: {local_public_key}, {envelope_len} envelope bytes)"
    )]
    Decryption {
        reason: String,
        nonce: String,
        sender_public_key: String,
        local_public_key: String,
        envelope_len: usize,
    },

    #[error("Invalid secret key: expected 32 bytes, got {0}")]
    InvalidSecretKey(usize),
}
