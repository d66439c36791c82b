// Keywarden — Crypto Module
//
// Argon2id seed derivation from (password, human id), the X25519 box keypair
// built from that seed, and the nonce‖ciphertext envelope produced by
// XSalsa20-Poly1305 box encryption.

mod envelope;
mod error;
mod kdf;
mod keypair;

pub use envelope::{open, seal, EncryptedEnvelope, NONCE_LEN};
pub use error::{CryptoError, DerivationError};
pub use kdf::{derive_seed, KdfParams, SEED_LEN};
pub use keypair::{KeyPair, KEY_LEN};
