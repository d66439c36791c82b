// Keywarden — Seed Derivation
//
// Maps (password, human id) to the 32-byte seed of the encryption keypair with
// Argon2id. Pure: no I/O, no randomness, same inputs give the same seed.
//
// Salt = SHA-256("keywarden-kdf-v1::" || human_id). Hashing keeps short human
// ids above Argon2's minimum salt length and separates this use of the id from
// any other.

use argon2::{Algorithm, Argon2, Params, Version};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use super::DerivationError;

/// Length of the derived seed in bytes (one X25519 secret key).
pub const SEED_LEN: usize = 32;

const SALT_DOMAIN: &[u8] = b"keywarden-kdf-v1::";

// Defaults: m=65536 (64 MiB), t=3, p=4.
const ARGON2_M_COST: u32 = 65536;
const ARGON2_T_COST: u32 = 3;
const ARGON2_P_COST: u32 = 4;

/// Argon2id cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KdfParams {
    /// Memory cost in KiB. Must be at least 8 × `p_cost`.
    pub m_cost: u32,
    /// Number of passes.
    pub t_cost: u32,
    /// Degree of parallelism.
    pub p_cost: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            m_cost: ARGON2_M_COST,
            t_cost: ARGON2_T_COST,
            p_cost: ARGON2_P_COST,
        }
    }
}

fn build_salt(human_id: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(SALT_DOMAIN);
    hasher.update(human_id.as_bytes());
    let mut salt = [0u8; 32];
    salt.copy_from_slice(&hasher.finalize());
    salt
}

/// Derive the keypair seed for `password` under the identity `human_id`.
///
/// Both inputs are required; an empty one means the caller asked for a key
/// before the identity or the password was known.
pub fn derive_seed(
    password: &str,
    human_id: &str,
    params: &KdfParams,
) -> Result<Zeroizing<[u8; SEED_LEN]>, DerivationError> {
    if password.is_empty() {
        return Err(DerivationError::MissingPassword);
    }
    if human_id.is_empty() {
        return Err(DerivationError::MissingSalt);
    }

    let params = Params::new(params.m_cost, params.t_cost, params.p_cost, Some(SEED_LEN))
        .map_err(|e| DerivationError::Argon2(format!("invalid Argon2 params: {}", e)))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let salt = build_salt(human_id);
    let mut seed = Zeroizing::new([0u8; SEED_LEN]);
    argon2
        .hash_password_into(password.as_bytes(), &salt, &mut seed[..])
        .map_err(|e| DerivationError::Argon2(format!("Argon2id hash failed: {}", e)))?;

    Ok(seed)
}

// ─── Tests ───────────────────────────────────────────────────────────────────
