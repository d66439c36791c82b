// Keywarden — Enclave Module
//
// The trusted side of the boundary: owns enclave state and the encryption
// keypair, and implements the operations the host may request (storage, keys,
// encrypt, decrypt, confirm, reset, configure).

mod error;
mod service;

pub use error::EnclaveError;
pub use service::{Enclave, EnclaveSettings, StorageSnapshot};
