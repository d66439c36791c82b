// Keywarden — Library root
//
// Re-exports the store, crypto, interaction, auth, enclave, gateway, config
// and CLI modules.

pub mod auth;
pub mod cli;
pub mod config;
pub mod crypto;
pub mod enclave;
pub mod error;
pub mod gateway;
pub mod interaction;
pub mod store;

pub use error::{KeywardenError, Result};
