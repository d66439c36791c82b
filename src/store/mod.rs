// Keywarden — Store Module
//
// Durable enclave state: a fixed set of keys persisted in SQLite, a session
// overlay for passwords that are not remembered, a codec layer for binary key
// material, and an append-only audit log of sensitive operations.

mod codec;
mod db;
mod error;
mod models;
mod repository;

pub use codec::{Base64Codec, Codec, CodecStore};
pub use db::Database;
pub use error::StoreError;
pub use models::{AuditEntry, RememberPolicy, StoreKey, MAX_REMEMBER_DURATION};
pub use repository::{record_event, SecretStore, SqliteSecretStore};
