// Keywarden — Store Codec Layer
//
// Binary key material is kept in the text store through a reversible codec.
// `CodecStore` wraps any `SecretStore` so callers read and write bytes while
// the store itself only ever sees text.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use zeroize::Zeroizing;

use super::models::StoreKey;
use super::repository::SecretStore;
use super::StoreError;

/// A reversible bytes ⇄ text transform.
pub trait Codec {
    fn encode(&self, bytes: &[u8]) -> String;
    fn decode(&self, text: &str) -> Result<Vec<u8>, String>;
}

/// Standard-alphabet, padded base64.
#[derive(Debug, Clone, Copy, Default)]
pub struct Base64Codec;

impl Codec for Base64Codec {
    fn encode(&self, bytes: &[u8]) -> String {
        STANDARD.encode(bytes)
    }

    fn decode(&self, text: &str) -> Result<Vec<u8>, String> {
        STANDARD.decode(text).map_err(|e| e.to_string())
    }
}

/// A byte-valued view over a text store.
pub struct CodecStore<'a, C> {
    inner: &'a mut dyn SecretStore,
    codec: C,
}

impl<'a, C: Codec> CodecStore<'a, C> {
    pub fn new(inner: &'a mut dyn SecretStore, codec: C) -> Self {
        Self { inner, codec }
    }

    /// Read and decode a value. Decoded bytes are wiped on drop.
    pub fn get(&self, key: StoreKey) -> Result<Option<Zeroizing<Vec<u8>>>, StoreError> {
        let Some(text) = self.inner.get(key)?.map(Zeroizing::new) else {
            return Ok(None);
        };
        let bytes = self.codec.decode(&text).map_err(|reason| StoreError::Codec {
            key: key.as_str(),
            reason,
        })?;
        Ok(Some(Zeroizing::new(bytes)))
    }

    /// Encode and write a value.
    pub fn set(&mut self, key: StoreKey, bytes: &[u8]) -> Result<(), StoreError> {
        let text = Zeroizing::new(self.codec.encode(bytes));
        self.inner.set(key, &text)
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Database, SqliteSecretStore};

    #[test]
    fn test_codec_store_writes_base64_text() {
        let mut store = SqliteSecretStore::new(Database::open_in_memory().unwrap());
        {
            let mut codec = CodecStore::new(&mut store, Base64Codec);
            codec.set(StoreKey::EncryptionPublicKey, &[0xde, 0xad, 0xbe, 0xef]).unwrap();
        }

        assert_eq!(
            store.get(StoreKey::EncryptionPublicKey).unwrap().as_deref(),
            Some("3q2+7w=="),
            "Underlying store must only see the encoded text"
        );

        let codec = CodecStore::new(&mut store, Base64Codec);
        let bytes = codec.get(StoreKey::EncryptionPublicKey).unwrap().unwrap();
        assert_eq!(bytes.as_slice(), &[0xde, 0xad, 0xbe, 0xef]);
    }

    #[test]
    fn test_codec_store_missing_key() {
        let mut store = SqliteSecretStore::new(Database::open_in_memory().unwrap());
        let codec = CodecStore::new(&mut store, Base64Codec);
        assert!(codec.get(StoreKey::EncryptionPrivateKey).unwrap().is_none());
    }

    #[test]
    fn test_codec_store_reports_undecodable_value() {
        let mut store = SqliteSecretStore::new(Database::open_in_memory().unwrap());
        store
            .set(StoreKey::EncryptionPrivateKey, "not base64 at all!")
            .unwrap();

        let codec = CodecStore::new(&mut store, Base64Codec);
        let err = codec.get(StoreKey::EncryptionPrivateKey).unwrap_err();
        match err {
            StoreError::Codec { key, .. } => assert_eq!(key, "encryption-private-key"),
            other => panic!("expected codec error, got {other:?}"),
        }
    }
}
