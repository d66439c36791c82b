// Keywarden — Enclave Service
//
// The operations the host can ask for. The enclave owns the store, the
// in-memory keypair and the affordances; the host only ever sees public keys,
// envelopes, plaintext it asked to decrypt and confirmation answers.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};

use crate::auth::{Arbiter, AuthMethod, Authenticator, Unlocked};
use crate::crypto::{open, seal, EncryptedEnvelope, KdfParams, KeyPair, KEY_LEN};
use crate::interaction::{bounded, Configuration, Intent, Mediator, SurfaceLauncher, Triggers};
use crate::store::{record_event, Base64Codec, CodecStore, SecretStore, StoreKey};

use super::EnclaveError;

/// Everything the enclave needs besides its collaborators.
#[derive(Debug, Clone)]
pub struct EnclaveSettings {
    /// The host origin shown to the human on confirmation.
    pub origin: String,
    pub configuration: Configuration,
    /// Upper bound for every wait on the human or the authenticator.
    pub interaction_timeout: Option<Duration>,
    pub kdf: KdfParams,
}

impl EnclaveSettings {
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            configuration: Configuration::default(),
            interaction_timeout: None,
            kdf: KdfParams::default(),
        }
    }
}

/// The host-visible part of enclave state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StorageSnapshot {
    pub human_id: Option<String>,
    pub encryption_public_key: Option<Vec<u8>>,
    pub signer_address: Option<String>,
    pub signer_public_key: Option<String>,
}

impl StorageSnapshot {
    pub fn read(store: &mut dyn SecretStore) -> Result<Self, EnclaveError> {
        let encryption_public_key = CodecStore::new(store, Base64Codec)
            .get(StoreKey::EncryptionPublicKey)?
            .map(|key| key.to_vec());

        Ok(Self {
            human_id: store.get(StoreKey::HumanId)?,
            encryption_public_key,
            signer_address: store.get(StoreKey::SignerAddress)?,
            signer_public_key: store.get(StoreKey::SignerPublicKey)?,
        })
    }
}

pub struct Enclave {
    store: Box<dyn SecretStore>,
    arbiter: Arbiter,
    mediator: Mediator,
    triggers: Triggers,
    key_pair: Option<KeyPair>,
    configuration: Configuration,
    origin: String,
    timeout: Option<Duration>,
}

impl Enclave {
    /// Build the enclave and load any keypair already in the store.
    pub fn new(
        store: Box<dyn SecretStore>,
        launcher: Arc<dyn SurfaceLauncher>,
        authenticator: Arc<dyn Authenticator>,
        settings: EnclaveSettings,
    ) -> Result<Self, EnclaveError> {
        let triggers = Triggers::new();
        triggers.unlock.set_create(settings.configuration.is_new());

        let mediator = Mediator::new(launcher, triggers.clone(), settings.interaction_timeout);
        let arbiter = Arbiter::new(
            authenticator,
            triggers.unlock.clone(),
            settings.interaction_timeout,
            settings.kdf,
        );

        let mut enclave = Self {
            store,
            arbiter,
            mediator,
            triggers,
            key_pair: None,
            configuration: settings.configuration,
            origin: settings.origin,
            timeout: settings.interaction_timeout,
        };

        let stored = CodecStore::new(enclave.store.as_mut(), Base64Codec)
            .get(StoreKey::EncryptionPrivateKey)?;
        if let Some(secret_key) = stored {
            enclave.key_pair = Some(KeyPair::from_secret_key(&secret_key)?);
            tracing::debug!("Loaded stored encryption keypair");
        }

        Ok(enclave)
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn triggers(&self) -> &Triggers {
        &self.triggers
    }

    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    /// The cached public key, if a keypair has been loaded or derived.
    pub fn public_key(&self) -> Option<&[u8; KEY_LEN]> {
        self.key_pair.as_ref().map(KeyPair::public_key)
    }

    /// Record any non-empty identity fields and return the current ones.
    ///
    /// A human id different from the stored one drops the keypair bound to
    /// the old identity.
    pub fn storage(
        &mut self,
        human_id: Option<&str>,
        signer_address: Option<&str>,
        signer_public_key: Option<&str>,
    ) -> Result<StorageSnapshot, EnclaveError> {
        if let Some(human_id) = human_id.filter(|v| !v.is_empty()) {
            let previous = self.store.get(StoreKey::HumanId)?;
            if previous.as_deref().is_some_and(|p| p != human_id) {
                self.forget_key_pair()?;
            }
            self.store.set(StoreKey::HumanId, human_id)?;
        }
        if let Some(address) = signer_address.filter(|v| !v.is_empty()) {
            self.store.set(StoreKey::SignerAddress, address)?;
        }
        if let Some(public_key) = signer_public_key.filter(|v| !v.is_empty()) {
            self.store.set(StoreKey::SignerPublicKey, public_key)?;
        }

        StorageSnapshot::read(self.store.as_mut())
    }

    fn forget_key_pair(&mut self) -> Result<(), EnclaveError> {
        self.store.remove(StoreKey::EncryptionPrivateKey)?;
        self.store.remove(StoreKey::EncryptionPublicKey)?;
        self.key_pair = None;
        record_event(self.store.as_ref(), "identity-changed", None);
        tracing::info!("Human id changed; identity-bound key material cleared");
        Ok(())
    }

    /// Best effort: unlock and derive if needed, then return whatever public
    /// key is cached. Failures are logged, never returned.
    pub async fn keys(&mut self, auth_method: Option<AuthMethod>) -> Option<[u8; KEY_LEN]> {
        if let Err(e) = self.unlock_keys(auth_method).await {
            tracing::warn!(kind = e.kind(), "keys: {}", e);
        }
        self.public_key().copied()
    }

    async fn unlock_keys(&mut self, auth_method: Option<AuthMethod>) -> Result<(), EnclaveError> {
        if let Some(method) = auth_method {
            tracing::debug!(method = %method, "Authentication requested with keys");
            self.arbiter
                .reauthenticate(self.store.as_mut(), &self.mediator, &self.configuration)
                .await?;
        }
        self.ensure_password().await?;
        self.ensure_key_pair().await?;
        Ok(())
    }

    pub async fn ensure_password(&mut self) -> Result<Unlocked, EnclaveError> {
        self.arbiter
            .ensure_password(self.store.as_mut(), &self.mediator, &self.configuration)
            .await
    }

    pub async fn ensure_key_pair(&mut self) -> Result<KeyPair, EnclaveError> {
        let key_pair = self.arbiter.ensure_key_pair(self.store.as_mut()).await?;
        self.key_pair = Some(key_pair.clone());
        Ok(key_pair)
    }

    /// Seal `message` to `receiver_public_key`, or to ourselves when absent.
    pub fn encrypt(
        &self,
        message: &[u8],
        receiver_public_key: Option<&[u8]>,
    ) -> Result<EncryptedEnvelope, EnclaveError> {
        let key_pair = self.key_pair.as_ref().ok_or(EnclaveError::Locked)?;
        let receiver = receiver_public_key.unwrap_or(&key_pair.public_key()[..]);
        Ok(seal(message, receiver, key_pair)?)
    }

    pub fn decrypt(
        &self,
        full_message: &[u8],
        sender_public_key: &[u8],
    ) -> Result<Vec<u8>, EnclaveError> {
        let key_pair = self.key_pair.as_ref().ok_or(EnclaveError::Locked)?;
        let plaintext = open(full_message, sender_public_key, key_pair)?;
        record_event(self.store.as_ref(), "decrypt", None);
        Ok(plaintext)
    }

    /// Ask the human to approve `message`; resolves to their answer.
    pub async fn confirm(&mut self, message: &str) -> Result<bool, EnclaveError> {
        let outcome = self.ask_confirmation(message).await;
        match outcome {
            Ok(confirmed) => {
                let answer = if confirmed { "approved" } else { "declined" };
                record_event(self.store.as_ref(), "confirm", Some(answer));
                tracing::info!(confirmed, "Confirmation answered");
                Ok(confirmed)
            }
            Err(e) => {
                self.triggers.confirm.enable();
                Err(e)
            }
        }
    }

    async fn ask_confirmation(&mut self, message: &str) -> Result<bool, EnclaveError> {
        let armed = self.triggers.confirm.arm();
        bounded(self.timeout, "confirm trigger", armed.pressed()).await??;
        self.triggers.confirm.disable();

        let payload = json!({ "message": message, "origin": self.origin });
        let result = self
            .mediator
            .open(Intent::Confirm, Some(payload), &self.configuration)
            .await?;
        Ok(result
            .get("confirmed")
            .and_then(Value::as_bool)
            .unwrap_or(false))
    }

    /// Wipe all enclave state and the in-memory keypair.
    pub fn reset(&mut self) -> Result<(), EnclaveError> {
        self.store.reset()?;
        self.key_pair = None;
        record_event(self.store.as_ref(), "reset", None);
        Ok(())
    }

    pub fn configure(&mut self, mode: Option<String>, theme: Option<String>) {
        self.configuration = Configuration { mode, theme };
        self.triggers.unlock.set_create(self.configuration.is_new());
        tracing::debug!(mode = ?self.configuration.mode, theme = ?self.configuration.theme, "Configured");
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::UnavailableAuthenticator;
    use crate::interaction::{Dialog, DialogLauncher, SurfaceReply, SurfaceRequest};
    use crate::store::{Database, SqliteSecretStore};
    use async_trait::async_trait;

    struct Never;

    #[async_trait]
    impl Dialog for Never {
        async fn respond(&self, _request: SurfaceRequest) -> SurfaceReply {
            SurfaceReply::Error(Value::String("no dialog in this test".into()))
        }
    }

    fn enclave_with(store: SqliteSecretStore) -> Enclave {
        let mut settings = EnclaveSettings::new("host");
        settings.interaction_timeout = Some(Duration::from_millis(20));
        settings.kdf = KdfParams {
            m_cost: 64,
            t_cost: 1,
            p_cost: 1,
        };
        Enclave::new(
            Box::new(store),
            Arc::new(DialogLauncher::new(Never)),
            Arc::new(UnavailableAuthenticator),
            settings,
        )
        .unwrap()
    }

    fn memory_store() -> SqliteSecretStore {
        SqliteSecretStore::new(Database::open_in_memory().unwrap())
    }

    #[test]
    fn test_storage_ignores_empty_values() {
        let mut enclave = enclave_with(memory_store());
        enclave.storage(Some("h1"), Some("0xabc"), Some("pk")).unwrap();

        let snapshot = enclave.storage(Some(""), None, None).unwrap();
        assert_eq!(snapshot.human_id.as_deref(), Some("h1"));
        assert_eq!(snapshot.signer_address.as_deref(), Some("0xabc"));
        assert_eq!(snapshot.signer_public_key.as_deref(), Some("pk"));
        assert!(snapshot.encryption_public_key.is_none());
    }

    #[tokio::test]
    async fn test_identity_change_clears_key_pair() {
        let mut store = memory_store();
        store.set(StoreKey::Password, "p1").unwrap();
        let mut enclave = enclave_with(store);

        enclave.storage(Some("h1"), None, None).unwrap();
        let first = enclave.ensure_key_pair().await.unwrap();

        let snapshot = enclave.storage(Some("h2"), None, None).unwrap();
        assert!(snapshot.encryption_public_key.is_none());
        assert!(enclave.public_key().is_none());

        let second = enclave.ensure_key_pair().await.unwrap();
        assert_ne!(first.public_key(), second.public_key());
    }

    #[test]
    fn test_encrypt_without_key_pair_is_locked() {
        let enclave = enclave_with(memory_store());
        let err = enclave.encrypt(b"hello", None).unwrap_err();
        assert!(matches!(err, EnclaveError::Locked));
    }

    #[tokio::test]
    async fn test_keys_swallows_failures() {
        let mut enclave = enclave_with(memory_store());
        // Nobody presses unlock, so the wait times out.
        assert!(enclave.keys(None).await.is_none());
        assert!(
            enclave.triggers().unlock.state().enabled,
            "Unlock must stay usable after a failed attempt"
        );
    }

    #[tokio::test]
    async fn test_stored_key_pair_is_loaded_on_start() {
        let mut store = memory_store();
        store.set(StoreKey::HumanId, "h1").unwrap();
        store.set(StoreKey::Password, "p1").unwrap();
        let mut first = enclave_with(store);
        let derived = first.ensure_key_pair().await.unwrap();

        let carried = std::mem::replace(&mut first.store, Box::new(memory_store()));
        let mut second = Enclave::new(
            carried,
            Arc::new(DialogLauncher::new(Never)),
            Arc::new(UnavailableAuthenticator),
            EnclaveSettings::new("host"),
        )
        .unwrap();
        assert_eq!(second.public_key(), Some(derived.public_key()));

        let envelope = second.encrypt(b"x", None).unwrap();
        assert_eq!(second.decrypt(envelope.as_bytes(), derived.public_key()).unwrap(), b"x");
        second.reset().unwrap();
        assert!(second.public_key().is_none());
    }

    #[tokio::test]
    async fn test_confirm_times_out_and_reenables() {
        let mut enclave = enclave_with(memory_store());
        let err = enclave.confirm("sign this?").await.unwrap_err();
        assert!(matches!(err, EnclaveError::TimedOut("confirm trigger")));
        assert!(enclave.triggers().confirm.state().enabled);
    }

    #[test]
    fn test_configure_sets_create_hint() {
        let mut enclave = enclave_with(memory_store());
        enclave.configure(Some("new".into()), Some("dark".into()));
        assert!(enclave.triggers().unlock.state().create);
        assert_eq!(enclave.configuration().theme.as_deref(), Some("dark"));

        enclave.configure(None, None);
        assert!(!enclave.triggers().unlock.state().create);
    }
}
