// Keywarden — Authentication Arbiter
//
// Decides how the enclave gets hold of the password that, together with the
// human id, derives the encryption keypair:
//
//   1. A live password in the store is used as-is.
//   2. Otherwise the unlock trigger is armed and, once pressed:
//        - a stored credential id → platform authenticator assertion
//        - a stored preferred method → dialog with that method as intent
//        - nothing yet → generic "auth" dialog where the human picks
//   3. A non-empty password is persisted with the chosen method; any failure
//      persists nothing and re-enables the trigger for a retry.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use rand::RngCore;
use serde::Deserialize;
use zeroize::Zeroizing;

use crate::crypto::{derive_seed, DerivationError, KdfParams, KeyPair};
use crate::enclave::EnclaveError;
use crate::interaction::{bounded, Configuration, Intent, Mediator, UserTrigger};
use crate::store::{
    record_event, Base64Codec, Codec, CodecStore, RememberPolicy, SecretStore, StoreError, StoreKey,
    MAX_REMEMBER_DURATION,
};

use super::{AuthMethod, Authenticator};

const CHALLENGE_LEN: usize = 10;

/// A resolved password and how it was obtained.
pub struct Unlocked {
    pub password: Zeroizing<String>,
    pub duration: Option<Duration>,
    /// `None` when the password came from the store without interaction.
    pub method: Option<AuthMethod>,
}

impl fmt::Debug for Unlocked {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unlocked")
            .field("password", &"[REDACTED]")
            .field("duration", &self.duration)
            .field("method", &self.method)
            .finish()
    }
}

/// The `result` an auth/password/passkey dialog answers with.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DialogOutcome {
    #[serde(default)]
    password: Option<String>,
    /// Remember-duration in seconds.
    #[serde(default)]
    duration: Option<u64>,
    /// Base64 raw credential id when the human used a passkey.
    #[serde(default)]
    credential_id: Option<String>,
}

struct Collected {
    password: Zeroizing<String>,
    duration: Option<Duration>,
    credential_id: Option<String>,
}

impl TryFrom<DialogOutcome> for Collected {
    type Error = EnclaveError;

    fn try_from(outcome: DialogOutcome) -> Result<Self, Self::Error> {
        let duration = outcome.duration.map(Duration::from_secs);
        if duration.is_some_and(|d| d > MAX_REMEMBER_DURATION) {
            return Err(EnclaveError::Interaction(format!(
                "remember duration exceeds {} seconds",
                MAX_REMEMBER_DURATION.as_secs()
            )));
        }
        Ok(Self {
            password: Zeroizing::new(outcome.password.unwrap_or_default()),
            duration,
            credential_id: outcome.credential_id.filter(|id| !id.is_empty()),
        })
    }
}

pub struct Arbiter {
    authenticator: Arc<dyn Authenticator>,
    unlock: Arc<UserTrigger>,
    timeout: Option<Duration>,
    kdf: KdfParams,
}

impl Arbiter {
    pub fn new(
        authenticator: Arc<dyn Authenticator>,
        unlock: Arc<UserTrigger>,
        timeout: Option<Duration>,
        kdf: KdfParams,
    ) -> Self {
        Self {
            authenticator,
            unlock,
            timeout,
            kdf,
        }
    }

    /// Return the live password, unlocking interactively when there is none.
    pub async fn ensure_password(
        &self,
        store: &mut dyn SecretStore,
        mediator: &Mediator,
        configuration: &Configuration,
    ) -> Result<Unlocked, EnclaveError> {
        if let Some(password) = store.get(StoreKey::Password)? {
            return Ok(Unlocked {
                password: Zeroizing::new(password),
                duration: store.remember_duration()?,
                method: None,
            });
        }

        let outcome = self.unlock(store, mediator, configuration).await;
        if let Err(ref e) = outcome {
            tracing::info!("Unlock failed: {}", e);
            self.unlock.enable();
        }
        outcome
    }

    /// Prompt with the generic auth dialog even if a password is cached.
    pub async fn reauthenticate(
        &self,
        store: &mut dyn SecretStore,
        mediator: &Mediator,
        configuration: &Configuration,
    ) -> Result<Unlocked, EnclaveError> {
        let collected = self.prompt(mediator, Intent::Auth, configuration).await?;
        self.persist(store, collected)
    }

    async fn unlock(
        &self,
        store: &mut dyn SecretStore,
        mediator: &Mediator,
        configuration: &Configuration,
    ) -> Result<Unlocked, EnclaveError> {
        let armed = self.unlock.arm();
        tracing::info!("Waiting for the unlock trigger");
        bounded(self.timeout, "unlock trigger", armed.pressed()).await??;
        self.unlock.disable();

        let credential_id = store.get(StoreKey::CredentialId)?;
        let preferred = store.get(StoreKey::PreferredAuthMethod)?;

        let collected = if let Some(credential_id) = credential_id {
            self.assert_passkey(&credential_id).await?
        } else if let Some(preferred) = preferred {
            let method: AuthMethod = preferred.parse().map_err(|_| StoreError::InvalidValue {
                key: StoreKey::PreferredAuthMethod.as_str(),
                value: preferred.clone(),
            })?;
            self.prompt(mediator, method.into(), configuration).await?
        } else {
            self.prompt(mediator, Intent::Auth, configuration).await?
        };

        self.persist(store, collected)
    }

    async fn prompt(
        &self,
        mediator: &Mediator,
        intent: Intent,
        configuration: &Configuration,
    ) -> Result<Collected, EnclaveError> {
        let value = mediator.open(intent, None, configuration).await?;
        let outcome: DialogOutcome = serde_json::from_value(value)
            .map_err(|e| EnclaveError::Interaction(format!("unexpected {} dialog result: {}", intent, e)))?;
        outcome.try_into()
    }

    async fn assert_passkey(&self, stored_credential_id: &str) -> Result<Collected, EnclaveError> {
        let raw_id = Base64Codec
            .decode(stored_credential_id)
            .map_err(|reason| StoreError::Codec {
                key: StoreKey::CredentialId.as_str(),
                reason,
            })?;

        let mut challenge = [0u8; CHALLENGE_LEN];
        rand::rng().fill_bytes(&mut challenge);

        tracing::info!("Requesting passkey assertion");
        let assertion = bounded(
            self.timeout,
            "passkey assertion",
            self.authenticator.request_assertion(&raw_id, &challenge),
        )
        .await??;

        let password = String::from_utf8(assertion.user_handle.clone()).map_err(|_| {
            EnclaveError::AuthenticationRejected("passkey user handle is not valid UTF-8".into())
        })?;

        Ok(Collected {
            password: Zeroizing::new(password),
            duration: None,
            credential_id: Some(Base64Codec.encode(&assertion.credential_id)),
        })
    }

    fn persist(
        &self,
        store: &mut dyn SecretStore,
        collected: Collected,
    ) -> Result<Unlocked, EnclaveError> {
        if collected.password.is_empty() {
            return Err(EnclaveError::AuthenticationRejected(
                "no password was provided".into(),
            ));
        }

        let method = match collected.credential_id {
            Some(ref credential_id) => {
                store.store_credentials(
                    &collected.password,
                    &[
                        (StoreKey::CredentialId, credential_id.as_str()),
                        (StoreKey::PreferredAuthMethod, AuthMethod::Passkey.as_str()),
                    ],
                    RememberPolicy::Keep,
                )?;
                AuthMethod::Passkey
            }
            None => {
                let remember = match collected.duration {
                    Some(duration) => RememberPolicy::For(duration),
                    None => RememberPolicy::SessionOnly,
                };
                store.store_credentials(
                    &collected.password,
                    &[(StoreKey::PreferredAuthMethod, AuthMethod::Password.as_str())],
                    remember,
                )?;
                AuthMethod::Password
            }
        };

        record_event(&*store, "unlock", Some(method.as_str()));
        tracing::info!(method = %method, "Unlocked");

        Ok(Unlocked {
            password: collected.password,
            duration: collected.duration,
            method: Some(method),
        })
    }

    /// Load the stored keypair, or derive it from the password and human id.
    /// Both halves are (re)written through the base64 codec either way.
    pub async fn ensure_key_pair(&self, store: &mut dyn SecretStore) -> Result<KeyPair, EnclaveError> {
        let stored = CodecStore::new(store, Base64Codec).get(StoreKey::EncryptionPrivateKey)?;

        let key_pair = match stored {
            Some(secret_key) => KeyPair::from_secret_key(&secret_key)?,
            None => {
                let password = store
                    .get(StoreKey::Password)?
                    .map(Zeroizing::new)
                    .ok_or(DerivationError::MissingPassword)?;
                let human_id = store
                    .get(StoreKey::HumanId)?
                    .ok_or(DerivationError::MissingSalt)?;
                let params = self.kdf;

                let seed = tokio::task::spawn_blocking(move || derive_seed(&password, &human_id, &params))
                    .await
                    .map_err(|e| DerivationError::Argon2(format!("derivation task failed: {}", e)))??;

                record_event(&*store, "key-derived", None);
                tracing::info!("Encryption keypair derived");
                KeyPair::from_seed(&seed)
            }
        };

        let mut codec = CodecStore::new(store, Base64Codec);
        codec.set(StoreKey::EncryptionPrivateKey, key_pair.secret_key())?;
        codec.set(StoreKey::EncryptionPublicKey, key_pair.public_key())?;

        Ok(key_pair)
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
