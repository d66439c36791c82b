// Keywarden — Request Router
//
// The enclave's public boundary. Messages from any origin other than the
// trusted one, or addressed to an ignored target, are dropped without a reply.
// Everything else is parsed, dispatched to the enclave and answered with a
// result or an error. The affordances are hidden after every request, however
// it ends.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{json, Value};
use tokio::sync::mpsc;

use crate::enclave::{Enclave, EnclaveError};
use crate::interaction::Triggers;

use super::protocol::{InboundMessage, Request, Response};

/// Default ignore list: wallet extension chatter that shares the channel.
pub const DEFAULT_IGNORED_TARGETS: [&str; 1] = ["metamask-inpage"];

#[derive(Debug, Clone)]
pub struct RouterConfig {
    pub trusted_origin: String,
    pub ignored_targets: Vec<String>,
}

impl RouterConfig {
    pub fn new(trusted_origin: impl Into<String>) -> Self {
        Self {
            trusted_origin: trusted_origin.into(),
            ignored_targets: DEFAULT_IGNORED_TARGETS.iter().map(|t| t.to_string()).collect(),
        }
    }
}

/// Hides the affordances when dropped.
struct HideOnExit(Triggers);

impl Drop for HideOnExit {
    fn drop(&mut self) {
        self.0.hide_all();
    }
}

pub struct Router {
    enclave: Enclave,
    config: RouterConfig,
}

impl Router {
    pub fn new(enclave: Enclave, config: RouterConfig) -> Self {
        Self { enclave, config }
    }

    pub fn enclave(&self) -> &Enclave {
        &self.enclave
    }

    pub fn enclave_mut(&mut self) -> &mut Enclave {
        &mut self.enclave
    }

    /// Whether a message is addressed to the enclave at all.
    pub fn accepts(&self, origin: &str, data: &Value) -> bool {
        if origin != self.config.trusted_origin {
            return false;
        }
        match data.get("target").and_then(Value::as_str) {
            Some(target) => !self.config.ignored_targets.iter().any(|t| t == target),
            None => true,
        }
    }

    /// Handle one message. `None` means it was dropped and gets no reply.
    pub async fn handle(&mut self, origin: &str, data: &Value) -> Option<Response> {
        if !self.accepts(origin, data) {
            tracing::debug!(origin = %origin, "Dropping message not addressed to the enclave");
            return None;
        }

        let cleanup = HideOnExit(self.enclave.triggers().clone());
        let response = match self.dispatch(data).await {
            Ok(result) => Response::Result(result),
            Err(e) => {
                tracing::warn!(kind = e.kind(), "Request failed: {}", e);
                Response::error(&e)
            }
        };
        drop(cleanup);

        Some(response)
    }

    async fn dispatch(&mut self, data: &Value) -> Result<Value, EnclaveError> {
        let request = Request::parse(data)?;
        tracing::info!(request = request.name(), "Handling request");

        match request {
            Request::Storage {
                human_id,
                signer_address,
                signer_public_key,
            } => {
                let snapshot = self.enclave.storage(
                    human_id.as_deref(),
                    signer_address.as_deref(),
                    signer_public_key.as_deref(),
                )?;
                Ok(json!({
                    "humanId": snapshot.human_id,
                    "encryptionPublicKey": snapshot.encryption_public_key.map(|k| STANDARD.encode(k)),
                    "signerAddress": snapshot.signer_address,
                    "signerPublicKey": snapshot.signer_public_key,
                }))
            }
            Request::Keys { auth_method } => Ok(self
                .enclave
                .keys(auth_method)
                .await
                .map(|key| Value::String(STANDARD.encode(key)))
                .unwrap_or(Value::Null)),
            Request::Encrypt {
                message,
                receiver_public_key,
            } => {
                let envelope = self
                    .enclave
                    .encrypt(&message, receiver_public_key.as_deref())?;
                Ok(Value::String(STANDARD.encode(envelope.as_bytes())))
            }
            Request::Decrypt {
                full_message,
                sender_public_key,
            } => {
                let plaintext = self.enclave.decrypt(&full_message, &sender_public_key)?;
                Ok(Value::String(STANDARD.encode(plaintext)))
            }
            Request::Confirm { message } => Ok(Value::Bool(self.enclave.confirm(&message).await?)),
            Request::Reset {} => {
                self.enclave.reset()?;
                Ok(Value::Null)
            }
            Request::Configure { mode, theme } => {
                self.enclave.configure(mode, theme);
                Ok(Value::Null)
            }
        }
    }

    /// Serve messages from `inbox` one at a time until every sender is gone.
    pub async fn run(mut self, mut inbox: mpsc::Receiver<InboundMessage>) {
        tracing::info!(origin = %self.config.trusted_origin, "Router ready");
        while let Some(InboundMessage {
            origin,
            data,
            reply,
        }) = inbox.recv().await
        {
            match self.handle(&origin, &data).await {
                Some(response) => {
                    if reply.send(response).is_err() {
                        tracing::debug!("Caller went away before the reply");
                    }
                }
                None => drop(reply),
            }
        }
        tracing::info!("Router inbox closed");
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::UnavailableAuthenticator;
    use crate::enclave::EnclaveSettings;
    use crate::interaction::{Dialog, DialogLauncher, SurfaceReply, SurfaceRequest};
    use crate::store::{Database, SqliteSecretStore};
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::time::Duration;

    struct Decline;

    #[async_trait]
    impl Dialog for Decline {
        async fn respond(&self, _request: SurfaceRequest) -> SurfaceReply {
            SurfaceReply::Error(Value::String("declined".into()))
        }
    }

    fn router() -> Router {
        let mut settings = EnclaveSettings::new("host");
        settings.interaction_timeout = Some(Duration::from_millis(20));
        let enclave = Enclave::new(
            Box::new(SqliteSecretStore::new(Database::open_in_memory().unwrap())),
            Arc::new(DialogLauncher::new(Decline)),
            Arc::new(UnavailableAuthenticator),
            settings,
        )
        .unwrap();
        Router::new(enclave, RouterConfig::new("https://host.example"))
    }

    #[tokio::test]
    async fn test_untrusted_origin_is_dropped() {
        let mut router = router();
        let response = router
            .handle("https://evil.example", &json!({"reset": {}}))
            .await;
        assert!(response.is_none(), "Untrusted origins must get no reply at all");
    }

    #[tokio::test]
    async fn test_ignored_target_is_dropped() {
        let mut router = router();
        let data = json!({"target": "metamask-inpage", "data": {}});
        assert!(router.handle("https://host.example", &data).await.is_none());
    }

    #[tokio::test]
    async fn test_unknown_request_gets_error() {
        let mut router = router();
        let response = router
            .handle("https://host.example", &json!({"sign": {"message": "x"}}))
            .await
            .unwrap();
        match response {
            Response::Error(body) => assert_eq!(body.kind, "UnrecognizedRequest"),
            other => panic!("expected error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_storage_round_trip() {
        let mut router = router();
        let origin = "https://host.example";
        router
            .handle(origin, &json!({"storage": {"humanId": "h1", "signerAddress": "0x1"}}))
            .await
            .unwrap();

        let response = router.handle(origin, &json!({"storage": {}})).await.unwrap();
        assert_eq!(
            response,
            Response::Result(json!({
                "humanId": "h1",
                "encryptionPublicKey": null,
                "signerAddress": "0x1",
                "signerPublicKey": null,
            }))
        );
    }

    #[tokio::test]
    async fn test_affordances_hidden_after_failure() {
        let mut router = router();
        let response = router
            .handle("https://host.example", &json!({"confirm": {"message": "ok?"}}))
            .await
            .unwrap();
        assert!(response.is_error());

        let triggers = router.enclave().triggers();
        assert!(!triggers.confirm.state().visible);
        assert!(!triggers.unlock.state().visible);
    }

    #[tokio::test]
    async fn test_keys_without_unlock_is_null() {
        let mut router = router();
        let response = router
            .handle("https://host.example", &json!({"keys": {}}))
            .await
            .unwrap();
        assert_eq!(response, Response::Result(Value::Null));
    }

    #[tokio::test]
    async fn test_run_skips_reply_for_dropped_messages() {
        let (tx, rx) = mpsc::channel(4);
        let task = tokio::spawn(router().run(rx));

        let (reply_tx, reply_rx) = tokio::sync::oneshot::channel();
        tx.send(InboundMessage {
            origin: "https://evil.example".into(),
            data: json!({"reset": {}}),
            reply: reply_tx,
        })
        .await
        .unwrap();
        assert!(reply_rx.await.is_err(), "Dropped message must close the reply channel");

        let (reply_tx, reply_rx) = tokio::sync::oneshot::channel();
        tx.send(InboundMessage {
            origin: "https://host.example".into(),
            data: json!({"configure": {"mode": "new"}}),
            reply: reply_tx,
        })
        .await
        .unwrap();
        assert_eq!(reply_rx.await.unwrap(), Response::Result(Value::Null));

        drop(tx);
        task.await.unwrap();
    }
}
