// Keywarden — In-process Dialog Surface
//
// Runs a `Dialog` as its own task per interaction. The task talks to the
// enclave only through three single-use channels (ready, request, reply), so
// the enclave cannot reach into the dialog's state.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use super::protocol::{Geometry, SurfaceReply, SurfaceRequest};
use super::surface::{Surface, SurfaceLauncher};
use super::InteractionError;

/// Decision logic behind an in-process surface.
#[async_trait]
pub trait Dialog: Send + Sync + 'static {
    async fn respond(&self, request: SurfaceRequest) -> SurfaceReply;
}

pub struct DialogLauncher<D> {
    dialog: Arc<D>,
}

impl<D: Dialog> DialogLauncher<D> {
    pub fn new(dialog: D) -> Self {
        Self {
            dialog: Arc::new(dialog),
        }
    }

    pub fn shared(dialog: Arc<D>) -> Self {
        Self { dialog }
    }
}

impl<D: Dialog> SurfaceLauncher for DialogLauncher<D> {
    fn launch(&self, geometry: Geometry) -> Result<Box<dyn Surface>, InteractionError> {
        let (ready_tx, ready_rx) = oneshot::channel();
        let (request_tx, request_rx) = oneshot::channel::<SurfaceRequest>();
        let (reply_tx, reply_rx) = oneshot::channel();
        let dialog = self.dialog.clone();

        tracing::debug!(width = geometry.width, height = geometry.height, "Starting dialog task");
        let task = tokio::spawn(async move {
            if ready_tx.send(()).is_err() {
                return;
            }
            let Ok(request) = request_rx.await else {
                return;
            };
            let reply = dialog.respond(request).await;
            let _ = reply_tx.send(reply);
        });

        Ok(Box::new(DialogSurface {
            ready: Some(ready_rx),
            request: Some(request_tx),
            reply: Some(reply_rx),
            task,
        }))
    }
}

struct DialogSurface {
    ready: Option<oneshot::Receiver<()>>,
    request: Option<oneshot::Sender<SurfaceRequest>>,
    reply: Option<oneshot::Receiver<SurfaceReply>>,
    task: JoinHandle<()>,
}

#[async_trait]
impl Surface for DialogSurface {
    async fn ready(&mut self) -> Result<(), InteractionError> {
        let ready = self
            .ready
            .take()
            .ok_or_else(|| InteractionError::Protocol("readiness already consumed".into()))?;
        ready.await.map_err(|_| InteractionError::Closed)
    }

    async fn exchange(&mut self, request: SurfaceRequest) -> Result<SurfaceReply, InteractionError> {
        let (Some(sender), Some(reply)) = (self.request.take(), self.reply.take()) else {
            return Err(InteractionError::Protocol("request already sent".into()));
        };
        sender.send(request).map_err(|_| InteractionError::Closed)?;
        reply.await.map_err(|_| InteractionError::Closed)
    }

    async fn close(&mut self) {
        self.task.abort();
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interaction::{Configuration, Intent};
    use serde_json::json;

    struct Echo;

    #[async_trait]
    impl Dialog for Echo {
        async fn respond(&self, request: SurfaceRequest) -> SurfaceReply {
            SurfaceReply::Result(json!({ "intent": request.intent.as_str() }))
        }
    }

    fn request() -> SurfaceRequest {
        SurfaceRequest {
            intent: Intent::Password,
            message: None,
            configuration: Configuration::default(),
        }
    }

    #[tokio::test]
    async fn test_dialog_round_trip() {
        let launcher = DialogLauncher::new(Echo);
        let mut surface = launcher
            .launch(Geometry::for_configuration(&Configuration::default()))
            .unwrap();
        surface.ready().await.unwrap();
        let reply = surface.exchange(request()).await.unwrap();
        surface.close().await;
        assert_eq!(reply, SurfaceReply::Result(json!({"intent": "password"})));
    }

    #[tokio::test]
    async fn test_second_exchange_is_refused() {
        let launcher = DialogLauncher::new(Echo);
        let mut surface = launcher
            .launch(Geometry::for_configuration(&Configuration::default()))
            .unwrap();
        surface.ready().await.unwrap();
        surface.exchange(request()).await.unwrap();
        let err = surface.exchange(request()).await.unwrap_err();
        assert!(matches!(err, InteractionError::Protocol(_)));
    }
}
