// Keywarden — Interaction Mediator
//
// Opens one surface at a time, waits for readiness, performs the single
// request/reply exchange and always tears the surface down. A failed round
// trip re-enables the affordances so the human can retry.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::Mutex;

use super::protocol::{Configuration, Geometry, Intent, SurfaceRequest};
use super::surface::SurfaceLauncher;
use super::trigger::Triggers;
use super::InteractionError;

/// Await `fut`, giving up after `limit` when one is set.
pub(crate) async fn bounded<F: Future>(
    limit: Option<Duration>,
    what: &'static str,
    fut: F,
) -> Result<F::Output, InteractionError> {
    match limit {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| InteractionError::TimedOut(what)),
        None => Ok(fut.await),
    }
}

pub struct Mediator {
    launcher: Arc<dyn SurfaceLauncher>,
    triggers: Triggers,
    timeout: Option<Duration>,
    // Held for the whole round trip: at most one surface exists at a time.
    slot: Mutex<()>,
}

impl Mediator {
    pub fn new(
        launcher: Arc<dyn SurfaceLauncher>,
        triggers: Triggers,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            launcher,
            triggers,
            timeout,
            slot: Mutex::new(()),
        }
    }

    /// Run one surface round trip and return the surface's `result` value.
    pub async fn open(
        &self,
        intent: Intent,
        message: Option<Value>,
        configuration: &Configuration,
    ) -> Result<Value, InteractionError> {
        let _slot = self.slot.lock().await;
        tracing::debug!(%intent, "Opening interaction surface");

        let outcome = self.round_trip(intent, message, configuration).await;
        if let Err(ref e) = outcome {
            tracing::debug!(%intent, "Interaction failed: {}", e);
            self.triggers.enable_all();
        }
        outcome
    }

    async fn round_trip(
        &self,
        intent: Intent,
        message: Option<Value>,
        configuration: &Configuration,
    ) -> Result<Value, InteractionError> {
        let mut surface = self
            .launcher
            .launch(Geometry::for_configuration(configuration))?;

        let request = SurfaceRequest {
            intent,
            message,
            configuration: configuration.clone(),
        };
        let outcome = bounded(self.timeout, "interaction surface", async {
            surface.ready().await?;
            let reply = surface.exchange(request).await?;
            Ok::<_, InteractionError>(reply)
        })
        .await;

        surface.close().await;
        outcome.and_then(|reply| reply)?.into_result()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
