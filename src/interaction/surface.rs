// Keywarden — Surface abstraction
//
// A surface is an isolated context the host cannot script. The enclave only
// sees the readiness signal and the single reply; whatever happens inside is
// the surface's business.

use async_trait::async_trait;

use super::protocol::{Geometry, SurfaceReply, SurfaceRequest};
use super::InteractionError;

#[async_trait]
pub trait Surface: Send {
    /// Wait until the surface says it can take a request.
    async fn ready(&mut self) -> Result<(), InteractionError>;

    /// Send the one request and wait for the one reply.
    async fn exchange(&mut self, request: SurfaceRequest) -> Result<SurfaceReply, InteractionError>;

    /// Tear the surface down. Safe to call after a failure.
    async fn close(&mut self);
}

/// Creates a fresh surface per interaction.
pub trait SurfaceLauncher: Send + Sync {
    fn launch(&self, geometry: Geometry) -> Result<Box<dyn Surface>, InteractionError>;
}
