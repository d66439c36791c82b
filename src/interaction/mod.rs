// Keywarden — Interaction Module
//
// Everything that involves the human: the unlock/confirm triggers, the
// isolated surfaces (in-process dialog actor or dialog subprocess) and the
// mediator that runs one surface round trip at a time.

mod actor;
mod error;
mod mediator;
mod process;
mod protocol;
mod surface;
mod trigger;

pub use actor::{Dialog, DialogLauncher};
pub use error::InteractionError;
pub(crate) use mediator::bounded;
pub use mediator::Mediator;
pub use process::ProcessLauncher;
pub use protocol::{Configuration, Geometry, Intent, SurfaceReply, SurfaceRequest};
pub use surface::{Surface, SurfaceLauncher};
pub use trigger::{Armed, TriggerState, Triggers, UserTrigger};
