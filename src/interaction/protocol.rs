// Keywarden — Interaction Surface Protocol
//
// The enclave sends exactly one `SurfaceRequest` to a surface after it signals
// readiness, and the surface answers with exactly one `SurfaceReply`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::InteractionError;

/// Why a surface is being opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    /// Let the human pick a method and unlock.
    Auth,
    Password,
    Passkey,
    Confirm,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Auth => "auth",
            Intent::Password => "password",
            Intent::Passkey => "passkey",
            Intent::Confirm => "confirm",
        }
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Presentation hints forwarded to every surface.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Configuration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
}

impl Configuration {
    /// Whether the host asked for the "new account" flow.
    pub fn is_new(&self) -> bool {
        self.mode.as_deref() == Some("new")
    }
}

/// enclave → surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfaceRequest {
    pub intent: Intent,
    #[serde(default)]
    pub message: Option<Value>,
    #[serde(default)]
    pub configuration: Configuration,
}

/// surface → enclave: `{"result": ...}` or `{"error": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SurfaceReply {
    Result(Value),
    Error(Value),
}

impl SurfaceReply {
    pub fn into_result(self) -> Result<Value, InteractionError> {
        match self {
            SurfaceReply::Result(value) => Ok(value),
            SurfaceReply::Error(value) => Err(InteractionError::Rejected(value)),
        }
    }
}

/// Window size hint for a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub width: u32,
    pub height: u32,
}

impl Geometry {
    pub fn for_configuration(configuration: &Configuration) -> Self {
        Self {
            width: 600,
            height: if configuration.is_new() { 600 } else { 400 },
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
