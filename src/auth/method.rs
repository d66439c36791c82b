// Keywarden — Authentication methods
//
// Persisted as `preferred-auth-method`. For passkeys the credential id lives
// under its own key (`credential-id`).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::interaction::Intent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMethod {
    Password,
    Passkey,
}

impl AuthMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMethod::Password => "password",
            AuthMethod::Passkey => "passkey",
        }
    }
}

impl fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "password" => Ok(AuthMethod::Password),
            "passkey" => Ok(AuthMethod::Passkey),
            other => Err(format!("unknown auth method '{}'", other)),
        }
    }
}

impl From<AuthMethod> for Intent {
    fn from(method: AuthMethod) -> Self {
        match method {
            AuthMethod::Password => Intent::Password,
            AuthMethod::Passkey => Intent::Passkey,
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
