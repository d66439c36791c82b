// Keywarden — Configuration
//
// Resolved in increasing precedence from built-in defaults, an optional TOML
// file (`--config`, default `<data_dir>/keywarden.toml`) and CLI flags.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::crypto::KdfParams;
use crate::enclave::EnclaveSettings;
use crate::gateway::{RouterConfig, UdsServer, DEFAULT_IGNORED_TARGETS};
use crate::interaction::Configuration;

const CONFIG_FILE: &str = "keywarden.toml";
const DB_FILE: &str = "keywarden.db";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Couldn't read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid duration '{0}' (use e.g. 30s, 5m, 1h, 1d)")]
    InvalidDuration(String),

    #[error("No trusted origin configured; set trusted_origin or pass --trusted-origin")]
    MissingTrustedOrigin,
}

/// Default directory for Keywarden data files.
pub fn default_data_dir() -> PathBuf {
    dirs_next::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("keywarden")
}

fn default_ignored_targets() -> Vec<String> {
    DEFAULT_IGNORED_TARGETS.iter().map(|t| t.to_string()).collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywardenConfig {
    /// Origin (caller executable path) whose requests are served.
    #[serde(default)]
    pub trusted_origin: Option<String>,

    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "UdsServer::default_socket_path")]
    pub socket_path: PathBuf,

    /// `data.target` values that are never for the enclave.
    #[serde(default = "default_ignored_targets")]
    pub ignored_targets: Vec<String>,

    #[serde(default)]
    pub mode: Option<String>,

    #[serde(default)]
    pub theme: Option<String>,

    /// Bound on every wait for the human, e.g. "5m". Absent means unbounded.
    #[serde(default)]
    pub interaction_timeout: Option<String>,

    /// Dialog program and its arguments.
    #[serde(default)]
    pub dialog_command: Vec<String>,

    #[serde(default)]
    pub kdf: KdfParams,
}

impl Default for KeywardenConfig {
    fn default() -> Self {
        Self {
            trusted_origin: None,
            data_dir: default_data_dir(),
            socket_path: UdsServer::default_socket_path(),
            ignored_targets: default_ignored_targets(),
            mode: None,
            theme: None,
            interaction_timeout: None,
            dialog_command: Vec::new(),
            kdf: KdfParams::default(),
        }
    }
}

impl KeywardenConfig {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&content)?)
    }

    /// Resolve the effective config. An explicit `config_path` must exist;
    /// the default file under the data directory is optional.
    pub fn resolve(
        config_path: Option<&Path>,
        data_dir: Option<PathBuf>,
    ) -> Result<Self, ConfigError> {
        let mut config = match config_path {
            Some(path) => Self::load(path)?,
            None => {
                let dir = data_dir.clone().unwrap_or_else(default_data_dir);
                let path = dir.join(CONFIG_FILE);
                if path.exists() {
                    Self::load(&path)?
                } else {
                    Self::default()
                }
            }
        };

        if let Some(dir) = data_dir {
            config.data_dir = dir;
        }
        Ok(config)
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(DB_FILE)
    }

    pub fn interaction_timeout(&self) -> Result<Option<Duration>, ConfigError> {
        match self.interaction_timeout.as_deref() {
            Some(raw) => Ok(Some(parse_duration(raw)?).filter(|d| !d.is_zero())),
            None => Ok(None),
        }
    }

    pub fn router_config(&self) -> Result<RouterConfig, ConfigError> {
        let trusted_origin = self
            .trusted_origin
            .clone()
            .filter(|o| !o.is_empty())
            .ok_or(ConfigError::MissingTrustedOrigin)?;
        Ok(RouterConfig {
            trusted_origin,
            ignored_targets: self.ignored_targets.clone(),
        })
    }

    pub fn enclave_settings(&self) -> Result<EnclaveSettings, ConfigError> {
        let origin = self
            .trusted_origin
            .clone()
            .ok_or(ConfigError::MissingTrustedOrigin)?;
        Ok(EnclaveSettings {
            origin,
            configuration: Configuration {
                mode: self.mode.clone(),
                theme: self.theme.clone(),
            },
            interaction_timeout: self.interaction_timeout()?,
            kdf: self.kdf,
        })
    }
}

/// Parse a duration like "30s", "5m", "1h" or "2d".
pub fn parse_duration(raw: &str) -> Result<Duration, ConfigError> {
    let invalid = || ConfigError::InvalidDuration(raw.to_string());
    let trimmed = raw.trim();

    let split = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .ok_or_else(invalid)?;
    let (digits, unit) = trimmed.split_at(split);
    let amount: u64 = digits.parse().map_err(|_| invalid())?;

    let secs = match unit {
        "s" => Some(amount),
        "m" => amount.checked_mul(60),
        "h" => amount.checked_mul(60 * 60),
        "d" => amount.checked_mul(24 * 60 * 60),
        _ => None,
    }
    .ok_or_else(invalid)?;

    Ok(Duration::from_secs(secs))
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration_units() {
        assert_eq!(parse_duration("30s").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_duration("5m").unwrap(), Duration::from_secs(300));
        assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3600));
        assert_eq!(parse_duration("2d").unwrap(), Duration::from_secs(172_800));
        assert_eq!(parse_duration(" 10s ").unwrap(), Duration::from_secs(10));
    }

    #[test]
    fn test_parse_duration_rejects_garbage() {
        for raw in ["", "10", "m", "10x", "1.5h", "10mins"] {
            assert!(parse_duration(raw).is_err(), "'{}' should be rejected", raw);
        }
    }

    #[test]
    fn test_zero_timeout_means_unbounded() {
        let config = KeywardenConfig {
            interaction_timeout: Some("0s".into()),
            ..KeywardenConfig::default()
        };
        assert_eq!(config.interaction_timeout().unwrap(), None);
    }

    #[test]
    fn test_load_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keywarden.toml");
        std::fs::write(
            &path,
            r#"
trusted_origin = "/usr/bin/host-app"
interaction_timeout = "2m"
dialog_command = ["keywarden-dialog", "--theme", "dark"]

[kdf]
m_cost = 1024
"#,
        )
        .unwrap();

        let config = KeywardenConfig::load(&path).unwrap();
        assert_eq!(config.trusted_origin.as_deref(), Some("/usr/bin/host-app"));
        assert_eq!(config.ignored_targets, vec!["metamask-inpage".to_string()]);
        assert_eq!(config.kdf.m_cost, 1024);
        assert_eq!(config.kdf.t_cost, KdfParams::default().t_cost);
        assert_eq!(
            config.interaction_timeout().unwrap(),
            Some(Duration::from_secs(120))
        );

        let settings = config.enclave_settings().unwrap();
        assert_eq!(settings.origin, "/usr/bin/host-app");
    }

    #[test]
    fn test_resolve_default_file_is_optional() {
        let dir = tempfile::tempdir().unwrap();
        let config = KeywardenConfig::resolve(None, Some(dir.path().to_path_buf())).unwrap();
        assert_eq!(config.data_dir, dir.path());
        assert_eq!(config.db_path(), dir.path().join("keywarden.db"));
        assert!(config.trusted_origin.is_none());
    }

    #[test]
    fn test_resolve_explicit_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        let err = KeywardenConfig::resolve(Some(&missing), None).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_router_config_requires_origin() {
        let err = KeywardenConfig::default().router_config().unwrap_err();
        assert!(matches!(err, ConfigError::MissingTrustedOrigin));
    }
}
