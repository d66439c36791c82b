// Keywarden — CLI Module
//
// Command-line interface using clap derive macros.
// Subcommands: serve, status, reset, audit.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::execute;

/// Keywarden: a trusted enclave for a user's encryption keys.
#[derive(Parser, Debug)]
#[command(name = "keywarden")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to the TOML config file (default: <data-dir>/keywarden.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding the enclave database.
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the enclave on a Unix socket. Press Enter on stdin to press the
    /// active unlock/confirm trigger.
    Serve {
        /// Executable path of the only host allowed to talk to the enclave.
        #[arg(long)]
        trusted_origin: Option<String>,

        /// Socket path (default: $XDG_RUNTIME_DIR/keywarden/keywarden.sock).
        #[arg(long)]
        socket: Option<PathBuf>,

        /// Upper bound on every wait for the human (e.g. "5m").
        #[arg(long)]
        timeout: Option<String>,

        /// Dialog program and arguments, after `--`.
        #[arg(last = true)]
        dialog: Vec<String>,
    },

    /// Show the stored identity fields (never secrets).
    Status,

    /// Wipe all enclave state. The audit log is kept.
    Reset {
        /// Skip the safety check.
        #[arg(long)]
        yes: bool,
    },

    /// Show recent audit log entries.
    Audit {
        /// Maximum number of entries to show.
        #[arg(long, default_value = "20")]
        limit: usize,
    },
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serve_with_dialog_command() {
        let cli = Cli::try_parse_from([
            "keywarden",
            "--data-dir",
            "/tmp/kw",
            "serve",
            "--trusted-origin",
            "/usr/bin/host-app",
            "--timeout",
            "5m",
            "--",
            "kw-dialog",
            "--theme",
            "dark",
        ])
        .unwrap();

        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/kw")));
        match cli.command {
            Commands::Serve {
                trusted_origin,
                timeout,
                dialog,
                socket,
            } => {
                assert_eq!(trusted_origin.as_deref(), Some("/usr/bin/host-app"));
                assert_eq!(timeout.as_deref(), Some("5m"));
                assert_eq!(dialog, vec!["kw-dialog", "--theme", "dark"]);
                assert!(socket.is_none());
            }
            other => panic!("expected serve, got {other:?}"),
        }
    }

    #[test]
    fn test_audit_default_limit() {
        let cli = Cli::try_parse_from(["keywarden", "audit"]).unwrap();
        assert!(matches!(cli.command, Commands::Audit { limit: 20 }));
    }
}
