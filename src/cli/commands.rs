// Keywarden — CLI Command Handlers
//
// Each function handles one CLI subcommand. `serve` wires the store, the
// dialog process launcher, the enclave and the router behind the Unix socket,
// and turns lines typed on stdin into trigger presses.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use crate::auth::UnavailableAuthenticator;
use crate::config::KeywardenConfig;
use crate::enclave::{Enclave, StorageSnapshot};
use crate::error::KeywardenError;
use crate::gateway::{Router, UdsServer};
use crate::interaction::{ProcessLauncher, Triggers};
use crate::store::{record_event, SecretStore, SqliteSecretStore, StoreKey};

use super::{Cli, Commands};

/// Router inbox depth; requests beyond this wait at the transport.
const INBOX_CAPACITY: usize = 32;

/// Execute the parsed CLI command.
pub async fn execute(cli: Cli) -> Result<(), KeywardenError> {
    let config = KeywardenConfig::resolve(cli.config.as_deref(), cli.data_dir)?;

    match cli.command {
        Commands::Serve {
            trusted_origin,
            socket,
            timeout,
            dialog,
        } => {
            let mut config = config;
            if trusted_origin.is_some() {
                config.trusted_origin = trusted_origin;
            }
            if let Some(socket) = socket {
                config.socket_path = socket;
            }
            if timeout.is_some() {
                config.interaction_timeout = timeout;
            }
            if !dialog.is_empty() {
                config.dialog_command = dialog;
            }
            cmd_serve(config).await
        }
        Commands::Status => cmd_status(&config),
        Commands::Reset { yes } => cmd_reset(&config, yes),
        Commands::Audit { limit } => cmd_audit(&config, limit),
    }
}

fn open_store(config: &KeywardenConfig) -> Result<SqliteSecretStore, KeywardenError> {
    Ok(SqliteSecretStore::open(&config.db_path())?)
}

// ─── Serve ───────────────────────────────────────────────────────────────────

async fn cmd_serve(config: KeywardenConfig) -> Result<(), KeywardenError> {
    let router_config = config.router_config()?;
    let settings = config.enclave_settings()?;
    let launcher = ProcessLauncher::from_command(&config.dialog_command).ok_or_else(|| {
        KeywardenError::Other(
            "No dialog program configured. Set dialog_command or pass one after `--`.".into(),
        )
    })?;

    let store = open_store(&config)?;
    let enclave = Enclave::new(
        Box::new(store),
        Arc::new(launcher),
        Arc::new(UnavailableAuthenticator),
        settings,
    )?;
    let router = Router::new(enclave, router_config);
    let triggers = router.enclave().triggers().clone();

    let (inbox_tx, inbox_rx) = mpsc::channel(INBOX_CAPACITY);
    tokio::spawn(router.run(inbox_rx));
    tokio::spawn(press_triggers_from_stdin(triggers));

    println!("Keywarden serving on {}", config.socket_path.display());
    println!("  Database: {}", config.db_path().display());
    println!("  Press Enter to unlock or confirm when asked.");

    UdsServer::new(config.socket_path.clone(), inbox_tx)
        .run()
        .await?;
    Ok(())
}

/// Each line on stdin presses whichever trigger is currently armed.
async fn press_triggers_from_stdin(triggers: Triggers) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(_)) => match triggers.press_active() {
                Some(name) => println!("✓ {} pressed", name),
                None => println!("Nothing is waiting for you right now."),
            },
            Ok(None) => break,
            Err(e) => {
                tracing::warn!("Couldn't read stdin: {}", e);
                break;
            }
        }
    }
}

// ─── Status ──────────────────────────────────────────────────────────────────

fn cmd_status(config: &KeywardenConfig) -> Result<(), KeywardenError> {
    let mut store = open_store(config)?;
    let snapshot = StorageSnapshot::read(&mut store)?;

    let show = |value: Option<String>| value.unwrap_or_else(|| "-".to_string());

    println!("Keywarden state ({})", config.db_path().display());
    println!("{:-<80}", "");
    println!("Human ID:              {}", show(snapshot.human_id));
    println!("Signer address:        {}", show(snapshot.signer_address));
    println!("Signer public key:     {}", show(snapshot.signer_public_key));
    println!(
        "Encryption public key: {}",
        show(snapshot.encryption_public_key.map(|k| STANDARD.encode(k)))
    );
    println!(
        "Preferred auth method: {}",
        show(store.get(StoreKey::PreferredAuthMethod)?)
    );
    println!(
        "Remember duration:     {}",
        show(store.remember_duration()?.map(|d| format!("{}s", d.as_secs())))
    );
    let remembered = store.get(StoreKey::Password)?.is_some();
    println!(
        "Remembered password:   {}",
        if remembered { "yes" } else { "no" }
    );
    println!("{:-<80}", "");

    Ok(())
}

// ─── Reset ───────────────────────────────────────────────────────────────────

fn cmd_reset(config: &KeywardenConfig, yes: bool) -> Result<(), KeywardenError> {
    if !yes {
        return Err(KeywardenError::Other(
            "This wipes the stored keypair and identity. Re-run with --yes to proceed.".into(),
        ));
    }

    let mut store = open_store(config)?;
    store.reset()?;
    record_event(&store, "reset", Some("cli"));

    println!("✓ Enclave state cleared");
    Ok(())
}

// ─── Audit ───────────────────────────────────────────────────────────────────

fn cmd_audit(config: &KeywardenConfig, limit: usize) -> Result<(), KeywardenError> {
    let store = open_store(config)?;
    let entries = store.audit_log(limit)?;

    if entries.is_empty() {
        println!("No audit entries yet.");
        return Ok(());
    }

    println!("Audit Log (last {})", entries.len());
    println!("{:-<80}", "");
    for entry in entries {
        println!("{}", entry);
    }
    println!("{:-<80}", "");

    Ok(())
}
