// Keywarden — Unix Domain Socket Transport
//
// Newline-delimited JSON over a Unix socket. Each line becomes one inbound
// message whose origin is the connecting process's executable path; messages
// go to the single router task through its inbox, so requests from all
// connections are handled one at a time. A reply is written as one JSON line;
// a dropped message produces no line.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{mpsc, oneshot};

use super::caller::CallerInfo;
use super::protocol::{InboundMessage, Response};

/// Origin used when the peer process can't be identified.
pub const UNKNOWN_ORIGIN: &str = "unknown";

pub struct UdsServer {
    socket_path: PathBuf,
    inbox: mpsc::Sender<InboundMessage>,
}

impl UdsServer {
    pub fn new(socket_path: PathBuf, inbox: mpsc::Sender<InboundMessage>) -> Self {
        Self { socket_path, inbox }
    }

    /// Default socket path: `$XDG_RUNTIME_DIR/keywarden/keywarden.sock`,
    /// falling back to `/tmp/keywarden/keywarden.sock`.
    pub fn default_socket_path() -> PathBuf {
        let runtime_dir = std::env::var("XDG_RUNTIME_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"));
        runtime_dir.join("keywarden").join("keywarden.sock")
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Bind the socket (owner-only permissions) and serve until the process
    /// is terminated or the router goes away.
    pub async fn run(&self) -> std::io::Result<()> {
        if let Some(parent) = self.socket_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        if self.socket_path.exists() {
            tokio::fs::remove_file(&self.socket_path).await?;
        }

        let listener = UnixListener::bind(&self.socket_path)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.socket_path, std::fs::Permissions::from_mode(0o600))?;
        }

        tracing::info!(socket = %self.socket_path.display(), "Keywarden listening");

        loop {
            let (stream, _addr) = listener.accept().await?;
            let inbox = self.inbox.clone();
            if inbox.is_closed() {
                tracing::info!("Router stopped; closing socket");
                return Ok(());
            }

            tokio::spawn(async move {
                if let Err(e) = handle_connection(stream, inbox).await {
                    tracing::error!("Connection handler error: {}", e);
                }
            });
        }
    }
}

async fn handle_connection(
    stream: UnixStream,
    inbox: mpsc::Sender<InboundMessage>,
) -> std::io::Result<()> {
    let caller = CallerInfo::from_stream(&stream);
    let origin = caller
        .as_ref()
        .map(CallerInfo::origin)
        .unwrap_or_else(|| UNKNOWN_ORIGIN.to_string());
    match caller {
        Some(ref info) => tracing::info!(%info, "Client connected"),
        None => tracing::info!("Client connected (unidentified)"),
    }

    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        // Unparseable input still reaches the router, which answers it with
        // an error if the origin is trusted.
        let data = serde_json::from_str(&line).unwrap_or(Value::Null);

        let Some(response) = forward(&inbox, origin.clone(), data).await else {
            continue;
        };

        let mut json = serde_json::to_string(&response)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        json.push('\n');
        writer.write_all(json.as_bytes()).await?;
        writer.flush().await?;
    }

    Ok(())
}

/// Hand one message to the router and wait for its reply, if any.
async fn forward(
    inbox: &mpsc::Sender<InboundMessage>,
    origin: String,
    data: Value,
) -> Option<Response> {
    let (reply, response) = oneshot::channel();
    let message = InboundMessage {
        origin,
        data,
        reply,
    };
    if inbox.send(message).await.is_err() {
        tracing::warn!("Router is gone; message discarded");
        return None;
    }
    response.await.ok()
}

// ─── Tests ───────────────────────────────────────────────────────────────────
