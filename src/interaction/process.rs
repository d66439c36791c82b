// Keywarden — Subprocess Surface
//
// Runs the configured dialog program once per interaction. The program gets
// `--width`/`--height` hints, prints `{"ready":true}` on stdout when it can take
// a request, reads exactly one JSON request line on stdin and answers with
// exactly one JSON reply line. The child is killed on close or drop.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

use super::protocol::{Geometry, SurfaceReply, SurfaceRequest};
use super::surface::{Surface, SurfaceLauncher};
use super::InteractionError;

#[derive(Debug, Clone)]
pub struct ProcessLauncher {
    program: PathBuf,
    args: Vec<String>,
}

impl ProcessLauncher {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Build from `[program, args...]`. `None` for an empty command.
    pub fn from_command(command: &[String]) -> Option<Self> {
        let (program, args) = command.split_first()?;
        Some(Self::new(program, args.to_vec()))
    }
}

impl SurfaceLauncher for ProcessLauncher {
    fn launch(&self, geometry: Geometry) -> Result<Box<dyn Surface>, InteractionError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg("--width")
            .arg(geometry.width.to_string())
            .arg("--height")
            .arg(geometry.height.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| InteractionError::Launch(format!("{}: {}", self.program.display(), e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| InteractionError::Launch("dialog stdin unavailable".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| InteractionError::Launch("dialog stdout unavailable".into()))?;

        tracing::debug!(program = %self.program.display(), pid = child.id(), "Dialog process started");
        Ok(Box::new(ProcessSurface {
            child,
            stdin: Some(stdin),
            lines: BufReader::new(stdout).lines(),
        }))
    }
}

struct ProcessSurface {
    child: Child,
    stdin: Option<ChildStdin>,
    lines: Lines<BufReader<ChildStdout>>,
}

impl ProcessSurface {
    /// Next non-blank stdout line.
    async fn next_line(&mut self) -> Result<String, InteractionError> {
        loop {
            match self.lines.next_line().await? {
                Some(line) if line.trim().is_empty() => continue,
                Some(line) => return Ok(line),
                None => return Err(InteractionError::Closed),
            }
        }
    }
}

#[async_trait]
impl Surface for ProcessSurface {
    async fn ready(&mut self) -> Result<(), InteractionError> {
        let line = self.next_line().await?;
        let value: Value = serde_json::from_str(&line)
            .map_err(|e| InteractionError::Protocol(format!("readiness line: {}", e)))?;
        if value.get("ready") == Some(&Value::Bool(true)) {
            Ok(())
        } else {
            Err(InteractionError::Protocol(format!(
                "expected readiness signal, got {}",
                value
            )))
        }
    }

    async fn exchange(&mut self, request: SurfaceRequest) -> Result<SurfaceReply, InteractionError> {
        let mut stdin = self
            .stdin
            .take()
            .ok_or_else(|| InteractionError::Protocol("request already sent".into()))?;

        let mut json = serde_json::to_string(&request)
            .map_err(|e| InteractionError::Protocol(e.to_string()))?;
        json.push('\n');
        stdin.write_all(json.as_bytes()).await?;
        stdin.flush().await?;
        drop(stdin);

        let line = self.next_line().await?;
        serde_json::from_str(&line)
            .map_err(|e| InteractionError::Protocol(format!("reply line: {}", e)))
    }

    async fn close(&mut self) {
        self.stdin.take();
        if let Err(e) = self.child.kill().await {
            tracing::debug!("Dialog process already gone: {}", e);
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
