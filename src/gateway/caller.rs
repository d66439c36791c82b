// Keywarden — Caller Identity
//
// The socket transport's origin check. A connecting process is identified by
// its peer credentials (SO_PEERCRED) and the executable behind
// /proc/<pid>/exe; the executable path is the origin compared against the
// configured trusted origin, and a SHA-256 digest of the binary is kept for
// the audit trail.

use std::fmt;
use std::fs;
use std::io;
use std::path::PathBuf;

use sha2::{Digest, Sha256};

#[derive(Debug, Clone)]
pub struct CallerInfo {
    pub pid: u32,
    pub exe_path: PathBuf,
    /// SHA-256 hex digest of the executable.
    pub exe_digest: String,
}

impl CallerInfo {
    /// Resolve the executable of process `pid` and fingerprint it.
    pub fn from_pid(pid: u32) -> io::Result<Self> {
        let exe_path = fs::read_link(format!("/proc/{}/exe", pid))?;
        let digest = Sha256::digest(fs::read(&exe_path)?);
        let exe_digest = digest.iter().map(|b| format!("{:02x}", b)).collect();

        Ok(Self {
            pid,
            exe_path,
            exe_digest,
        })
    }

    /// Identify the process on the other end of `stream`. `None` when the
    /// platform can't tell.
    pub fn from_stream(stream: &tokio::net::UnixStream) -> Option<Self> {
        #[cfg(target_os = "linux")]
        {
            let pid = stream.peer_cred().ok()?.pid()?;
            let pid = u32::try_from(pid).ok()?;
            match Self::from_pid(pid) {
                Ok(info) => Some(info),
                Err(e) => {
                    tracing::debug!(pid, "Couldn't resolve caller executable: {}", e);
                    None
                }
            }
        }
        #[cfg(not(target_os = "linux"))]
        {
            let _ = stream;
            None
        }
    }

    /// The origin string the router checks against the trusted origin.
    pub fn origin(&self) -> String {
        self.exe_path.display().to_string()
    }

    /// First 16 hex chars of the executable digest.
    pub fn fingerprint(&self) -> &str {
        &self.exe_digest[..self.exe_digest.len().min(16)]
    }
}

impl fmt::Display for CallerInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "pid {} ({}) [{}…]",
            self.pid,
            self.exe_path.display(),
            self.fingerprint()
        )
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
