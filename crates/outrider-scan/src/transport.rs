//! Subprocess stdio transport.
//!
//! Owns one scanned server's process and pipes for the lifetime of a single
//! scan attempt. Writes are newline-terminated JSON; reads are chunked and
//! timeout-bounded so callers can poll without blocking indefinitely.
//!
//! [`ProcessTransport::shutdown`] consumes the transport, so the type system
//! guarantees each attempt releases its process exactly once. `kill_on_drop`
//! covers the remaining case of a task cancelled mid-attempt.

use std::collections::HashMap;
use std::io;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::time::timeout;
use tracing::debug;

use crate::error::{Result, ScanError};

/// Longest stderr tail retained for diagnostics.
const STDERR_TAIL_LIMIT: usize = 4096;

/// Process handle and pipes for one scan attempt.
pub struct ProcessTransport {
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: ChildStdout,
    stderr_tail: Arc<Mutex<String>>,
}

impl ProcessTransport {
    /// Spawn `command` with `args`, merging `env` onto the host environment.
    ///
    /// stdin/stdout are piped for the handshake. stderr is drained by a
    /// background task into a bounded tail buffer so a chatty server cannot
    /// fill the pipe and stall itself; the tail is logged at shutdown.
    ///
    /// # Errors
    ///
    /// [`ScanError::ExecutableNotFound`] if the command does not resolve to a
    /// runnable executable, [`ScanError::Launch`] for any other spawn failure.
    pub fn start(command: &str, args: &[String], env: &HashMap<String, String>) -> Result<Self> {
        let resolved = resolve_command(command)?;

        let mut cmd = Command::new(&resolved);
        cmd.args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        for (key, value) in env {
            cmd.env(key, value);
        }

        let mut child = cmd.spawn().map_err(|e| spawn_error(command, e))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ScanError::Launch("stdin pipe unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ScanError::Launch("stdout pipe unavailable".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| ScanError::Launch("stderr pipe unavailable".to_string()))?;

        let stderr_tail = Arc::new(Mutex::new(String::new()));
        let tail = Arc::clone(&stderr_tail);
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if let Ok(mut tail) = tail.lock() {
                    if tail.len() < STDERR_TAIL_LIMIT {
                        tail.push_str(&line);
                        tail.push('\n');
                    }
                }
            }
        });

        Ok(Self {
            child,
            stdin: Some(stdin),
            stdout,
            stderr_tail,
        })
    }

    /// Write one newline-terminated JSON message to the server's stdin.
    pub async fn write_line(&mut self, message: &Value) -> Result<()> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| ScanError::Write("stdin already closed".to_string()))?;

        let mut line = serde_json::to_vec(message).map_err(|e| ScanError::Write(e.to_string()))?;
        line.push(b'\n');

        stdin
            .write_all(&line)
            .await
            .map_err(|e| ScanError::Write(e.to_string()))?;
        stdin
            .flush()
            .await
            .map_err(|e| ScanError::Write(e.to_string()))?;
        Ok(())
    }

    /// Wait up to `wait` for more stdout bytes, reading at most `max_bytes`.
    ///
    /// A quiet timeout returns an empty chunk (not an error) so the caller
    /// can re-poll under its own budget. Stream closure with no data is a
    /// [`ScanError::Read`].
    pub async fn read_chunk(&mut self, max_bytes: usize, wait: Duration) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; max_bytes];
        match timeout(wait, self.stdout.read(&mut buf)).await {
            Err(_) => Ok(Vec::new()),
            Ok(Ok(0)) => Err(ScanError::Read("server closed stdout".to_string())),
            Ok(Ok(n)) => {
                buf.truncate(n);
                Ok(buf)
            }
            Ok(Err(e)) => Err(ScanError::Read(e.to_string())),
        }
    }

    /// Release the process: close stdin to signal EOF, give the server the
    /// grace period to exit on its own, then force-kill whatever remains.
    ///
    /// Consumes the transport; an attempt cannot shut its process down twice.
    pub async fn shutdown(mut self, grace: Duration) {
        drop(self.stdin.take());

        if timeout(grace, self.child.wait()).await.is_err() {
            debug!("server still running after stdin EOF, killing");
            if let Err(e) = self.child.kill().await {
                debug!("failed to kill server process: {}", e);
            }
        }

        let tail = self
            .stderr_tail
            .lock()
            .map(|t| t.clone())
            .unwrap_or_default();
        if !tail.is_empty() {
            debug!("server stderr tail:\n{}", tail.trim_end());
        }
    }
}

fn spawn_error(command: &str, err: io::Error) -> ScanError {
    if err.kind() == io::ErrorKind::NotFound {
        ScanError::ExecutableNotFound(command.to_string())
    } else {
        ScanError::Launch(err.to_string())
    }
}

/// On Windows, `npx` is a `.cmd` shim that `CreateProcess` cannot launch by
/// its bare name; resolve it to the script via PATH, then the usual Node.js
/// install locations.
#[cfg(windows)]
fn resolve_command(command: &str) -> Result<String> {
    use std::path::PathBuf;

    if command != "npx" {
        return Ok(command.to_string());
    }

    let from_path = std::env::var_os("PATH").and_then(|path| {
        std::env::split_paths(&path)
            .map(|dir| dir.join("npx.cmd"))
            .find(|candidate| candidate.is_file())
    });
    if let Some(found) = from_path {
        return Ok(found.to_string_lossy().into_owned());
    }

    let mut candidates = vec![
        PathBuf::from(r"C:\Program Files\nodejs\npx.cmd"),
        PathBuf::from(r"C:\Program Files (x86)\nodejs\npx.cmd"),
    ];
    if let Some(appdata) = std::env::var_os("APPDATA") {
        candidates.push(PathBuf::from(appdata).join("npm").join("npx.cmd"));
    }

    candidates
        .into_iter()
        .find(|candidate| candidate.exists())
        .map(|found| found.to_string_lossy().into_owned())
        .ok_or_else(|| ScanError::ExecutableNotFound("npx.cmd".to_string()))
}

#[cfg(not(windows))]
fn resolve_command(command: &str) -> Result<String> {
    Ok(command.to_string())
}
