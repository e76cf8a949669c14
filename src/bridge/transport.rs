//! Stdio transport with newline-delimited JSON framing.
//!
//! The subordinate process reads one JSON object per line on stdin and
//! writes one JSON object per line on stdout:
//! ```text
//! {"jsonrpc":"2.0","id":1,"method":"tools/list","params":{}}\n
//! ```
//! Its stdout also carries diagnostic text. Lines that are not JSON objects
//! are dropped by the reader without error.

use std::fmt;
use std::process::Stdio;
use std::time::Duration;

use log::{debug, trace};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

use crate::error::{BridgeError, BridgeResult};

/// Grace period between SIGTERM and SIGKILL.
pub const TERMINATE_GRACE: Duration = Duration::from_secs(2);

/// Command line and environment for the subordinate process.
///
/// `Debug` lists environment keys only, since values carry secrets.
#[derive(Clone, PartialEq, Eq)]
pub struct SubordinateCommand {
    /// Program followed by its arguments.
    pub argv: Vec<String>,
    /// Extra environment variables (e.g. the authorization token).
    pub env: Vec<(String, String)>,
}

impl SubordinateCommand {
    /// Command with no extra environment.
    pub fn new(argv: Vec<String>) -> Self {
        Self {
            argv,
            env: Vec::new(),
        }
    }

    /// Add an environment variable for the child.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Program name, for logs and errors.
    pub fn program(&self) -> &str {
        self.argv.first().map(String::as_str).unwrap_or("")
    }
}

impl fmt::Debug for SubordinateCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubordinateCommand")
            .field("argv", &self.argv)
            .field("env", &self.env.iter().map(|(k, _)| k).collect::<Vec<_>>())
            .finish()
    }
}

/// A freshly spawned subordinate with its stdio split into reader and writer.
pub struct SpawnedProcess {
    pub child: Child,
    pub writer: LineWriter<ChildStdin>,
    pub reader: LineReader<ChildStdout>,
}

/// Spawn the subordinate process with piped stdin/stdout.
///
/// stderr is discarded; the child is killed if its handle is dropped.
pub fn spawn_subordinate(command: &SubordinateCommand) -> BridgeResult<SpawnedProcess> {
    let program = command.program().to_string();
    let Some((head, args)) = command.argv.split_first() else {
        return Err(BridgeError::config("subordinate command is empty"));
    };

    let mut child = Command::new(head)
        .args(args)
        .envs(command.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| BridgeError::Spawn {
            program: program.clone(),
            source,
        })?;

    let stdin = child
        .stdin
        .take()
        .ok_or_else(|| std::io::Error::other(format!("failed to capture stdin of {}", program)))?;
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| std::io::Error::other(format!("failed to capture stdout of {}", program)))?;

    debug!(
        target: "tweetbridge::bridge::transport",
        "Spawned {} (pid {:?})",
        program,
        child.id()
    );

    Ok(SpawnedProcess {
        child,
        writer: LineWriter::new(stdin),
        reader: LineReader::new(stdout),
    })
}

/// Writes newline-terminated messages.
pub struct LineWriter<W> {
    inner: W,
}

impl<W: AsyncWrite + Unpin> LineWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Write one encoded message followed by `\n` and flush.
    pub async fn write_line(&mut self, line: &str) -> std::io::Result<()> {
        let mut frame = Vec::with_capacity(line.len() + 1);
        frame.extend_from_slice(line.as_bytes());
        frame.push(b'\n');
        self.inner.write_all(&frame).await?;
        self.inner.flush().await
    }
}

/// Reads newline-delimited JSON objects, skipping everything else.
pub struct LineReader<R> {
    inner: BufReader<R>,
    line: Vec<u8>,
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner: BufReader::new(inner),
            line: Vec::new(),
        }
    }

    /// Read until the next JSON object.
    ///
    /// Returns `Ok(None)` on EOF. A trailing line without `\n` at EOF is
    /// still parsed.
    pub async fn read_message(&mut self) -> std::io::Result<Option<Value>> {
        loop {
            self.line.clear();
            let read = self.inner.read_until(b'\n', &mut self.line).await?;
            if read == 0 {
                return Ok(None);
            }
            if let Some(message) = parse_line(&self.line) {
                return Ok(Some(message));
            }
        }
    }
}

/// Parse one line as a JSON object.
///
/// Blank lines, non-JSON text and JSON that is not an object yield `None`.
pub fn parse_line(line: &[u8]) -> Option<Value> {
    let trimmed = line.trim_ascii();
    if trimmed.is_empty() {
        return None;
    }
    match serde_json::from_slice::<Value>(trimmed) {
        Ok(value @ Value::Object(_)) => Some(value),
        Ok(_) | Err(_) => {
            trace!(
                target: "tweetbridge::bridge::transport",
                "Dropping non-protocol line: {}",
                String::from_utf8_lossy(trimmed)
            );
            None
        }
    }
}

/// Terminate the child and reap it.
///
/// Idempotent: a child that already exited is only reaped.
///
/// **Unix**: SIGTERM, then SIGKILL if it is still alive after `grace`.
/// **Other platforms**: kill directly.
pub async fn terminate(child: &mut Child, grace: Duration) {
    if let Ok(Some(status)) = child.try_wait() {
        debug!(
            target: "tweetbridge::bridge::transport",
            "Subordinate already exited with {}",
            status
        );
        return;
    }

    #[cfg(unix)]
    if let Some(pid) = child.id().and_then(|pid| i32::try_from(pid).ok()) {
        use nix::sys::signal::{Signal, kill};
        use nix::unistd::Pid;

        if kill(Pid::from_raw(pid), Signal::SIGTERM).is_ok()
            && tokio::time::timeout(grace, child.wait()).await.is_ok()
        {
            return;
        }
    }
    #[cfg(not(unix))]
    let _ = grace;

    if let Err(e) = child.start_kill() {
        debug!(
            target: "tweetbridge::bridge::transport",
            "Kill failed (process likely gone): {}",
            e
        );
    }
    let _ = child.wait().await;
}
