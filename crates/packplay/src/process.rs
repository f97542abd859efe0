//! External tool runner.
//!
//! Spawns a command in a working directory, forwards its combined
//! stdout/stderr into an [`ExecutionLog`] while it runs, and turns any
//! non-zero exit into a [`ProcessError`]. No retries and no timeout: a caller
//! that wants a deadline drops the future, which kills the child.

use crate::log::ExecutionLog;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::debug;

/// Bound on buffered output chunks between the pipe readers and the log.
const OUTPUT_CHANNEL_CAPACITY: usize = 64;

/// Read size for each pipe.
const READ_BUFFER_SIZE: usize = 8192;

/// One external command: program, arguments and working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
}

impl Invocation {
    pub fn new(program: impl Into<String>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: cwd.into(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }
}

impl fmt::Display for Invocation {
    /// Renders the command line the way a user would type it.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&quote_arg(&self.program))?;
        for arg in &self.args {
            write!(f, " {}", quote_arg(arg))?;
        }
        Ok(())
    }
}

/// Quote an argument for display only; nothing is passed through a shell.
fn quote_arg(arg: &str) -> String {
    if arg.is_empty() {
        return "''".to_string();
    }
    if arg.contains(' ') || arg.contains('"') || arg.contains('\'') {
        format!("'{}'", arg.replace('\'', "'\\''"))
    } else {
        arg.to_string()
    }
}

/// Failure of a single external command.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("failed to start `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed waiting for `{command}`: {source}")]
    Wait {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("process {} (`{command}`) {}", describe_pid(.pid), describe_exit(.code))]
    Exit {
        command: String,
        pid: Option<u32>,
        /// `None` when the process was terminated by a signal.
        code: Option<i32>,
    },
}

impl ProcessError {
    /// The command line of the failed process.
    pub fn command(&self) -> &str {
        match self {
            Self::Spawn { command, .. } | Self::Wait { command, .. } | Self::Exit { command, .. } => {
                command
            }
        }
    }

    /// Exit code, when the process ran and exited normally.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::Exit { code, .. } => *code,
            _ => None,
        }
    }
}

fn describe_pid(pid: &Option<u32>) -> String {
    pid.map(|p| p.to_string()).unwrap_or_else(|| "?".to_string())
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exited with code {}", code),
        None => "was terminated by a signal".to_string(),
    }
}

/// Run `invocation` to completion, streaming its output into `log`.
pub async fn run(invocation: &Invocation, log: &mut ExecutionLog) -> Result<(), ProcessError> {
    let command = invocation.to_string();
    log.push(format!("> Running: `{}`\n", command));
    debug!(command = %command, cwd = %invocation.cwd.display(), "spawning");

    let mut child = Command::new(&invocation.program)
        .args(&invocation.args)
        .current_dir(&invocation.cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| ProcessError::Spawn {
            command: command.clone(),
            source,
        })?;

    let pid = child.id();
    let (tx, mut rx) = mpsc::channel::<String>(OUTPUT_CHANNEL_CAPACITY);

    if let Some(stdout) = child.stdout.take() {
        tokio::spawn(forward_output(stdout, tx.clone()));
    }
    if let Some(stderr) = child.stderr.take() {
        tokio::spawn(forward_output(stderr, tx.clone()));
    }
    drop(tx);

    // Closes once both pipes hit EOF.
    while let Some(chunk) = rx.recv().await {
        debug!(pid, bytes = chunk.len(), "output");
        log.push(chunk);
    }

    let status = child.wait().await.map_err(|source| ProcessError::Wait {
        command: command.clone(),
        source,
    })?;

    if status.success() {
        debug!(command = %command, "exited successfully");
        Ok(())
    } else {
        debug!(command = %command, code = ?status.code(), "exited with failure");
        Err(ProcessError::Exit {
            command,
            pid,
            code: status.code(),
        })
    }
}

/// Pump one pipe into the channel until EOF or until the receiver goes away.
async fn forward_output<R>(reader: R, tx: mpsc::Sender<String>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = reader;
    let mut buf = vec![0u8; READ_BUFFER_SIZE];
    let mut pending = Vec::new();
    loop {
        match reader.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                let text = decode_chunk(&mut pending, &buf[..n]);
                if !text.is_empty() && tx.send(text).await.is_err() {
                    return;
                }
            }
        }
    }
    if !pending.is_empty() {
        let _ = tx.send(String::from_utf8_lossy(&pending).into_owned()).await;
    }
}

/// Decode as much UTF-8 as possible, carrying an incomplete trailing sequence
/// over to the next read.
fn decode_chunk(pending: &mut Vec<u8>, bytes: &[u8]) -> String {
    pending.extend_from_slice(bytes);
    match std::str::from_utf8(pending) {
        Ok(text) => {
            let text = text.to_string();
            pending.clear();
            text
        }
        Err(err) if err.error_len().is_none() => {
            let valid = err.valid_up_to();
            let text = String::from_utf8_lossy(&pending[..valid]).into_owned();
            pending.drain(..valid);
            text
        }
        Err(_) => {
            let text = String::from_utf8_lossy(pending).into_owned();
            pending.clear();
            text
        }
    }
}
