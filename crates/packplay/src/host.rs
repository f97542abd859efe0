//! I/O primitives the pipeline depends on.
//!
//! Everything that touches the filesystem or spawns a process goes through
//! [`Host`], so the pipeline can be driven against in-memory stubs in tests.

use crate::log::ExecutionLog;
use crate::process::{self, Invocation, ProcessError};
use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Process and filesystem capabilities used by one pipeline run.
#[async_trait]
pub trait Host: Send + Sync {
    /// Allocate a unique path for a new workspace. The directory itself is
    /// created by [`Host::create_dir`].
    async fn temp_dir(&self) -> io::Result<PathBuf>;

    /// Create a directory that must not already exist.
    async fn create_dir(&self, path: &Path) -> io::Result<()>;

    /// Recursively remove a directory tree.
    async fn remove_dir(&self, path: &Path) -> io::Result<()>;

    /// Remove a directory tree from a synchronous context, such as a drop
    /// guard. Best effort; failures are logged, not returned.
    fn discard_dir(&self, path: &Path);

    async fn write_file(&self, path: &Path, contents: &str) -> io::Result<()>;

    /// Run an external command, appending its output to `log`.
    async fn spawn(&self, invocation: &Invocation, log: &mut ExecutionLog)
    -> Result<(), ProcessError>;
}

/// [`Host`] backed by the operating system.
#[derive(Debug, Clone)]
pub struct SystemHost {
    temp_root: Option<PathBuf>,
}

impl SystemHost {
    pub fn new() -> Self {
        Self { temp_root: None }
    }

    /// Allocate workspaces under `root` instead of the system temp directory.
    pub fn with_temp_root(root: impl Into<PathBuf>) -> Self {
        Self {
            temp_root: Some(root.into()),
        }
    }

    fn temp_root(&self) -> PathBuf {
        self.temp_root.clone().unwrap_or_else(std::env::temp_dir)
    }
}

impl Default for SystemHost {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Host for SystemHost {
    async fn temp_dir(&self) -> io::Result<PathBuf> {
        let root = self.temp_root();
        if !tokio::fs::metadata(&root).await?.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotADirectory,
                format!("temp root {} is not a directory", root.display()),
            ));
        }
        Ok(root.join(format!("packplay-{}", uuid::Uuid::new_v4().simple())))
    }

    async fn create_dir(&self, path: &Path) -> io::Result<()> {
        tokio::fs::create_dir(path).await
    }

    async fn remove_dir(&self, path: &Path) -> io::Result<()> {
        tokio::fs::remove_dir_all(path).await
    }

    fn discard_dir(&self, path: &Path) {
        if let Err(err) = std::fs::remove_dir_all(path) {
            if err.kind() != io::ErrorKind::NotFound {
                warn!(path = %path.display(), error = %err, "failed to discard workspace");
            }
        }
    }

    async fn write_file(&self, path: &Path, contents: &str) -> io::Result<()> {
        tokio::fs::write(path, contents).await
    }

    async fn spawn(
        &self,
        invocation: &Invocation,
        log: &mut ExecutionLog,
    ) -> Result<(), ProcessError> {
        process::run(invocation, log).await
    }
}
