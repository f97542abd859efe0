//! Disposable consumer project directory, one per pipeline run.

use crate::host::Host;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// An installation directory created fresh for a single run.
///
/// Never shared between runs. Callers hand it back through
/// [`Workspace::release`]; a workspace dropped without being released (for
/// example when a timeout cancels the run) is discarded through
/// [`Host::discard_dir`] instead.
pub struct Workspace<'h, H: Host + ?Sized> {
    path: PathBuf,
    host: &'h H,
    released: bool,
}

impl<'h, H: Host + ?Sized> Workspace<'h, H> {
    /// Allocate and create a new workspace. On error nothing was created.
    pub async fn acquire(host: &'h H) -> io::Result<Self> {
        let path = host.temp_dir().await?;
        host.create_dir(&path).await?;
        debug!(path = %path.display(), "workspace created");
        Ok(Self {
            path,
            host,
            released: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn join(&self, name: impl AsRef<Path>) -> PathBuf {
        self.path.join(name)
    }

    /// Remove the workspace. Best effort: a failure is logged and swallowed
    /// so it never replaces the outcome of the run.
    pub async fn release(mut self) {
        self.released = true;
        match self.host.remove_dir(&self.path).await {
            Ok(()) => debug!(path = %self.path.display(), "workspace removed"),
            Err(err) => warn!(
                path = %self.path.display(),
                error = %err,
                "failed to remove workspace"
            ),
        }
    }
}

impl<H: Host + ?Sized> Drop for Workspace<'_, H> {
    fn drop(&mut self) {
        if !self.released {
            warn!(path = %self.path.display(), "workspace dropped before release, discarding");
            self.host.discard_dir(&self.path);
        }
    }
}

impl<H: Host + ?Sized> fmt::Debug for Workspace<'_, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Workspace")
            .field("path", &self.path)
            .field("released", &self.released)
            .finish()
    }
}
