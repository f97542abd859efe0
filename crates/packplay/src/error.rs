//! Pipeline errors and the failure value handed back to callers.

use crate::archive::ArchiveError;
use crate::log::ExecutionLog;
use crate::pipeline::Phase;
use crate::process::ProcessError;
use crate::sample::SampleError;
use std::fmt;
use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum PackError {
    #[error(transparent)]
    Sample(#[from] SampleError),

    #[error("cannot resolve paths against the current directory: {0}")]
    CurrentDir(#[source] io::Error),

    #[error("cannot create installation directory: {0}")]
    Workspace(#[source] io::Error),

    #[error("cannot pack module under test: {0}")]
    Archive(#[from] ArchiveError),

    #[error("cannot write {}: {source}", path.display())]
    Materialize {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{phase} failed: {source}")]
    Process {
        phase: Phase,
        #[source]
        source: ProcessError,
    },
}

impl PackError {
    /// Pipeline phase the error happened in, if the pipeline got that far.
    pub fn phase(&self) -> Option<Phase> {
        match self {
            Self::Sample(_) | Self::CurrentDir(_) | Self::Workspace(_) => None,
            Self::Archive(_) => Some(Phase::Archiving),
            Self::Materialize { .. } => Some(Phase::Materialize),
            Self::Process { phase, .. } => Some(*phase),
        }
    }

    /// Exit code of the failed external tool, if one ran and exited.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::Process { source, .. } => source.exit_code(),
            _ => None,
        }
    }
}

/// A failed run together with everything its tools printed.
///
/// `output()` is the complete execution log, so callers can match tool
/// diagnostics such as `Cannot find module 'long'` or `TS7016`.
#[derive(Debug)]
pub struct Failure {
    error: PackError,
    output: String,
}

impl Failure {
    pub fn new(error: PackError, log: &ExecutionLog) -> Self {
        Self {
            error,
            output: log.text(),
        }
    }

    pub fn error(&self) -> &PackError {
        &self.error
    }

    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn phase(&self) -> Option<Phase> {
        self.error.phase()
    }

    pub fn into_parts(self) -> (PackError, String) {
        (self.error, self.output)
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.error, f)
    }
}

impl std::error::Error for Failure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        std::error::Error::source(&self.error)
    }
}

impl From<SampleError> for Failure {
    fn from(err: SampleError) -> Self {
        Self::new(PackError::Sample(err), &ExecutionLog::new())
    }
}
