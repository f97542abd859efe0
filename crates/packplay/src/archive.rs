//! Publish-equivalent tarball of the package under test.
//!
//! The set of files comes from a [`ManifestLister`] that applies the package
//! manager's own publish rules (`files`, `.npmignore`, always-included
//! manifests). Every listed file is stored under `package/`, the layout a
//! registry download unpacks from.

use crate::log::ExecutionLog;
use crate::process::Invocation;
use async_trait::async_trait;
use flate2::Compression;
use flate2::write::GzEncoder;
use serde::Deserialize;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tar::{Builder, EntryType, Header};
use tokio::process::Command;
use tracing::debug;

/// File name of the archive inside the target directory.
pub const ARCHIVE_FILE_NAME: &str = "module-under-test.tgz";

/// Directory every entry is nested under.
pub const ARCHIVE_PREFIX: &str = "package";

/// Entry mtime, 1985-10-26T08:15:00Z, the same constant npm stamps.
const ARCHIVE_MTIME: u64 = 499_162_500;

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("failed to start manifest lister `{command}`: {source}")]
    ListerSpawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("manifest lister `{command}` failed with code {code:?}: {stderr}")]
    ListerFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("cannot parse file list for {}: {source}", dir.display())]
    Parse {
        dir: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("no publishable files reported for {}", .0.display())]
    Empty(PathBuf),

    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot write archive {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("archive task failed: {0}")]
    Task(String),
}

/// Decides which files of a package would be published.
#[async_trait]
pub trait ManifestLister: Send + Sync {
    /// Relative, `/`-separated paths in publish order. Anything the lister
    /// prints besides the list itself goes to `log`.
    async fn list(
        &self,
        package_dir: &Path,
        log: &mut ExecutionLog,
    ) -> Result<Vec<String>, ArchiveError>;
}

/// Lists files with `npm pack --dry-run --json --ignore-scripts`.
///
/// Lifecycle scripts are skipped, so the package is listed as it exists on
/// disk rather than rebuilt.
#[derive(Debug, Clone)]
pub struct NpmPackList {
    program: String,
}

impl NpmPackList {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for NpmPackList {
    fn default() -> Self {
        Self::new("npm")
    }
}

#[async_trait]
impl ManifestLister for NpmPackList {
    async fn list(
        &self,
        package_dir: &Path,
        log: &mut ExecutionLog,
    ) -> Result<Vec<String>, ArchiveError> {
        let invocation = Invocation::new(&self.program, package_dir)
            .args(["pack", "--dry-run", "--json", "--ignore-scripts"]);
        let command = invocation.to_string();
        log.push(format!("> Running: `{}`\n", command));
        debug!(command = %command, dir = %package_dir.display(), "listing publishable files");

        let output = Command::new(&invocation.program)
            .args(&invocation.args)
            .current_dir(package_dir)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| ArchiveError::ListerSpawn {
                command: command.clone(),
                source,
            })?;

        // stdout is the JSON report; stderr carries npm's notices and errors.
        let stderr = String::from_utf8_lossy(&output.stderr);
        log.push(stderr.as_ref());

        if !output.status.success() {
            return Err(ArchiveError::ListerFailed {
                command,
                code: output.status.code(),
                stderr: stderr.trim().to_string(),
            });
        }

        parse_pack_report(package_dir, &output.stdout)
    }
}

#[derive(Deserialize)]
struct PackReport {
    #[serde(default)]
    files: Vec<PackedFile>,
}

#[derive(Deserialize)]
struct PackedFile {
    path: String,
}

/// Extract file paths from `npm pack --json` output.
pub fn parse_pack_report(package_dir: &Path, stdout: &[u8]) -> Result<Vec<String>, ArchiveError> {
    let reports: Vec<PackReport> =
        serde_json::from_slice(stdout).map_err(|source| ArchiveError::Parse {
            dir: package_dir.to_path_buf(),
            source,
        })?;

    let files: Vec<String> = reports
        .into_iter()
        .next()
        .map(|report| report.files.into_iter().map(|f| f.path).collect())
        .unwrap_or_default();

    if files.is_empty() {
        return Err(ArchiveError::Empty(package_dir.to_path_buf()));
    }
    Ok(files)
}

/// Produces the archive for a package.
#[async_trait]
pub trait Packer: Send + Sync {
    /// Write the archive into `target_dir` and return its path.
    async fn pack(
        &self,
        package_dir: &Path,
        target_dir: &Path,
        log: &mut ExecutionLog,
    ) -> Result<PathBuf, ArchiveError>;
}

/// [`Packer`] writing a gzip tarball of the files a [`ManifestLister`] reports.
#[derive(Debug, Clone)]
pub struct TarballPacker<L = NpmPackList> {
    lister: L,
}

impl<L: ManifestLister> TarballPacker<L> {
    pub fn new(lister: L) -> Self {
        Self { lister }
    }

    pub fn lister(&self) -> &L {
        &self.lister
    }
}

impl Default for TarballPacker<NpmPackList> {
    fn default() -> Self {
        Self::new(NpmPackList::default())
    }
}

#[async_trait]
impl<L: ManifestLister> Packer for TarballPacker<L> {
    async fn pack(
        &self,
        package_dir: &Path,
        target_dir: &Path,
        log: &mut ExecutionLog,
    ) -> Result<PathBuf, ArchiveError> {
        let files = self.lister.list(package_dir, log).await?;
        if files.is_empty() {
            return Err(ArchiveError::Empty(package_dir.to_path_buf()));
        }

        let archive = target_dir.join(ARCHIVE_FILE_NAME);
        let source = package_dir.to_path_buf();
        let dest = archive.clone();
        let count = files.len();

        tokio::task::spawn_blocking(move || write_archive(&source, &files, &dest))
            .await
            .map_err(|e| ArchiveError::Task(e.to_string()))??;

        debug!(archive = %archive.display(), files = count, "archive written");
        Ok(archive)
    }
}

/// Pack `package_dir` into `target_dir` using `npm` to list its files.
pub async fn pack(
    package_dir: &Path,
    target_dir: &Path,
    log: &mut ExecutionLog,
) -> Result<PathBuf, ArchiveError> {
    TarballPacker::default()
        .pack(package_dir, target_dir, log)
        .await
}

/// Write `files` (relative to `package_dir`) into a gzip tarball at `archive`.
pub fn write_archive(package_dir: &Path, files: &[String], archive: &Path) -> Result<(), ArchiveError> {
    let write_err = |source: io::Error| ArchiveError::Write {
        path: archive.to_path_buf(),
        source,
    };

    let file = File::create(archive).map_err(write_err)?;
    let gz = GzEncoder::new(BufWriter::new(file), Compression::default());
    let mut tar = Builder::new(gz);

    for rel in files {
        let source = package_dir.join(rel);
        let data = fs::read(&source).map_err(|e| ArchiveError::Read {
            path: source.clone(),
            source: e,
        })?;
        let mode = entry_mode(&source).map_err(|e| ArchiveError::Read {
            path: source.clone(),
            source: e,
        })?;

        let mut header = Header::new_gnu();
        header.set_entry_type(EntryType::Regular);
        header.set_size(data.len() as u64);
        header.set_mode(mode);
        header.set_mtime(ARCHIVE_MTIME);
        header.set_uid(0);
        header.set_gid(0);

        let entry_path = format!("{}/{}", ARCHIVE_PREFIX, rel.trim_start_matches("./"));
        tar.append_data(&mut header, entry_path, data.as_slice())
            .map_err(write_err)?;
    }

    let gz = tar.into_inner().map_err(write_err)?;
    let mut writer = gz.finish().map_err(write_err)?;
    writer.flush().map_err(write_err)?;
    Ok(())
}

/// Normalized entry mode: executables keep their execute bits, everything
/// else is stored as 0644.
fn entry_mode(path: &Path) -> io::Result<u32> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = fs::metadata(path)?.permissions().mode();
        Ok(if mode & 0o111 != 0 { 0o755 } else { 0o644 })
    }
    #[cfg(not(unix))]
    {
        fs::metadata(path)?;
        Ok(0o644)
    }
}
