//! In-memory stand-ins for the pipeline's I/O primitives.

#![allow(dead_code)]

use async_trait::async_trait;
use packplay::archive::{ARCHIVE_FILE_NAME, ArchiveError, Packer};
use packplay::{ExecutionLog, Host, Invocation, ProcessError};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

pub const WORKSPACE: &str = "/tmp/packplay-fake";
pub const PACKAGE: &str = "/src/pass";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    TempDir,
    CreateDir(PathBuf),
    RemoveDir(PathBuf),
    /// Synchronous removal by a workspace dropped before release.
    DiscardDir(PathBuf),
    WriteFile(PathBuf, String),
    Spawn(String),
}

/// Records every primitive call; individual primitives can be made to fail.
#[derive(Default)]
pub struct FakeHost {
    calls: Mutex<Vec<Call>>,
    fail_temp_dir: bool,
    fail_create_dir: bool,
    fail_remove_dir: bool,
    fail_write: bool,
    /// Commands containing the needle exit with the given code.
    fail_spawn: Option<(String, i32)>,
    /// Output appended to the log by commands containing the needle.
    output: Vec<(String, String)>,
    /// Commands containing the needle sleep before returning.
    delay: Option<(String, Duration)>,
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_temp_dir(mut self) -> Self {
        self.fail_temp_dir = true;
        self
    }

    pub fn failing_create_dir(mut self) -> Self {
        self.fail_create_dir = true;
        self
    }

    pub fn failing_remove_dir(mut self) -> Self {
        self.fail_remove_dir = true;
        self
    }

    pub fn failing_write(mut self) -> Self {
        self.fail_write = true;
        self
    }

    pub fn failing_spawn(mut self, needle: &str, code: i32) -> Self {
        self.fail_spawn = Some((needle.to_string(), code));
        self
    }

    pub fn with_output(mut self, needle: &str, text: &str) -> Self {
        self.output.push((needle.to_string(), text.to_string()));
        self
    }

    pub fn slow_spawn(mut self, needle: &str, delay: Duration) -> Self {
        self.delay = Some((needle.to_string(), delay));
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn commands(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Spawn(command) => Some(command),
                _ => None,
            })
            .collect()
    }

    pub fn written(&self) -> Vec<(PathBuf, String)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::WriteFile(path, contents) => Some((path, contents)),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

fn injected(what: &str) -> io::Error {
    io::Error::other(format!("injected {what} failure"))
}

#[async_trait]
impl Host for FakeHost {
    async fn temp_dir(&self) -> io::Result<PathBuf> {
        self.record(Call::TempDir);
        if self.fail_temp_dir {
            return Err(injected("temp_dir"));
        }
        Ok(PathBuf::from(WORKSPACE))
    }

    async fn create_dir(&self, path: &Path) -> io::Result<()> {
        self.record(Call::CreateDir(path.to_path_buf()));
        if self.fail_create_dir {
            return Err(injected("create_dir"));
        }
        Ok(())
    }

    async fn remove_dir(&self, path: &Path) -> io::Result<()> {
        self.record(Call::RemoveDir(path.to_path_buf()));
        if self.fail_remove_dir {
            return Err(injected("remove_dir"));
        }
        Ok(())
    }

    fn discard_dir(&self, path: &Path) {
        self.record(Call::DiscardDir(path.to_path_buf()));
    }

    async fn write_file(&self, path: &Path, contents: &str) -> io::Result<()> {
        self.record(Call::WriteFile(path.to_path_buf(), contents.to_string()));
        if self.fail_write {
            return Err(injected("write_file"));
        }
        Ok(())
    }

    async fn spawn(
        &self,
        invocation: &Invocation,
        log: &mut ExecutionLog,
    ) -> Result<(), ProcessError> {
        let command = invocation.to_string();
        self.record(Call::Spawn(command.clone()));
        log.push(format!("> Running: `{command}`\n"));

        for (needle, text) in &self.output {
            if command.contains(needle.as_str()) {
                log.push(text.clone());
            }
        }

        if let Some((needle, delay)) = &self.delay {
            if command.contains(needle.as_str()) {
                tokio::time::sleep(*delay).await;
            }
        }

        match &self.fail_spawn {
            Some((needle, code)) if command.contains(needle.as_str()) => Err(ProcessError::Exit {
                command,
                pid: Some(4242),
                code: Some(*code),
            }),
            _ => Ok(()),
        }
    }
}

/// Packer that writes nothing and reports the conventional archive path.
#[derive(Default)]
pub struct FakePacker {
    packed: Mutex<Vec<(PathBuf, PathBuf)>>,
    fail: bool,
}

impl FakePacker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn packed(&self) -> Vec<(PathBuf, PathBuf)> {
        self.packed.lock().unwrap().clone()
    }
}

#[async_trait]
impl Packer for FakePacker {
    async fn pack(
        &self,
        package_dir: &Path,
        target_dir: &Path,
        _log: &mut ExecutionLog,
    ) -> Result<PathBuf, ArchiveError> {
        self.packed
            .lock()
            .unwrap()
            .push((package_dir.to_path_buf(), target_dir.to_path_buf()));
        if self.fail {
            return Err(ArchiveError::Empty(package_dir.to_path_buf()));
        }
        Ok(target_dir.join(ARCHIVE_FILE_NAME))
    }
}

pub fn archive_path() -> String {
    Path::new(WORKSPACE)
        .join(ARCHIVE_FILE_NAME)
        .to_string_lossy()
        .into_owned()
}

pub fn tsc_path() -> String {
    Path::new(WORKSPACE)
        .join("node_modules/.bin/tsc")
        .to_string_lossy()
        .into_owned()
}
