//! Pack, install and run a sample against the package under test.
//!
//! One run walks these phases in order, stopping at the first failure:
//!
//! ```text
//! archiving -> manifest init -> dependency install -> source materialization
//!           -> compilation (TypeScript only) -> execution
//! ```
//!
//! The workspace is released after every run, whatever the outcome; a run
//! cancelled mid-flight discards it when its future is dropped. A failed
//! run returns a [`Failure`] holding the complete execution log.

use crate::archive::{NpmPackList, Packer, TarballPacker};
use crate::error::{Failure, PackError};
use crate::host::{Host, SystemHost};
use crate::log::ExecutionLog;
use crate::process::Invocation;
use crate::sample::{CodeSample, SampleSpec};
use crate::toolchain::{SaveMode, Toolchain};
use crate::tsconfig::{TSCONFIG_FILE_NAME, render_compiler_config};
use crate::workspace::Workspace;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Pipeline phase, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Archiving,
    ManifestInit,
    Install,
    Materialize,
    Compile,
    Execute,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Archiving => "archiving",
            Self::ManifestInit => "manifest init",
            Self::Install => "dependency install",
            Self::Materialize => "source materialization",
            Self::Compile => "compilation",
            Self::Execute => "execution",
        })
    }
}

/// Inputs of a single run.
#[derive(Debug, Clone)]
pub struct TestOptions {
    pub sample: CodeSample,
    /// Package under test; the current directory when unset.
    pub package_dir: Option<PathBuf>,
    /// Compiler configuration to extend instead of the built-in defaults,
    /// unless the sample names its own.
    pub tsconfig: Option<PathBuf>,
}

impl TestOptions {
    pub fn new(sample: CodeSample) -> Self {
        Self {
            sample,
            package_dir: None,
            tsconfig: None,
        }
    }

    pub fn package_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.package_dir = Some(dir.into());
        self
    }

    pub fn tsconfig(mut self, path: impl Into<PathBuf>) -> Self {
        self.tsconfig = Some(path.into());
        self
    }
}

/// The installation pipeline.
pub struct PackNTest<H = SystemHost, P = TarballPacker> {
    host: H,
    packer: P,
    toolchain: Toolchain,
}

impl PackNTest {
    /// Pipeline backed by the real filesystem, `npm`, `tsc` and `node`.
    pub fn new() -> Self {
        Self::with_toolchain(Toolchain::default())
    }

    pub fn with_toolchain(toolchain: Toolchain) -> Self {
        let packer = TarballPacker::new(NpmPackList::new(toolchain.npm.clone()));
        Self::with_parts(SystemHost::new(), packer, toolchain)
    }
}

impl Default for PackNTest {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: Host, P: Packer> PackNTest<H, P> {
    /// Pipeline over substitute primitives.
    pub fn with_parts(host: H, packer: P, toolchain: Toolchain) -> Self {
        Self {
            host,
            packer,
            toolchain,
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn packer(&self) -> &P {
        &self.packer
    }

    pub fn toolchain(&self) -> &Toolchain {
        &self.toolchain
    }

    /// Validate a loosely typed sample, then run it. An invalid sample fails
    /// before any directory is created or process spawned.
    pub async fn run_spec(
        &self,
        spec: SampleSpec,
        package_dir: Option<PathBuf>,
        tsconfig: Option<PathBuf>,
    ) -> Result<(), Failure> {
        let sample = CodeSample::try_from(spec)?;
        self.run(&TestOptions {
            sample,
            package_dir,
            tsconfig,
        })
        .await
    }

    /// Run one sample in a fresh workspace.
    pub async fn run(&self, options: &TestOptions) -> Result<(), Failure> {
        let mut log = ExecutionLog::new();

        let package_dir = match &options.package_dir {
            Some(dir) => absolute(dir),
            None => std::env::current_dir(),
        }
        .map_err(|e| Failure::new(PackError::CurrentDir(e), &log))?;

        let tsconfig = options
            .sample
            .tsconfig
            .as_deref()
            .or(options.tsconfig.as_deref())
            .map(absolute)
            .transpose()
            .map_err(|e| Failure::new(PackError::CurrentDir(e), &log))?;

        let workspace = Workspace::acquire(&self.host)
            .await
            .map_err(|e| Failure::new(PackError::Workspace(e), &log))?;

        log.push(format!(
            "Using installation directory: {}\n",
            workspace.path().display()
        ));
        info!(
            sample = %options.sample.description,
            package = %package_dir.display(),
            workspace = %workspace.path().display(),
            "starting pack-n-test run"
        );

        let outcome = self
            .install_and_run(&workspace, &package_dir, options, tsconfig.as_deref(), &mut log)
            .await;

        workspace.release().await;

        match outcome {
            Ok(()) => {
                info!(sample = %options.sample.description, "run passed");
                Ok(())
            }
            Err(err) => {
                let failure = Failure::new(err, &log);
                error!(
                    sample = %options.sample.description,
                    phase = ?failure.phase(),
                    error = %failure,
                    output_bytes = failure.output().len(),
                    "run failed"
                );
                Err(failure)
            }
        }
    }

    async fn install_and_run(
        &self,
        workspace: &Workspace<'_, H>,
        package_dir: &Path,
        options: &TestOptions,
        tsconfig: Option<&Path>,
        log: &mut ExecutionLog,
    ) -> Result<(), PackError> {
        let sample = &options.sample;
        let cwd = workspace.path();

        info!(phase = %Phase::Archiving, "entering phase");
        log.push(format!("> Packing: {}\n", package_dir.display()));
        let archive = self.packer.pack(package_dir, cwd, log).await?;

        self.step(Phase::ManifestInit, self.toolchain.init(cwd), log)
            .await?;

        let mut runtime = vec![archive.to_string_lossy().into_owned()];
        runtime.extend(sample.dependencies.iter().cloned());
        self.step(
            Phase::Install,
            self.toolchain.install(cwd, SaveMode::Runtime, &runtime),
            log,
        )
        .await?;

        let mut dev = sample.dev_dependencies.clone();
        if sample.source.needs_compilation() {
            dev.push(self.toolchain.typescript.clone());
        }
        if !dev.is_empty() {
            self.step(
                Phase::Install,
                self.toolchain.install(cwd, SaveMode::Dev, &dev),
                log,
            )
            .await?;
        }

        info!(phase = %Phase::Materialize, "entering phase");
        let resolved = sample.resolve();
        self.write(&workspace.join(resolved.filename), resolved.source)
            .await?;

        if sample.source.needs_compilation() {
            let config = render_compiler_config(resolved.filename, tsconfig);
            self.write(&workspace.join(TSCONFIG_FILE_NAME), &config)
                .await?;
            self.step(Phase::Compile, self.toolchain.compile(cwd), log)
                .await?;
        }

        self.step(
            Phase::Execute,
            self.toolchain.execute(cwd, resolved.executable),
            log,
        )
        .await
    }

    async fn step(
        &self,
        phase: Phase,
        invocation: Invocation,
        log: &mut ExecutionLog,
    ) -> Result<(), PackError> {
        info!(phase = %phase, command = %invocation, "entering phase");
        self.host
            .spawn(&invocation, log)
            .await
            .map_err(|source| PackError::Process { phase, source })
    }

    async fn write(&self, path: &Path, contents: &str) -> Result<(), PackError> {
        self.host
            .write_file(path, contents)
            .await
            .map_err(|source| PackError::Materialize {
                path: path.to_path_buf(),
                source,
            })
    }
}

/// Run one sample with the system pipeline.
pub async fn pack_n_test(options: TestOptions) -> Result<(), Failure> {
    PackNTest::new().run(&options).await
}

fn absolute(path: &Path) -> std::io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}
