//! Pack-n-play: install-test an npm package the way its consumers get it.
//!
//! The package is packed exactly as it would be published, installed into a
//! throwaway consumer project together with the sample's dependencies, and
//! the sample is compiled (TypeScript) and run with `node`. A failure carries
//! everything the tools printed.

pub mod archive;
pub mod error;
pub mod host;
pub mod log;
pub mod pipeline;
pub mod process;
pub mod sample;
pub mod suite;
pub mod toolchain;
pub mod tsconfig;
pub mod workspace;

pub use archive::{ArchiveError, ManifestLister, NpmPackList, Packer, TarballPacker, pack};
pub use error::{Failure, PackError};
pub use host::{Host, SystemHost};
pub use log::ExecutionLog;
pub use pipeline::{PackNTest, Phase, TestOptions, pack_n_test};
pub use process::{Invocation, ProcessError};
pub use sample::{CodeSample, ResolvedSample, SampleError, SampleSource, SampleSpec};
pub use suite::{Outcome, SampleReport, Suite, SuiteError, SuiteOptions, SuiteReport, run_suite};
pub use toolchain::{SaveMode, Toolchain};
pub use workspace::Workspace;
