//! Batches of samples run against one package.
//!
//! Suite files are TOML (`[[sample]]` tables) or JSON (an array of samples or
//! `{ "samples": [...] }`). Every sample gets its own pipeline run and its own
//! workspace; runs may overlap up to the configured job count.

use crate::archive::Packer;
use crate::error::Failure;
use crate::host::Host;
use crate::pipeline::{PackNTest, TestOptions};
use crate::sample::{CodeSample, SampleError, SampleSpec};
use futures::stream::{self, StreamExt};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::warn;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Suite {
    #[serde(default, rename = "sample", alias = "samples")]
    pub samples: Vec<SampleSpec>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum JsonSuite {
    List(Vec<SampleSpec>),
    Suite(Suite),
}

#[derive(Debug, thiserror::Error)]
pub enum SuiteError {
    #[error("cannot read suite {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML suite: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid JSON suite: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported suite format {} (expected .toml or .json)", .0.display())]
    UnknownFormat(PathBuf),
}

impl Suite {
    pub fn from_toml_str(text: &str) -> Result<Self, SuiteError> {
        Ok(toml::from_str(text)?)
    }

    pub fn from_json_str(text: &str) -> Result<Self, SuiteError> {
        Ok(match serde_json::from_str(text)? {
            JsonSuite::List(samples) => Suite { samples },
            JsonSuite::Suite(suite) => suite,
        })
    }

    /// Load a suite, picking the format from the file extension.
    pub fn load(path: &Path) -> Result<Self, SuiteError> {
        let format = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        let read = || {
            std::fs::read_to_string(path).map_err(|source| SuiteError::Io {
                path: path.to_path_buf(),
                source,
            })
        };

        let mut suite = match format.as_deref() {
            Some("toml") => Self::from_toml_str(&read()?)?,
            Some("json") => Self::from_json_str(&read()?)?,
            _ => return Err(SuiteError::UnknownFormat(path.to_path_buf())),
        };

        // Per-sample compiler configs are relative to the suite file.
        if let Some(dir) = path.parent() {
            for sample in &mut suite.samples {
                if let Some(tsconfig) = sample.tsconfig.take() {
                    sample.tsconfig = Some(if tsconfig.is_relative() {
                        dir.join(tsconfig)
                    } else {
                        tsconfig
                    });
                }
            }
        }
        Ok(suite)
    }
}

/// Caller-side settings for a suite run.
#[derive(Debug, Clone)]
pub struct SuiteOptions {
    pub package_dir: Option<PathBuf>,
    pub tsconfig: Option<PathBuf>,
    /// Runs in flight at once; 0 is treated as 1.
    pub jobs: usize,
    /// Wall-clock limit per sample. A timed-out run is dropped, which kills
    /// its current tool and discards its workspace.
    pub timeout: Option<Duration>,
}

impl Default for SuiteOptions {
    fn default() -> Self {
        Self {
            package_dir: None,
            tsconfig: None,
            jobs: 1,
            timeout: None,
        }
    }
}

#[derive(Debug)]
pub enum Outcome {
    Passed,
    Failed(Failure),
    Invalid(SampleError),
    Skipped,
    TimedOut(Duration),
}

impl Outcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_) | Self::Invalid(_) | Self::TimedOut(_))
    }
}

#[derive(Debug)]
pub struct SampleReport {
    pub description: String,
    pub outcome: Outcome,
    pub elapsed: Duration,
}

/// Per-sample outcomes, in suite order.
#[derive(Debug, Default)]
pub struct SuiteReport {
    pub samples: Vec<SampleReport>,
}

impl SuiteReport {
    pub fn passed(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Passed))
    }

    pub fn failed(&self) -> usize {
        self.count(Outcome::is_failure)
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Skipped))
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    fn count(&self, pred: impl Fn(&Outcome) -> bool) -> usize {
        self.samples.iter().filter(|s| pred(&s.outcome)).count()
    }
}

/// Run every sample of `suite` through `runner`.
pub async fn run_suite<H: Host, P: Packer>(
    runner: &PackNTest<H, P>,
    suite: &Suite,
    options: &SuiteOptions,
) -> SuiteReport {
    let jobs = options.jobs.max(1);

    let mut reports: Vec<(usize, SampleReport)> = stream::iter(suite.samples.iter().enumerate())
        .map(|(index, spec)| async move { (index, run_sample(runner, spec, options).await) })
        .buffer_unordered(jobs)
        .collect()
        .await;

    reports.sort_by_key(|(index, _)| *index);
    SuiteReport {
        samples: reports.into_iter().map(|(_, report)| report).collect(),
    }
}

async fn run_sample<H: Host, P: Packer>(
    runner: &PackNTest<H, P>,
    spec: &SampleSpec,
    options: &SuiteOptions,
) -> SampleReport {
    let description = spec.description.clone();
    let started = Instant::now();

    if spec.skip {
        return SampleReport {
            description,
            outcome: Outcome::Skipped,
            elapsed: Duration::ZERO,
        };
    }

    let sample = match CodeSample::try_from(spec.clone()) {
        Ok(sample) => sample,
        Err(err) => {
            return SampleReport {
                description,
                outcome: Outcome::Invalid(err),
                elapsed: started.elapsed(),
            };
        }
    };

    let test = TestOptions {
        sample,
        package_dir: options.package_dir.clone(),
        tsconfig: options.tsconfig.clone(),
    };

    let result = match options.timeout {
        Some(limit) => match tokio::time::timeout(limit, runner.run(&test)).await {
            Ok(result) => Some(result),
            Err(_) => None,
        },
        None => Some(runner.run(&test).await),
    };

    let outcome = match result {
        Some(Ok(())) => Outcome::Passed,
        Some(Err(failure)) => Outcome::Failed(failure),
        None => {
            let limit = options.timeout.unwrap_or_default();
            warn!(sample = %description, ?limit, "sample timed out");
            Outcome::TimedOut(limit)
        }
    };

    SampleReport {
        description,
        outcome,
        elapsed: started.elapsed(),
    }
}
