//! Consumer code samples and the files they materialize as.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const MODULE_FILE_NAME: &str = "index.js";
pub const COMMONJS_FILE_NAME: &str = "index.cjs";
pub const ES_MODULE_FILE_NAME: &str = "index.mjs";
pub const TYPESCRIPT_FILE_NAME: &str = "index.ts";
/// Compiler output for [`TYPESCRIPT_FILE_NAME`].
pub const COMPILED_FILE_NAME: &str = "index.js";

/// Source of a sample, tagged with the module dialect it is written in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SampleSource {
    /// Plain `.js`, module system decided by the consumer manifest.
    Module(String),
    /// Explicit CommonJS (`.cjs`).
    CommonJs(String),
    /// Explicit ECMAScript module (`.mjs`).
    EsModule(String),
    /// TypeScript, compiled with `tsc --strict` before running.
    TypeScript(String),
}

impl SampleSource {
    pub fn code(&self) -> &str {
        match self {
            Self::Module(code)
            | Self::CommonJs(code)
            | Self::EsModule(code)
            | Self::TypeScript(code) => code,
        }
    }

    pub fn filename(&self) -> &'static str {
        match self {
            Self::Module(_) => MODULE_FILE_NAME,
            Self::CommonJs(_) => COMMONJS_FILE_NAME,
            Self::EsModule(_) => ES_MODULE_FILE_NAME,
            Self::TypeScript(_) => TYPESCRIPT_FILE_NAME,
        }
    }

    /// File handed to the runtime: the compiled sibling for TypeScript, the
    /// source itself otherwise.
    pub fn executable_filename(&self) -> &'static str {
        match self {
            Self::TypeScript(_) => COMPILED_FILE_NAME,
            _ => self.filename(),
        }
    }

    pub fn needs_compilation(&self) -> bool {
        matches!(self, Self::TypeScript(_))
    }
}

/// One consumer test case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeSample {
    pub description: String,
    /// Installed with `--save` alongside the archive.
    pub dependencies: Vec<String>,
    /// Installed with `--save-dev`.
    pub dev_dependencies: Vec<String>,
    pub source: SampleSource,
    /// Compiler configuration for this sample; takes precedence over the
    /// one given for the run.
    pub tsconfig: Option<PathBuf>,
}

impl CodeSample {
    pub fn new(description: impl Into<String>, source: SampleSource) -> Self {
        Self {
            description: description.into(),
            dependencies: Vec::new(),
            dev_dependencies: Vec::new(),
            source,
            tsconfig: None,
        }
    }

    pub fn javascript(description: impl Into<String>, code: impl Into<String>) -> Self {
        Self::new(description, SampleSource::Module(code.into()))
    }

    pub fn commonjs(description: impl Into<String>, code: impl Into<String>) -> Self {
        Self::new(description, SampleSource::CommonJs(code.into()))
    }

    pub fn esm(description: impl Into<String>, code: impl Into<String>) -> Self {
        Self::new(description, SampleSource::EsModule(code.into()))
    }

    pub fn typescript(description: impl Into<String>, code: impl Into<String>) -> Self {
        Self::new(description, SampleSource::TypeScript(code.into()))
    }

    pub fn dependency(mut self, name: impl Into<String>) -> Self {
        self.dependencies.push(name.into());
        self
    }

    pub fn dev_dependency(mut self, name: impl Into<String>) -> Self {
        self.dev_dependencies.push(name.into());
        self
    }

    pub fn tsconfig(mut self, path: impl Into<PathBuf>) -> Self {
        self.tsconfig = Some(path.into());
        self
    }

    pub fn resolve(&self) -> ResolvedSample<'_> {
        ResolvedSample {
            source: self.source.code(),
            filename: self.source.filename(),
            executable: self.source.executable_filename(),
        }
    }

    pub fn executable_filename(&self) -> &'static str {
        self.source.executable_filename()
    }
}

/// What to write and what to run for a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedSample<'a> {
    pub source: &'a str,
    pub filename: &'static str,
    pub executable: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SampleError {
    #[error("code sample must contain one of js, cjs, mjs, esm, or ts")]
    MissingSource,

    #[error("code sample must contain exactly one of js, cjs, mjs, esm, or ts (found {})", .0.join(", "))]
    AmbiguousSource(Vec<&'static str>),
}

/// Loosely typed sample as written in suite files.
///
/// Exactly one of the source fields must be set; [`CodeSample::try_from`]
/// enforces that.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleSpec {
    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub dependencies: Vec<String>,

    #[serde(default, alias = "dev_dependencies")]
    pub dev_dependencies: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub js: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cjs: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub esm: Option<String>,

    /// Same dialect as `esm`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mjs: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ts: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tsconfig: Option<PathBuf>,

    /// Leave the sample out of a suite run.
    #[serde(default)]
    pub skip: bool,
}

impl SampleSpec {
    /// Populated source fields, ordered ts, esm, mjs, cjs, js. Blank sources
    /// count as absent.
    pub fn populated_sources(&self) -> Vec<&'static str> {
        [
            ("ts", &self.ts),
            ("esm", &self.esm),
            ("mjs", &self.mjs),
            ("cjs", &self.cjs),
            ("js", &self.js),
        ]
        .into_iter()
        .filter(|(_, code)| is_populated(code))
        .map(|(name, _)| name)
        .collect()
    }
}

fn is_populated(code: &Option<String>) -> bool {
    code.as_deref().is_some_and(|c| !c.trim().is_empty())
}

impl TryFrom<SampleSpec> for CodeSample {
    type Error = SampleError;

    fn try_from(spec: SampleSpec) -> Result<Self, Self::Error> {
        let populated = spec.populated_sources();
        let source = match populated.as_slice() {
            [] => return Err(SampleError::MissingSource),
            [name] => match *name {
                "ts" => SampleSource::TypeScript(spec.ts.unwrap_or_default()),
                "esm" => SampleSource::EsModule(spec.esm.unwrap_or_default()),
                "mjs" => SampleSource::EsModule(spec.mjs.unwrap_or_default()),
                "cjs" => SampleSource::CommonJs(spec.cjs.unwrap_or_default()),
                _ => SampleSource::Module(spec.js.unwrap_or_default()),
            },
            _ => return Err(SampleError::AmbiguousSource(populated.clone())),
        };

        Ok(CodeSample {
            description: spec.description,
            dependencies: spec.dependencies,
            dev_dependencies: spec.dev_dependencies,
            source,
            tsconfig: spec.tsconfig,
        })
    }
}
