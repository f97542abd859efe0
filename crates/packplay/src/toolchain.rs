//! External programs the pipeline drives and the exact arguments it passes.

use crate::process::Invocation;
use crate::tsconfig::TSCONFIG_FILE_NAME;
use serde::Deserialize;
use std::path::Path;

/// Programs and install behaviour. Every field has a default, so a partial
/// `[toolchain]` table is enough.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Toolchain {
    /// Package manager CLI.
    pub npm: String,

    /// Runtime used to execute the sample.
    pub node: String,

    /// Compiler entry point. A relative path with more than one component is
    /// resolved inside the workspace.
    pub tsc: String,

    /// Package appended to the dev dependencies of typed samples.
    pub typescript: String,

    /// Pass `--prefer-offline` to installs.
    pub prefer_offline: bool,
}

impl Default for Toolchain {
    fn default() -> Self {
        Self {
            npm: "npm".to_string(),
            node: "node".to_string(),
            tsc: "node_modules/.bin/tsc".to_string(),
            typescript: "typescript".to_string(),
            prefer_offline: true,
        }
    }
}

/// Which manifest section an install writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveMode {
    Runtime,
    Dev,
}

impl SaveMode {
    fn flag(self) -> &'static str {
        match self {
            Self::Runtime => "--save",
            Self::Dev => "--save-dev",
        }
    }
}

impl Toolchain {
    /// `npm init -y`
    pub fn init(&self, cwd: &Path) -> Invocation {
        Invocation::new(&self.npm, cwd).args(["init", "-y"])
    }

    /// `npm install [--prefer-offline] --save|--save-dev <targets...>`
    pub fn install(&self, cwd: &Path, mode: SaveMode, targets: &[String]) -> Invocation {
        let mut invocation = Invocation::new(&self.npm, cwd).arg("install");
        if self.prefer_offline {
            invocation = invocation.arg("--prefer-offline");
        }
        invocation.arg(mode.flag()).args(targets.iter().cloned())
    }

    /// `<tsc> --strict -p tsconfig.json`
    pub fn compile(&self, cwd: &Path) -> Invocation {
        let tsc = Path::new(&self.tsc);
        let program = if tsc.is_relative() && tsc.components().count() > 1 {
            cwd.join(tsc).to_string_lossy().into_owned()
        } else {
            self.tsc.clone()
        };
        Invocation::new(program, cwd).args(["--strict", "-p", TSCONFIG_FILE_NAME])
    }

    /// `node <entry>`
    pub fn execute(&self, cwd: &Path, entry: &str) -> Invocation {
        Invocation::new(&self.node, cwd).arg(entry)
    }
}
