//! Configuration file parsing for packplay.toml.

use anyhow::Context;
use packplay::Toolchain;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Config file names, searched in this order in every directory.
const CONFIG_NAMES: &[&str] = &["packplay.toml", "packplay.config.toml", ".packplayrc.toml"];

/// Main configuration structure.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Programs driven by the pipeline
    #[serde(default)]
    pub toolchain: Toolchain,

    /// Suite run defaults
    #[serde(default)]
    pub test: TestConfig,
}

/// Suite run defaults, overridden by command-line flags.
#[derive(Debug, Deserialize)]
pub struct TestConfig {
    /// Samples run concurrently
    #[serde(default = "default_jobs")]
    pub jobs: usize,

    /// Per-sample wall-clock limit; 0 disables it
    #[serde(default)]
    pub timeout_ms: u64,

    /// Compiler configuration to extend for typed samples. Relative paths are
    /// resolved against the config file's directory.
    pub tsconfig: Option<PathBuf>,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jobs: default_jobs(),
            timeout_ms: 0,
            tsconfig: None,
        }
    }
}

impl TestConfig {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms))
    }
}

fn default_jobs() -> usize {
    1
}

/// Load configuration from a file or search for default config files.
///
/// An explicit path must exist; a missing searched-for file yields defaults.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let config_path = match path {
        Some(path) if !path.exists() => {
            anyhow::bail!("Config file {} does not exist", path.display())
        }
        Some(path) => Some(path.to_path_buf()),
        None => std::env::current_dir()
            .ok()
            .and_then(|cwd| find_config_file(&cwd)),
    };

    match config_path {
        Some(path) => parse_config_file(&path),
        None => Ok(Config::default()),
    }
}

fn parse_config_file(path: &Path) -> anyhow::Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let mut config: Config = toml::from_str(&content)
        .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path.display(), e))?;

    if let (Some(tsconfig), Some(dir)) = (&config.test.tsconfig, path.parent()) {
        if tsconfig.is_relative() {
            config.test.tsconfig = Some(dir.join(tsconfig));
        }
    }
    Ok(config)
}

/// Search for a configuration file in `start` and its parent directories.
fn find_config_file(start: &Path) -> Option<PathBuf> {
    let mut dir = Some(start);
    while let Some(current) = dir {
        for name in CONFIG_NAMES {
            let path = current.join(name);
            if path.exists() {
                return Some(path);
            }
        }
        dir = current.parent();
    }

    None
}
