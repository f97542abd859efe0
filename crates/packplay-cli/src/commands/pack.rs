//! Pack command - build the publish-equivalent archive of a package.

use anyhow::{Context, Result};
use clap::Args;
use console::style;
use packplay::{ExecutionLog, ManifestLister, NpmPackList, Packer, TarballPacker};
use std::path::PathBuf;

use crate::config::Config;

#[derive(Args)]
pub struct PackCommand {
    /// Package directory (defaults to current directory)
    #[arg(default_value = ".")]
    pub dir: PathBuf,

    /// Directory to write the archive into (defaults to current directory)
    #[arg(long, short = 'o')]
    pub out: Option<PathBuf>,

    /// Print the files that would be published instead of packing
    #[arg(long)]
    pub list: bool,
}

impl PackCommand {
    pub async fn run(&self, config: &Config) -> Result<()> {
        let lister = NpmPackList::new(config.toolchain.npm.clone());
        let mut log = ExecutionLog::new();

        if self.list {
            let files = lister
                .list(&self.dir, &mut log)
                .await
                .inspect_err(|_| eprint!("{}", log.text()))?;
            for file in files {
                println!("{}", file);
            }
            return Ok(());
        }

        let out = match &self.out {
            Some(out) => out.clone(),
            None => std::env::current_dir()?,
        };
        std::fs::create_dir_all(&out)
            .with_context(|| format!("Failed to create {}", out.display()))?;

        let archive = TarballPacker::new(lister)
            .pack(&self.dir, &out, &mut log)
            .await
            .inspect_err(|_| eprint!("{}", log.text()))?;

        println!("{} {}", style("Packed").green().bold(), archive.display());
        Ok(())
    }
}
