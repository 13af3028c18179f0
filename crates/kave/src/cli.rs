use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::Parser;
use kave_sync::{CONFIG_FILE, SyncConfig};
use url::Url;

#[derive(Clone, Debug, Parser)]
#[command(name = "kave", version = env!("CARGO_PKG_VERSION"), about, long_about = None)]
pub struct App {
    /// Destination directory and origin URL, in either order. The bare words
    /// `bank` and `melt` work like the flags of the same name.
    #[arg(value_name = "ARGS", required = true, num_args = 2..=4)]
    pub args: Vec<String>,

    /// Back up files before overwriting them with different content.
    #[arg(long)]
    pub bank: bool,

    /// Delete local files the manifest no longer lists.
    #[arg(long)]
    pub melt: bool,

    #[arg(short = 'j', long, value_name = "N")]
    pub workers: Option<usize>,

    /// Per-request timeout.
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Configuration file. Defaults to `kave.toml` in the destination.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Do not fetch resources discovered in the root document.
    #[arg(long)]
    pub no_follow: bool,

    /// Exit with status 1 when any file failed.
    #[arg(long)]
    pub strict: bool,

    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    #[arg(short, long)]
    pub quiet: bool,
}

/// What the positional arguments resolved to.
#[derive(Debug, PartialEq, Eq)]
pub struct Target {
    pub origin:      Url,
    pub destination: PathBuf,
    pub bank:        bool,
    pub melt:        bool,
}

impl App {
    pub fn log_filter(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else if self.quiet {
            "warn"
        } else {
            "info"
        }
    }

    pub fn target(&self) -> Result<Target> {
        let mut origin = None;
        let mut destination = None;
        let mut bank = self.bank;
        let mut melt = self.melt;

        for arg in &self.args {
            match arg.as_str() {
                "bank" => bank = true,
                "melt" => melt = true,
                _ if arg.starts_with("http://") || arg.starts_with("https://") => {
                    if origin.is_some() {
                        bail!("more than one origin URL given");
                    }
                    origin = Some(Url::parse(arg)?);
                }
                _ => {
                    if destination.is_some() {
                        bail!("more than one destination given");
                    }
                    destination = Some(PathBuf::from(arg));
                }
            }
        }

        let Some(origin) = origin else {
            bail!("no http(s) origin URL given");
        };
        let Some(destination) = destination else {
            bail!("no destination directory given");
        };
        Ok(Target {
            origin,
            destination,
            bank,
            melt,
        })
    }

    /// Configuration file merged with command-line overrides.
    pub fn sync_config(&self, target: &Target) -> Result<SyncConfig> {
        let path = self
            .config
            .clone()
            .unwrap_or_else(|| target.destination.join(CONFIG_FILE));
        let mut config = SyncConfig::load(&path)?;

        config.bank |= target.bank;
        config.melt |= target.melt;
        if self.workers.is_some() {
            config.workers = self.workers;
        }
        if self.timeout.is_some() {
            config.timeout_secs = self.timeout;
        }
        if self.no_follow {
            config.follow_references = false;
        }
        Ok(config)
    }
}
