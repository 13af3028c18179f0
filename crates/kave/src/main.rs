//! `kave` keeps a local directory in step with a remote site.
//!
//! ```text
//! kave ./site https://example.com/ bank melt
//! ```

mod cli;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use kave_fetch::ReqwestFetcher;
use kave_sync::{Mirror, SyncReport};

use crate::cli::App;

fn main() -> ExitCode {
    let app = App::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(app.log_filter())),
        )
        .with_target(false)
        .init();

    match run(&app) {
        Ok(report) => {
            println!("{report}");
            if app.strict && report.failure_count() > 0 {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(2)
        }
    }
}

fn run(app: &App) -> Result<SyncReport> {
    let target = app.target()?;
    let config = app.sync_config(&target)?;

    let fetcher = ReqwestFetcher::with_timeout(config.timeout())?;
    let mirror = Mirror::new(Arc::new(fetcher), target.origin, target.destination, config);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    Ok(runtime.block_on(mirror.run())?)
}
