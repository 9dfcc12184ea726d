mod cli;
mod commands;
mod config;

use std::future::Future;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;
use digest_logging::{digest_debug, digest_error, digest_info, digest_warn, LevelFilter};
use tokio_util::sync::CancellationToken;

use crate::cli::Cli;
use crate::config::AppConfig;

/// How long a command may keep running after Ctrl-C before it is dropped.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

fn main() -> ExitCode {
    let cli = Cli::parse();
    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    if let Some(path) = digest_logging::initialize(cli.log.into(), level) {
        eprintln!("Logging to {}", path.display());
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            digest_error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    if load_dotenv().context("failed to load .env")? {
        digest_debug!("loaded variables from .env");
    }

    let mut config = AppConfig::load(cli.config.as_deref())?;
    config.apply_env(|key| std::env::var(key).ok())?;
    if let Some(dir) = cli.output_dir {
        config.output_dir = dir;
    }
    for (name, value) in config.masked_keys() {
        digest_debug!("{name}: {value}");
    }

    let command = cli.command;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    runtime.block_on(async move {
        let cancel = CancellationToken::new();
        let on_interrupt = cancel.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    digest_info!("interrupt received, stopping");
                    on_interrupt.cancel();
                }
                Err(err) => digest_warn!("cannot listen for Ctrl-C: {err}"),
            }
        });
        let work = commands::dispatch(command, &config, &cancel);
        run_until_interrupted(work, &cancel, SHUTDOWN_GRACE).await
    })
}

/// Drives `work` to completion. Once the token fires, `work` gets `grace`
/// to wind down on its own before it is abandoned.
async fn run_until_interrupted<F>(
    work: F,
    cancel: &CancellationToken,
    grace: Duration,
) -> anyhow::Result<()>
where
    F: Future<Output = anyhow::Result<()>>,
{
    tokio::pin!(work);
    tokio::select! {
        result = &mut work => return result,
        _ = cancel.cancelled() => {}
    }
    match tokio::time::timeout(grace, &mut work).await {
        Ok(result) => result,
        Err(_) => {
            digest_warn!(
                "command still busy {}s after interrupt, abandoning it",
                grace.as_secs()
            );
            bail!("interrupted")
        }
    }
}

/// Returns whether a `.env` file was found. A missing file is not an error.
fn load_dotenv() -> Result<bool, dotenvy::Error> {
    dotenvy::dotenv().map(|_| true).or_else(|err| match err {
        dotenvy::Error::Io(_) => Ok(false),
        _ => Err(err),
    })
}
