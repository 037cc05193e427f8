//! Command line entry point of the workload driver.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use argh::FromArgs;
use bookstore_service::InMemoryStore;

use crate::config::Config;
use crate::metrics::AggregateMetrics;
use crate::report::{self, JsonLinesWriter, LevelReport};
use crate::{observability, orchestrator};

/// Concurrent load generator for a bookstore.
#[derive(Debug, FromArgs)]
struct Args {
    /// path to the YAML configuration file
    #[argh(option, short = 'c')]
    pub config: Option<PathBuf>,

    #[argh(subcommand)]
    pub command: Command,
}

#[derive(Debug, FromArgs)]
#[argh(subcommand)]
enum Command {
    Run(RunCommand),
    Version(VersionCommand),
}

/// run the workload for every configured concurrency level
#[derive(Debug, FromArgs)]
#[argh(subcommand, name = "run")]
struct RunCommand {
    /// run a single level with this many workers instead of the configured ramp
    #[argh(option)]
    concurrency: Option<usize>,
}

/// print the version of the workload driver
#[derive(Default, Debug, FromArgs)]
#[argh(subcommand, name = "version")]
struct VersionCommand {}

/// Bootstrap the runtime and execute the CLI command.
pub fn execute() -> Result<()> {
    let args: Args = argh::from_env();

    // Special switch to just print the version and exit.
    if let Command::Version(_) = args.command {
        println!("{}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let config = Config::load(args.config.as_deref())?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .thread_name("workload-rt")
        .enable_all()
        .worker_threads(config.runtime.worker_threads)
        .build()?;
    let _runtime_guard = runtime.enter();

    observability::init_tracing(&config.logging);
    tracing::debug!(?config);

    runtime.block_on(async move {
        match args.command {
            Command::Run(RunCommand { concurrency }) => sweep(&config, concurrency).await,
            Command::Version(VersionCommand {}) => unreachable!(),
        }
    })
}

/// Runs every level of the sweep, printing and recording each one as it completes.
async fn sweep(config: &Config, concurrency: Option<usize>) -> Result<()> {
    let levels = match concurrency {
        Some(concurrency) => vec![concurrency],
        None => config.concurrency.levels()?,
    };

    let mut output = config
        .output
        .as_deref()
        .map(JsonLinesWriter::open)
        .transpose()
        .context("failed to open report file")?;

    tracing::info!(?levels, "starting sweep");
    for concurrency in levels {
        let metrics = run_level(config, concurrency)
            .await
            .with_context(|| format!("level with {concurrency} workers failed"))?;

        report::print_level(concurrency, &metrics).context("failed to print report")?;
        if let Some(output) = &mut output {
            output
                .write(&LevelReport::new(concurrency, &metrics))
                .context("failed to write report")?;
        }
    }

    Ok(())
}

/// Runs one level against a fresh in-memory store holding the configured initial inventory.
pub async fn run_level(config: &Config, concurrency: usize) -> Result<AggregateMetrics> {
    let store = InMemoryStore::with_books(&config.store.initial_inventory)
        .context("invalid initial inventory")?;

    let workload = config.workload_configuration(Arc::new(store))?;
    tracing::info!(concurrency, seed = workload.seed(), "running level");

    let metrics = orchestrator::run(concurrency, Arc::new(workload)).await?;
    Ok(metrics)
}
