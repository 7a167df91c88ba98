//! Moddeploy - incremental mod deployment
//!
//! Usage:
//!   moddeploy                          # Deploy from the current directory
//!   moddeploy --work-dir <dir>         # Deploy from another framework dir
//!   moddeploy --policy strict          # Abort on the first stage error

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use moddeploy_core::config::{ConfigFile, ConfigStore};
use moddeploy_core::context::{ConfigOverrides, DeployContext};
use moddeploy_core::lock::RunLock;
use moddeploy_core::orchestrator::{
    ExecutionPolicy, Orchestrator, RunReport, StageStatus, format_elapsed,
};
use moddeploy_core::telemetry::TracingSpan;

#[derive(Parser)]
#[command(name = "moddeploy")]
#[command(about = "Incremental mod deployment", long_about = None)]
struct Cli {
    /// Framework working directory (defaults to the current directory)
    #[arg(long, short = 'w')]
    work_dir: Option<PathBuf>,

    /// Config file to use instead of the discovered moddeploy.toml
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Execution policy: strict, resilient or bypass
    #[arg(long, short)]
    policy: Option<String>,

    /// Maximum concurrent writes
    #[arg(long)]
    concurrency: Option<usize>,

    /// Game install root (defaults to the work dir's parent)
    #[arg(long)]
    game_root: Option<PathBuf>,

    /// Mods directory (defaults to <work-dir>/Mods)
    #[arg(long)]
    mods_dir: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "moddeploy=debug,moddeploy_core=debug,info"
    } else {
        "moddeploy=info,moddeploy_core=info,warn"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match run(cli) {
        Ok(report) => {
            print_summary(&report);
            exit_code(&report)
        }
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<RunReport> {
    let work_dir = match cli.work_dir {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to read current directory")?,
    };
    let policy = cli
        .policy
        .as_deref()
        .map(str::parse::<ExecutionPolicy>)
        .transpose()?;

    let store = match cli.config {
        Some(path) => ConfigStore::at(path),
        None => ConfigStore::for_work_dir(&work_dir),
    };
    let file = match store.load() {
        Ok(file) => {
            tracing::debug!("Using config {}", store.config_path().display());
            file
        }
        Err(err) if policy == Some(ExecutionPolicy::Strict) => {
            return Err(err)
                .with_context(|| format!("Failed to load {}", store.config_path().display()));
        }
        Err(err) => {
            tracing::warn!("Ignoring unusable config, using defaults: {:#}", err);
            ConfigFile::new()
        }
    };

    let overrides = ConfigOverrides {
        policy,
        concurrency: cli.concurrency,
        game_root: cli.game_root,
        mods_dir: cli.mods_dir,
    };
    let ctx = DeployContext::from_config(work_dir, &file, &overrides);

    let _lock = match RunLock::acquire(&ctx.run_lock_path()) {
        Ok(lock) => Some(lock),
        Err(err) if ctx.policy().aborts_on_error() => {
            return Err(err).context("Could not lock the work directory");
        }
        Err(err) => {
            tracing::warn!("Continuing without run lock: {}", err);
            None
        }
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    runtime.block_on(async move {
        let cancel = CancellationToken::new();
        let on_signal = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupted, finishing current work");
                on_signal.cancel();
            }
        });

        let orchestrator =
            Orchestrator::from_context(ctx).with_span(Box::new(TracingSpan::root("cli")));
        Ok(orchestrator.run(&cancel).await)
    })
}

fn exit_code(report: &RunReport) -> ExitCode {
    if report.exit_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn print_summary(report: &RunReport) {
    println!("Policy:     {}", report.policy);
    println!("Platform:   {}", report.platform);
    println!("Discovered: {}", report.discovered);
    println!("Stale:      {}", report.stale);
    println!(
        "Deployed:   {} of {} ({} failed)",
        report.deploy_succeeded, report.deploy_attempted, report.deploy_failed
    );
    println!(
        "Slots:      {} removed, {} failed",
        report.slots_removed, report.slot_failures
    );

    for record in &report.stages {
        match &record.status {
            StageStatus::Completed => {}
            StageStatus::Degraded { message, .. } => {
                println!("  ! {} degraded: {}", record.stage, message)
            }
            StageStatus::Failed { message, .. } => {
                println!("  x {} failed: {}", record.stage, message)
            }
            StageStatus::Skipped => println!("  - {} skipped", record.stage),
        }
    }

    let elapsed = format_elapsed(report.elapsed);
    if elapsed.is_empty() {
        println!("{:?} in less than a second", report.outcome);
    } else {
        println!("{:?} in {}", report.outcome, elapsed);
    }
}
