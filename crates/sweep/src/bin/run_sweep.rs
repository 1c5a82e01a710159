use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use sweep::{Orchestrator, ProcessRunner, SweepConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Exit status when `--strict` is set and some point produced no row.
const INCOMPLETE_EXIT: u8 = 2;

#[derive(Debug, Parser)]
#[command(
    name = "run_sweep",
    about = "Benchmark attention variants across a log-spaced range of KV lengths"
)]
struct Args {
    #[arg(long, help = "TOML or JSON sweep configuration; built-in defaults when omitted")]
    config: Option<PathBuf>,

    #[arg(long, help = "Override the directory tables are written under")]
    results_dir: Option<PathBuf>,

    #[arg(long, help = "Print every benchmark command without running anything")]
    dry_run: bool,

    #[arg(
        long,
        help = "Exit with status 2 if any run was skipped, failed, or interrupted"
    )]
    strict: bool,
}

fn main() -> ExitCode {
    // `log` records from the library reach the subscriber through its log bridge
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("sweep failed: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<ExitCode> {
    let args = Args::parse();

    let mut config = match args.config.as_ref() {
        Some(path) => SweepConfig::from_path(path)
            .with_context(|| format!("loading sweep config {}", path.display()))?,
        None => SweepConfig::default(),
    };
    if let Some(dir) = args.results_dir.clone() {
        config.runtime.results_dir = dir;
    }
    if let Some(device) = config.runtime.device {
        println!("Using GPU: {device}");
    }

    let runner = ProcessRunner::new(&config.benchmark, &config.runtime);

    if args.dry_run {
        let planner = Orchestrator::planner(&config, runner).context("preparing sweep")?;
        for line in planner.plan() {
            println!("{line}");
        }
        return Ok(ExitCode::SUCCESS);
    }

    let mut orchestrator =
        Orchestrator::from_config(&config, runner).context("preparing sweep")?;

    let shutdown_flag = Arc::new(AtomicBool::new(false));
    let handler_flag = shutdown_flag.clone();
    ctrlc::set_handler(move || {
        handler_flag.store(true, Ordering::Relaxed);
    })
    .context("installing Ctrl-C handler")?;

    let summary = orchestrator
        .run_with_shutdown(|| shutdown_flag.load(Ordering::Relaxed))
        .with_context(|| {
            format!(
                "writing results under {}",
                config.runtime.results_dir.display()
            )
        })?;

    println!("\n{}", summary.headline());
    println!("{summary}");

    if args.strict && !summary.is_complete() {
        return Ok(ExitCode::from(INCOMPLETE_EXIT));
    }
    Ok(ExitCode::SUCCESS)
}
