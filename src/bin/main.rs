use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use dbparity::db::{OracleSource, PostgresSource};
use dbparity::error::AppError;
use dbparity::{config::RunConfig, executor, planner, report};

/// Row-level checksum verification between an Oracle-family source and a
/// PostgreSQL-compatible target.
#[derive(Parser, Debug)]
#[command(name = "dbparity", version, about)]
struct Cli {
    /// Path to the run configuration file.
    #[arg(default_value = "config.yml")]
    config: PathBuf,

    /// Directory reports are written to.
    #[arg(long, default_value = "reports")]
    report_dir: PathBuf,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(%err, "run failed");
            ExitCode::from(err.exit_code() as u8)
        }
    }
}

fn run(cli: Cli) -> Result<(), AppError> {
    let config = RunConfig::from_file(&cli.config)?;
    init_tracing(&config.logging.level);

    info!(config = %cli.config.display(), "loaded configuration");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("failed to start tokio runtime");

    runtime.block_on(run_async(config, &cli.report_dir))
}

async fn run_async(config: RunConfig, report_dir: &std::path::Path) -> Result<(), AppError> {
    let src = OracleSource::connect(&config.databases.src).map_err(|e| AppError::ConnectionFailed {
        side: "SRC",
        message: e.to_string(),
    })?;

    let plan = planner::plan(&src, &config.check_scope, &config.databases.src.user);
    for warning in &plan.warnings {
        tracing::warn!(%warning, "planning warning");
    }
    info!(tasks = plan.tasks.len(), synthesis_errors = plan.synthesis_errors.len(), "planning complete");

    let tgt = PostgresSource::connect(&config.databases.tgt).map_err(|message| AppError::ConnectionFailed {
        side: "TGT",
        message,
    })?;

    let shutdown = Arc::new(AtomicBool::new(false));
    spawn_shutdown_listener(Arc::clone(&shutdown));

    let execution = executor::run(
        Arc::new(src),
        Arc::new(tgt),
        plan.tasks.clone(),
        config.performance.thread_count,
        Arc::clone(&shutdown),
    )
    .await;

    let outcomes = report::classify(&plan.tasks, &plan.synthesis_errors, &execution);
    let summary = report::summarize(&outcomes, Utc::now());
    let (detail_path, summary_path) =
        report::write_reports(report_dir, &outcomes, &summary).map_err(|source| AppError::ReportDirUnwritable {
            dir: report_dir.display().to_string(),
            source,
        })?;

    info!(
        detail = %detail_path.display(),
        summary = %summary_path.display(),
        pass = summary.pass,
        fail_synthesis = summary.fail_synthesis,
        fail_execution = summary.fail_execution,
        fail_inconsistent = summary.fail_inconsistent,
        "run complete"
    );

    if shutdown.load(Ordering::Relaxed) {
        return Err(AppError::Interrupted);
    }

    Ok(())
}

fn spawn_shutdown_listener(flag: Arc<AtomicBool>) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, draining in-flight work");
            flag.store(true, Ordering::Relaxed);
        }
    });
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
