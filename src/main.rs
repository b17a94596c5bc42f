use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use insertbench::config::row_count_from_arg;
use insertbench::{
    run_comparison, BenchConfig, BenchError, EnvironmentProvisioner, PgCtl, PgEngine, RunContext,
    Strategy,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Times row-by-row, batched and bulk inserts against a throwaway PostgreSQL instance.
#[derive(Parser)]
#[command(name = "insertbench")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Rows each strategy inserts (falls back to the configured default when not a number)
    #[arg(allow_hyphen_values = true)]
    rows: Option<String>,

    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Seed for the row generator
    #[arg(long)]
    seed: Option<u64>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("insertbench=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), BenchError> {
    let mut config = BenchConfig::load(cli.config.as_deref())?;
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }
    let rows = row_count_from_arg(cli.rows.as_deref(), config.default_rows);
    info!(rows, batch_size = config.batch_size, "starting insert comparison");

    let tool = Arc::new(PgCtl::locate(&config)?);
    let engine = Arc::new(PgEngine::new(&config));
    let provisioner = EnvironmentProvisioner::new(tool, Arc::clone(&engine), &config);

    let Some(mut environment) = provisioner.provision().await else {
        return Err(BenchError::provisioning(
            "environment",
            "not available, benchmark skipped",
        ));
    };

    let mut context = RunContext::new(config.seed);
    let strategies = Strategy::all(config.batch_size);
    let outcome = run_comparison(engine.as_ref(), &mut context, &strategies, rows).await;
    if let Err(e) = &outcome {
        error!(error = %e, "benchmark aborted, tearing down");
    }

    let teardown = environment.dispose_all().await;
    outcome?;
    teardown
}
