//! Run every layer once against the configured SQLite database.
//!
//! Settings come from `COIN_LAYERS_*` environment variables; log verbosity
//! from `RUST_LOG`.

use chrono::Local;
use coin_pipeline::{Pipeline, PipelineConfig, SqliteStore};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn run() -> coin_pipeline::Result<bool> {
    let config = PipelineConfig::from_env()?;
    info!(db = %config.database_path.display(), mode = %config.mode, "starting layer run");

    let store = SqliteStore::open(&config.database_path)?;
    let mut pipeline = Pipeline::new(config, store)?;
    let report = pipeline.run(Local::now().date_naive())?;

    for outcome in &report.outcomes {
        match &outcome.error {
            None => info!(
                asset = %outcome.asset,
                silver = outcome.silver_rows,
                gold = outcome.gold_rows,
                forecasts = outcome.forecast_rows,
                "asset done"
            ),
            Some(e) => error!(asset = %outcome.asset, error = %e, "asset failed"),
        }
    }

    Ok(report.is_success())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match run() {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!(error = %e, "layer run aborted");
            ExitCode::FAILURE
        }
    }
}
