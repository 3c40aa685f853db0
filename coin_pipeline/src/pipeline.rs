//! Bronze → silver → gold → platinum driver
//!
//! Each configured asset goes through conform, feature engineering and
//! forecasting on its own; a failure is recorded against that asset and the
//! run moves on. The shared platinum table is written once at the end.

use crate::config::{PipelineConfig, PipelineMode};
use crate::conform::Conformer;
use crate::data::{Asset, ConformedSeries};
use crate::error::{PipelineError, Result};
use crate::features::{close_history, FeatureEngine};
use crate::forecast::{ForecastRecord, Forecaster};
use crate::store::{
    close_history_from_table, gold_rows, platinum_rows, silver_rows, LayerStore, GOLD_COLUMNS,
    PLATINUM_COLUMNS, PLATINUM_TABLE, SILVER_COLUMNS,
};
use chrono::NaiveDate;
use tracing::{info, warn};

/// What happened to one asset during a run
#[derive(Debug)]
pub struct AssetOutcome {
    pub asset: Asset,
    pub silver_rows: usize,
    pub gold_rows: usize,
    pub forecast_rows: usize,
    /// Set when a stage failed; later stages were skipped
    pub error: Option<PipelineError>,
}

impl AssetOutcome {
    fn new(asset: Asset) -> Self {
        Self {
            asset,
            silver_rows: 0,
            gold_rows: 0,
            forecast_rows: 0,
            error: None,
        }
    }

    /// Check whether every stage completed
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Summary of a pipeline run
#[derive(Debug)]
pub struct PipelineReport {
    pub as_of: NaiveDate,
    pub outcomes: Vec<AssetOutcome>,
    /// Rows written to the platinum table; 0 if it was left untouched
    pub platinum_rows: usize,
    /// Forecasts of every asset that succeeded
    pub records: Vec<ForecastRecord>,
}

impl PipelineReport {
    /// Check whether every asset succeeded
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(AssetOutcome::succeeded)
    }

    /// Assets that failed
    pub fn failed_assets(&self) -> Vec<Asset> {
        self.outcomes
            .iter()
            .filter(|o| !o.succeeded())
            .map(|o| o.asset)
            .collect()
    }

    /// Outcome of one asset
    pub fn outcome(&self, asset: Asset) -> Option<&AssetOutcome> {
        self.outcomes.iter().find(|o| o.asset == asset)
    }
}

/// Runs every layer for the configured assets against one store
#[derive(Debug)]
pub struct Pipeline<S: LayerStore> {
    config: PipelineConfig,
    store: S,
    engine: FeatureEngine,
    forecaster: Forecaster,
}

impl<S: LayerStore> Pipeline<S> {
    /// Create a pipeline; fails if the configuration is invalid
    pub fn new(config: PipelineConfig, store: S) -> Result<Self> {
        config.validate()?;
        let forecaster = config.forecaster()?;
        Ok(Self {
            config,
            store,
            engine: FeatureEngine::new(),
            forecaster,
        })
    }

    /// Replace the forecaster, e.g. with fixed smoothing parameters
    pub fn with_forecaster(mut self, forecaster: Forecaster) -> Self {
        self.forecaster = forecaster;
        self
    }

    /// Get the configuration
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Get the store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Get the store mutably, e.g. to seed raw tables
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Give the store back
    pub fn into_store(self) -> S {
        self.store
    }

    /// Run every layer with history strictly before `as_of`
    ///
    /// Only a failed platinum write is returned as an error; per-asset
    /// failures are reported in the [`PipelineReport`].
    pub fn run(&mut self, as_of: NaiveDate) -> Result<PipelineReport> {
        info!(
            %as_of,
            mode = %self.config.mode,
            assets = self.config.assets.len(),
            "pipeline run started"
        );

        let mut outcomes = Vec::with_capacity(self.config.assets.len());
        let mut records = Vec::new();

        for asset in self.config.assets.clone() {
            let mut outcome = AssetOutcome::new(asset);
            match self.run_asset(asset, as_of, &mut outcome) {
                Ok(mut asset_records) => {
                    outcome.forecast_rows = asset_records.len();
                    records.append(&mut asset_records);
                }
                Err(e) => {
                    warn!(asset = %asset, error = %e, "asset failed, continuing with the rest");
                    outcome.error = Some(e);
                }
            }
            outcomes.push(outcome);
        }

        // Keep the previous forecasts rather than wiping them when nothing succeeded.
        let platinum_rows = if records.is_empty() {
            warn!("no forecasts produced, platinum table left unchanged");
            0
        } else {
            let written = self.store.replace_table(
                PLATINUM_TABLE,
                PLATINUM_COLUMNS,
                &platinum_rows(&records),
            )?;
            info!(table = PLATINUM_TABLE, rows = written, "wrote platinum layer");
            written
        };

        let report = PipelineReport {
            as_of,
            outcomes,
            platinum_rows,
            records,
        };
        info!(
            succeeded = report.outcomes.iter().filter(|o| o.succeeded()).count(),
            failed = report.failed_assets().len(),
            "pipeline run finished"
        );
        Ok(report)
    }

    fn run_asset(
        &mut self,
        asset: Asset,
        as_of: NaiveDate,
        outcome: &mut AssetOutcome,
    ) -> Result<Vec<ForecastRecord>> {
        let conformer = Conformer::new(asset);

        let raw = self.store.load_raw(asset)?;
        let series = conformer.conform(&raw)?;

        outcome.silver_rows = self.store.replace_table(
            asset.silver_table(),
            SILVER_COLUMNS,
            &silver_rows(&series),
        )?;
        info!(
            asset = %asset,
            table = asset.silver_table(),
            rows = outcome.silver_rows,
            "wrote silver layer"
        );

        let series: ConformedSeries = match self.config.mode {
            PipelineMode::InProcess => series,
            PipelineMode::RoundTrip => {
                conformer.conform(&self.store.load_table(asset.silver_table())?)?
            }
        };

        let features = self.engine.engineer(&series)?;
        outcome.gold_rows = self.store.replace_table(
            asset.gold_table(),
            GOLD_COLUMNS,
            &gold_rows(&features),
        )?;
        info!(
            asset = %asset,
            table = asset.gold_table(),
            rows = outcome.gold_rows,
            "wrote gold layer"
        );

        let history = match self.config.mode {
            PipelineMode::InProcess => close_history(&features),
            PipelineMode::RoundTrip => {
                close_history_from_table(&self.store.load_table(asset.gold_table())?)?
            }
        };

        self.forecaster.forecast(asset, &history, as_of)
    }
}
