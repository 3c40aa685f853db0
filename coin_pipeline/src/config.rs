//! Pipeline configuration from environment variables or JSON

use crate::data::Asset;
use crate::error::{PipelineError, Result};
use crate::forecast::{default_forecast_start, Forecaster, MIN_HISTORY_FLOOR};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

pub const ENV_DB: &str = "COIN_LAYERS_DB";
pub const ENV_FORECAST_START: &str = "COIN_LAYERS_FORECAST_START";
pub const ENV_MIN_HISTORY: &str = "COIN_LAYERS_MIN_HISTORY";
pub const ENV_MODE: &str = "COIN_LAYERS_MODE";
pub const ENV_ASSETS: &str = "COIN_LAYERS_ASSETS";

const DEFAULT_DB: &str = "coin_layers.db";

/// How stage outputs reach the next stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineMode {
    /// Hand each stage's output over in memory
    #[default]
    InProcess,
    /// Re-read silver and gold from the store before the next stage
    RoundTrip,
}

impl fmt::Display for PipelineMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineMode::InProcess => f.write_str("in_process"),
            PipelineMode::RoundTrip => f.write_str("round_trip"),
        }
    }
}

impl FromStr for PipelineMode {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "in_process" | "inprocess" | "memory" => Ok(PipelineMode::InProcess),
            "round_trip" | "roundtrip" | "store" => Ok(PipelineMode::RoundTrip),
            other => Err(PipelineError::ConfigError(format!("Unknown pipeline mode: {}", other))),
        }
    }
}

/// Settings of one pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// SQLite database holding every layer table
    pub database_path: PathBuf,
    /// First day of history the forecaster uses
    pub forecast_start: NaiveDate,
    /// Minimum number of daily closes needed to forecast
    pub min_history: usize,
    pub mode: PipelineMode,
    /// Assets to process, in order
    pub assets: Vec<Asset>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from(DEFAULT_DB),
            forecast_start: default_forecast_start(),
            min_history: MIN_HISTORY_FLOOR,
            mode: PipelineMode::InProcess,
            assets: Asset::ALL.to_vec(),
        }
    }
}

fn env_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn parse_env<T: FromStr>(name: &str, raw: &str) -> Result<T>
where
    T::Err: fmt::Display,
{
    raw.parse::<T>()
        .map_err(|e| PipelineError::ConfigError(format!("{}={}: {}", name, raw, e)))
}

impl PipelineConfig {
    /// Defaults overridden by any `COIN_LAYERS_*` variables that are set
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(path) = env_var(ENV_DB) {
            config.database_path = PathBuf::from(path);
        }
        if let Some(raw) = env_var(ENV_FORECAST_START) {
            config.forecast_start = parse_env(ENV_FORECAST_START, &raw)?;
        }
        if let Some(raw) = env_var(ENV_MIN_HISTORY) {
            config.min_history = parse_env(ENV_MIN_HISTORY, &raw)?;
        }
        if let Some(raw) = env_var(ENV_MODE) {
            config.mode = parse_env(ENV_MODE, &raw)?;
        }
        if let Some(raw) = env_var(ENV_ASSETS) {
            config.assets = raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| parse_env::<Asset>(ENV_ASSETS, s))
                .collect::<Result<Vec<_>>>()?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Parse a JSON document; missing fields take their defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the settings are usable
    pub fn validate(&self) -> Result<()> {
        if self.min_history < MIN_HISTORY_FLOOR {
            return Err(PipelineError::ConfigError(format!(
                "min_history must be at least {}, got {}",
                MIN_HISTORY_FLOOR, self.min_history
            )));
        }
        if self.assets.is_empty() {
            return Err(PipelineError::ConfigError("no assets configured".to_string()));
        }
        Ok(())
    }

    /// Forecaster matching these settings
    pub fn forecaster(&self) -> Result<Forecaster> {
        Forecaster::new(self.forecast_start, self.min_history)
    }
}
