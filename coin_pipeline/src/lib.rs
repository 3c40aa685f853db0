//! # Coin Pipeline
//!
//! A layered batch pipeline for daily Bitcoin and Ethereum prices.
//!
//! ## Layers
//!
//! - **bronze**: raw ingest rows as delivered by the price feed
//! - **silver**: a conformed, gapless daily OHLCV series with daily returns
//! - **gold**: engineered features (returns, moving averages, volatility, drawdown)
//! - **platinum**: multi-horizon price forecasts from Holt's linear trend method
//!
//! Every layer is written with full replacement through a [`LayerStore`];
//! SQLite and in-memory stores are provided.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use coin_pipeline::{Pipeline, PipelineConfig, SqliteStore};
//! use chrono::Local;
//!
//! let config = PipelineConfig::from_env()?;
//! let store = SqliteStore::open(&config.database_path)?;
//!
//! let mut pipeline = Pipeline::new(config, store)?;
//! let report = pipeline.run(Local::now().date_naive())?;
//!
//! for record in &report.records {
//!     println!("{} {} {:.2}", record.coin, record.horizon, record.forecast);
//! }
//! # Ok::<(), coin_pipeline::PipelineError>(())
//! ```

pub mod config;
pub mod conform;
pub mod data;
pub mod error;
pub mod features;
pub mod forecast;
pub mod models;
pub mod pipeline;
pub mod store;

// Re-export commonly used types
pub use crate::config::{PipelineConfig, PipelineMode};
pub use crate::conform::{ConformStats, Conformer};
pub use crate::data::{Asset, ConformedSeries, DailyCloseSeries, RawTable};
pub use crate::error::{PipelineError, Result};
pub use crate::features::{FeatureEngine, FeatureRow};
pub use crate::forecast::{ForecastRecord, Forecaster, Horizon};
pub use crate::models::{ForecastModel, ForecastResult, TrainedForecastModel};
pub use crate::pipeline::{AssetOutcome, Pipeline, PipelineReport};
pub use crate::store::{CellValue, LayerStore, MemoryStore, SqliteStore};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
