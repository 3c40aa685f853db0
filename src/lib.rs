//! # Coin Layers
//!
//! Workspace facade over the layered price pipeline:
//!
//! - [`math`]: numeric kernels (returns, rolling statistics, drawdown, Holt smoothing)
//! - [`pipeline`]: conformer, feature engine, forecaster and layer stores
//!
//! ## Example
//!
//! ```
//! use coin_layers_workspace::pipeline::{Asset, PipelineConfig, RawTable};
//! use coin_layers_workspace::run_in_memory;
//! use chrono::NaiveDate;
//!
//! let mut raw = RawTable::new(["Date", "Open", "High", "Low", "Close", "Volume"]);
//! for day in 1..=5 {
//!     let date = format!("2024-01-{:02}", day);
//!     raw = raw.with_row(&[date.as_str(), "100", "101", "99", "100", "1000"]).unwrap();
//! }
//!
//! let config = PipelineConfig {
//!     assets: vec![Asset::Bitcoin],
//!     ..PipelineConfig::default()
//! };
//! let as_of = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
//! let (report, _store) = run_in_memory([(Asset::Bitcoin, raw)], config, as_of).unwrap();
//! assert!(report.is_success());
//! assert_eq!(report.records.len(), 14);
//! ```

pub use coin_pipeline as pipeline;
pub use series_math as math;

use chrono::NaiveDate;
use coin_pipeline::{Asset, MemoryStore, Pipeline, PipelineConfig, PipelineReport, RawTable};

/// Run every layer over raw tables held in memory and return the populated store
pub fn run_in_memory(
    raw: impl IntoIterator<Item = (Asset, RawTable)>,
    config: PipelineConfig,
    as_of: NaiveDate,
) -> coin_pipeline::Result<(PipelineReport, MemoryStore)> {
    let mut store = MemoryStore::new();
    for (asset, table) in raw {
        store.insert_raw(asset, table);
    }

    let mut pipeline = Pipeline::new(config, store)?;
    let report = pipeline.run(as_of)?;
    Ok((report, pipeline.into_store()))
}
