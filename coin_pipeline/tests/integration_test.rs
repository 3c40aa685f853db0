use approx::assert_relative_eq;
use chrono::{Days, NaiveDate};
use coin_pipeline::models::holt::HoltTrend;
use coin_pipeline::store::{forecast_records_from_table, PLATINUM_TABLE};
use coin_pipeline::{
    Asset, CellValue, Forecaster, Horizon, LayerStore, MemoryStore, Pipeline, PipelineConfig,
    PipelineError, PipelineMode, RawTable, SqliteStore,
};
use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tempfile::TempDir;

const HEADERS: [&str; 6] = ["Date", "Open", "High", "Low", "Close", "Volume"];

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn raw_from_closes(start: NaiveDate, closes: &[f64]) -> RawTable {
    let mut raw = RawTable::new(HEADERS);
    for (i, close) in closes.iter().enumerate() {
        let date = (start + Days::new(i as u64)).to_string();
        let price = close.to_string();
        raw = raw
            .with_row(&[
                date.as_str(),
                price.as_str(),
                price.as_str(),
                price.as_str(),
                price.as_str(),
                "1000",
            ])
            .unwrap();
    }
    raw
}

fn random_walk(seed: u64, len: usize) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut price = 500.0;
    (0..len)
        .map(|_| {
            price *= 1.0 + rng.gen_range(-0.04..0.04);
            price
        })
        .collect()
}

fn memory_store(tables: Vec<(Asset, RawTable)>) -> MemoryStore {
    let mut store = MemoryStore::new();
    for (asset, raw) in tables {
        store.insert_raw(asset, raw);
    }
    store
}

#[test]
fn test_constant_prices_end_to_end() {
    let start = day(2024, 1, 1);
    let store = memory_store(vec![
        (Asset::Bitcoin, raw_from_closes(start, &[100.0; 10])),
        (Asset::Ethereum, raw_from_closes(start, &[100.0; 10])),
    ]);

    let mut pipeline = Pipeline::new(PipelineConfig::default(), store).unwrap();
    let report = pipeline.run(day(2024, 6, 1)).unwrap();

    assert!(report.is_success());
    assert_eq!(report.platinum_rows, 2 * Horizon::ALL.len());

    let btc = report.outcome(Asset::Bitcoin).unwrap();
    assert_eq!(btc.silver_rows, 10);
    assert_eq!(btc.gold_rows, 9);
    assert_eq!(btc.forecast_rows, 14);

    for record in &report.records {
        assert_relative_eq!(record.forecast, 100.0, epsilon = 1e-9);
        assert_relative_eq!(record.return_pct, 0.0, epsilon = 1e-9);
    }

    let store = pipeline.into_store();
    let gold = store.rows("gold_btc_prices").unwrap();
    // DailyReturn, Vol7 and Drawdown columns
    assert!(gold.iter().all(|r| r[6] == CellValue::Real(0.0)));
    assert!(gold.iter().all(|r| r[18] == CellValue::Real(0.0)));
    assert!(gold.iter().all(|r| r[11] == CellValue::Real(0.0)));
}

#[test]
fn test_missing_day_and_placeholder_row() {
    let raw = RawTable::new(HEADERS)
        .with_row(&["Ticker", "BTC-USD", "BTC-USD", "BTC-USD", "BTC-USD", "BTC-USD"])
        .unwrap()
        .with_row(&["2024-01-01", "10", "10", "10", "10", "1"])
        .unwrap()
        .with_row(&["2024-01-02", "20", "20", "20", "20", "2"])
        .unwrap()
        .with_row(&["2024-01-04", "40", "40", "40", "40", "4"])
        .unwrap()
        .with_row(&["2024-01-05", "50", "50", "50", "50", "5"])
        .unwrap();

    let config = PipelineConfig {
        assets: vec![Asset::Bitcoin],
        ..PipelineConfig::default()
    };
    let mut pipeline = Pipeline::new(config, memory_store(vec![(Asset::Bitcoin, raw)])).unwrap();
    let report = pipeline.run(day(2024, 2, 1)).unwrap();
    assert!(report.is_success());

    let silver = pipeline.store().load_table("raw_btc_prices_sil").unwrap();
    assert_eq!(silver.len(), 5);
    assert_eq!(
        silver.rows()[2],
        vec![
            Some("2024-01-03".to_string()),
            Some("20".to_string()),
            Some("20".to_string()),
            Some("20".to_string()),
            Some("20".to_string()),
            Some("2".to_string()),
            Some("0".to_string()),
            Some("0.000002".to_string()),
            Some("Bitcoin".to_string()),
        ]
    );
}

#[test]
fn test_failing_asset_does_not_stop_the_other() {
    let start = day(2024, 1, 1);
    // Two raw days give one gold row, too little to forecast.
    let store = memory_store(vec![
        (Asset::Bitcoin, raw_from_closes(start, &random_walk(3, 60))),
        (Asset::Ethereum, raw_from_closes(start, &[5.0, 6.0])),
    ]);

    let mut pipeline = Pipeline::new(PipelineConfig::default(), store).unwrap();
    let report = pipeline.run(day(2025, 1, 1)).unwrap();

    assert!(!report.is_success());
    assert_eq!(report.failed_assets(), vec![Asset::Ethereum]);
    assert!(matches!(
        report.outcome(Asset::Ethereum).unwrap().error,
        Some(PipelineError::InsufficientHistoryError { available: 1, .. })
    ));
    assert_eq!(report.platinum_rows, Horizon::ALL.len());
    assert!(report.records.iter().all(|r| r.coin == "BTC"));

    // Earlier layers of the failed asset were still written.
    assert_eq!(pipeline.store().row_count("gold_eth_prices"), 1);
}

#[test]
fn test_failed_write_keeps_previous_table_and_isolates_asset() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("layers.db");
    let start = day(2023, 1, 1);

    let mut store = SqliteStore::open(&path).unwrap();
    store
        .write_raw(Asset::Bitcoin, &raw_from_closes(start, &random_walk(11, 120)))
        .unwrap();
    store
        .write_raw(Asset::Ethereum, &raw_from_closes(start, &random_walk(12, 120)))
        .unwrap();
    store
        .connection()
        .execute_batch(
            "CREATE TABLE gold_eth_prices (\"Sentinel\" TEXT NOT NULL);
             INSERT INTO gold_eth_prices VALUES ('keep');",
        )
        .unwrap();

    let config = PipelineConfig {
        database_path: path.clone(),
        ..PipelineConfig::default()
    };
    let mut pipeline = Pipeline::new(config, store).unwrap();
    let report = pipeline.run(day(2024, 1, 1)).unwrap();

    assert_eq!(report.failed_assets(), vec![Asset::Ethereum]);
    assert!(matches!(
        report.outcome(Asset::Ethereum).unwrap().error,
        Some(PipelineError::WriteError { .. })
    ));
    drop(pipeline);

    let store = SqliteStore::open(&path).unwrap();
    let gold_eth = store.load_table("gold_eth_prices").unwrap();
    assert_eq!(gold_eth.headers(), &["Sentinel".to_string()]);
    assert_eq!(gold_eth.rows(), &[vec![Some("keep".to_string())]]);

    let platinum = forecast_records_from_table(&store.load_table(PLATINUM_TABLE).unwrap()).unwrap();
    assert_eq!(platinum.len(), Horizon::ALL.len());
    assert!(platinum.iter().all(|r| r.coin == "BTC"));
}

#[test]
fn test_round_trip_mode_matches_in_process() {
    let start = day(2022, 3, 1);
    let raws = || {
        vec![
            (Asset::Bitcoin, raw_from_closes(start, &random_walk(21, 250))),
            (Asset::Ethereum, raw_from_closes(start, &random_walk(22, 250))),
        ]
    };
    let as_of = day(2022, 10, 1);

    let mut in_process =
        Pipeline::new(PipelineConfig::default(), memory_store(raws())).unwrap();
    let expected = in_process.run(as_of).unwrap();

    let mut sqlite = SqliteStore::open_in_memory().unwrap();
    for (asset, raw) in raws() {
        sqlite.write_raw(asset, &raw).unwrap();
    }
    let config = PipelineConfig {
        mode: PipelineMode::RoundTrip,
        ..PipelineConfig::default()
    };
    let mut round_trip = Pipeline::new(config, sqlite).unwrap();
    let actual = round_trip.run(as_of).unwrap();

    assert!(actual.is_success());
    assert_eq!(actual.records, expected.records);
}

#[test]
fn test_as_of_cuts_history() {
    let start = day(2024, 1, 1);
    let config = PipelineConfig {
        assets: vec![Asset::Ethereum],
        ..PipelineConfig::default()
    };
    let store = memory_store(vec![(Asset::Ethereum, raw_from_closes(start, &random_walk(5, 30)))]);
    let mut pipeline = Pipeline::new(config, store).unwrap();

    let report = pipeline.run(day(2024, 1, 20)).unwrap();
    let tomorrow = report
        .records
        .iter()
        .find(|r| r.horizon == Horizon::Tomorrow)
        .unwrap();
    assert_eq!(tomorrow.target_date, day(2024, 1, 20));
}

#[test]
fn test_no_forecasts_leave_platinum_untouched() {
    let mut store = MemoryStore::new();
    store
        .replace_table(
            PLATINUM_TABLE,
            &["Coin"],
            &[vec![CellValue::Text("previous".to_string())]],
        )
        .unwrap();

    let mut pipeline = Pipeline::new(PipelineConfig::default(), store).unwrap();
    let report = pipeline.run(day(2024, 1, 1)).unwrap();

    assert_eq!(report.failed_assets(), vec![Asset::Bitcoin, Asset::Ethereum]);
    assert_eq!(report.platinum_rows, 0);
    assert_eq!(pipeline.store().row_count(PLATINUM_TABLE), 1);
}

#[test]
fn test_invalid_config_is_rejected() {
    let config = PipelineConfig {
        min_history: 1,
        ..PipelineConfig::default()
    };
    let result = Pipeline::new(config, MemoryStore::new());
    assert!(matches!(result, Err(PipelineError::ConfigError(_))));
}

#[test]
fn test_seeded_store_with_fixed_parameter_forecaster() {
    let start = day(2024, 3, 1);
    let closes: Vec<f64> = (0..10).map(|i| 10.0 + 2.0 * i as f64).collect();
    let forecaster = Forecaster::default().with_model(HoltTrend::with_params(0.5, 0.5).unwrap());

    let mut pipeline = Pipeline::new(PipelineConfig::default(), MemoryStore::new())
        .unwrap()
        .with_forecaster(forecaster);
    for asset in Asset::ALL {
        pipeline
            .store_mut()
            .insert_raw(asset, raw_from_closes(start, &closes));
    }

    let report = pipeline.run(day(2024, 4, 1)).unwrap();
    assert!(report.is_success());

    // Gold starts on the second day: 12, 14, ..., 28 with trend 2.
    for record in &report.records {
        let days = record.horizon.days() as f64;
        assert_relative_eq!(record.forecast, 28.0 + 2.0 * days, epsilon = 1e-9);
    }
    assert_eq!(pipeline.store().row_count(PLATINUM_TABLE), 2 * Horizon::ALL.len());
}
