use chrono::NaiveDate;
use coin_pipeline::config::{ENV_ASSETS, ENV_DB, ENV_FORECAST_START, ENV_MIN_HISTORY, ENV_MODE};
use coin_pipeline::{Asset, PipelineConfig, PipelineError, PipelineMode};
use pretty_assertions::assert_eq;
use rstest::rstest;
use std::path::PathBuf;

#[test]
fn test_defaults() {
    let config = PipelineConfig::default();

    assert_eq!(config.database_path, PathBuf::from("coin_layers.db"));
    assert_eq!(config.forecast_start, NaiveDate::from_ymd_opt(2018, 1, 1).unwrap());
    assert_eq!(config.min_history, 2);
    assert_eq!(config.mode, PipelineMode::InProcess);
    assert_eq!(config.assets, vec![Asset::Bitcoin, Asset::Ethereum]);
    assert!(config.validate().is_ok());
}

#[test]
fn test_from_json_fills_missing_fields() {
    let config = PipelineConfig::from_json_str(
        r#"{ "database_path": "/tmp/layers.db", "mode": "round_trip", "assets": ["ETH"] }"#,
    )
    .unwrap();

    assert_eq!(config.database_path, PathBuf::from("/tmp/layers.db"));
    assert_eq!(config.mode, PipelineMode::RoundTrip);
    assert_eq!(config.assets, vec![Asset::Ethereum]);
    assert_eq!(config.min_history, 2);
}

#[rstest]
#[case(r#"{ "min_history": 1 }"#)]
#[case(r#"{ "assets": [] }"#)]
#[case(r#"{ "mode": "sometimes" }"#)]
#[case("not json")]
fn test_invalid_json_is_config_error(#[case] json: &str) {
    assert!(matches!(
        PipelineConfig::from_json_str(json),
        Err(PipelineError::ConfigError(_))
    ));
}

#[rstest]
#[case("in_process", PipelineMode::InProcess)]
#[case("Round-Trip", PipelineMode::RoundTrip)]
#[case("roundtrip", PipelineMode::RoundTrip)]
fn test_mode_parsing(#[case] raw: &str, #[case] expected: PipelineMode) {
    assert_eq!(raw.parse::<PipelineMode>().unwrap(), expected);
}

// All environment cases live in one test; the process environment is shared
// between test threads.
#[test]
fn test_from_env() {
    let vars = [ENV_DB, ENV_FORECAST_START, ENV_MIN_HISTORY, ENV_MODE, ENV_ASSETS];
    for var in vars {
        std::env::remove_var(var);
    }
    assert_eq!(PipelineConfig::from_env().unwrap(), PipelineConfig::default());

    std::env::set_var(ENV_DB, "/data/prices.db");
    std::env::set_var(ENV_FORECAST_START, "2020-06-01");
    std::env::set_var(ENV_MIN_HISTORY, "30");
    std::env::set_var(ENV_MODE, "round_trip");
    std::env::set_var(ENV_ASSETS, "eth, Bitcoin");
    let config = PipelineConfig::from_env().unwrap();
    assert_eq!(config.database_path, PathBuf::from("/data/prices.db"));
    assert_eq!(config.forecast_start, NaiveDate::from_ymd_opt(2020, 6, 1).unwrap());
    assert_eq!(config.min_history, 30);
    assert_eq!(config.mode, PipelineMode::RoundTrip);
    assert_eq!(config.assets, vec![Asset::Ethereum, Asset::Bitcoin]);

    std::env::set_var(ENV_MIN_HISTORY, "many");
    assert!(matches!(
        PipelineConfig::from_env(),
        Err(PipelineError::ConfigError(_))
    ));

    std::env::set_var(ENV_MIN_HISTORY, "1");
    assert!(matches!(
        PipelineConfig::from_env(),
        Err(PipelineError::ConfigError(_))
    ));

    for var in vars {
        std::env::remove_var(var);
    }
}
