use approx::assert_relative_eq;
use chrono::{Days, NaiveDate};
use coin_pipeline::forecast::{default_forecast_start, MIN_HISTORY_FLOOR};
use coin_pipeline::models::holt::HoltTrend;
use coin_pipeline::{Asset, DailyCloseSeries, Forecaster, Horizon, PipelineError};
use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rstest::rstest;

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn history(start: NaiveDate, closes: &[f64]) -> Vec<(NaiveDate, f64)> {
    closes
        .iter()
        .enumerate()
        .map(|(i, c)| (start + Days::new(i as u64), *c))
        .collect()
}

#[test]
fn test_horizon_table() {
    let labels: Vec<&str> = Horizon::ALL.iter().map(|h| h.label()).collect();
    assert_eq!(
        labels,
        vec![
            "Tomorrow", "7 Days", "1 Month", "3 Months", "6 Months", "1 Year", "2 Years",
            "3 Years", "4 Years", "5 Years", "7 Years", "8 Years", "9 Years", "10 Years",
        ]
    );
    assert_eq!(Horizon::from_label("6 Months"), Some(Horizon::SixMonths));
    assert_eq!(Horizon::from_label("6 Years"), None);
}

#[rstest]
#[case(Horizon::Tomorrow, 1)]
#[case(Horizon::SevenDays, 7)]
#[case(Horizon::OneMonth, 30)]
#[case(Horizon::ThreeMonths, 90)]
#[case(Horizon::SixMonths, 180)]
#[case(Horizon::OneYear, 365)]
#[case(Horizon::FiveYears, 1825)]
#[case(Horizon::TenYears, 3650)]
fn test_horizon_days(#[case] horizon: Horizon, #[case] days: usize) {
    assert_eq!(horizon.days(), days);
}

#[test]
fn test_constant_history_forecasts_flat() {
    let start = day(2024, 1, 1);
    let records = Forecaster::default()
        .forecast(Asset::Bitcoin, &history(start, &[100.0; 9]), day(2024, 2, 1))
        .unwrap();

    assert_eq!(records.len(), Horizon::ALL.len());
    for record in &records {
        assert_eq!(record.coin, "BTC");
        assert_relative_eq!(record.forecast, 100.0, epsilon = 1e-9);
        assert_relative_eq!(record.return_pct, 0.0, epsilon = 1e-9);
    }
}

#[test]
fn test_linear_history_extrapolates() {
    let start = day(2020, 1, 1);
    let closes: Vec<f64> = (1..=50).map(|i| i as f64).collect();
    let records = Forecaster::default()
        .forecast(Asset::Ethereum, &history(start, &closes), day(2030, 1, 1))
        .unwrap();

    let last_date = start + Days::new(49);
    for record in &records {
        let days = record.horizon.days();
        assert_eq!(record.target_date, last_date + Days::new(days as u64));
        assert_relative_eq!(record.forecast, 50.0 + days as f64, epsilon = 1e-6);
        assert_relative_eq!(
            record.return_pct,
            days as f64 / 50.0 * 100.0,
            epsilon = 1e-6
        );
    }
}

#[test]
fn test_history_is_cut_at_as_of_and_start() {
    let forecaster = Forecaster::new(day(2024, 1, 3), MIN_HISTORY_FLOOR).unwrap();
    let obs = history(day(2024, 1, 1), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);

    let selected = forecaster.select_history(&obs, day(2024, 1, 6));
    assert_eq!(
        selected,
        vec![(day(2024, 1, 3), 3.0), (day(2024, 1, 4), 4.0), (day(2024, 1, 5), 5.0)]
    );

    let records = forecaster.forecast(Asset::Bitcoin, &obs, day(2024, 1, 6)).unwrap();
    assert_eq!(records[0].horizon, Horizon::Tomorrow);
    assert_eq!(records[0].target_date, day(2024, 1, 6));
}

#[test]
fn test_gaps_in_history_are_forward_filled() {
    let series = DailyCloseSeries::from_observations(&[
        (day(2024, 1, 1), 10.0),
        (day(2024, 1, 4), 40.0),
    ])
    .unwrap();

    assert_eq!(series.values(), &[10.0, 10.0, 10.0, 40.0]);
    assert_eq!(series.last_date(), day(2024, 1, 4));
}

#[test]
fn test_insufficient_history() {
    let forecaster = Forecaster::default();

    let one_point = forecaster.forecast(Asset::Bitcoin, &[(day(2024, 1, 1), 5.0)], day(2024, 2, 1));
    match one_point {
        Err(PipelineError::InsufficientHistoryError {
            asset,
            required,
            available,
        }) => {
            assert_eq!(asset, "BTC");
            assert_eq!(required, 2);
            assert_eq!(available, 1);
        }
        other => panic!("Expected InsufficientHistoryError, got {:?}", other),
    }

    let before_start = forecaster.forecast(
        Asset::Ethereum,
        &history(day(2017, 6, 1), &[1.0, 2.0, 3.0]),
        day(2024, 2, 1),
    );
    assert!(matches!(
        before_start,
        Err(PipelineError::InsufficientHistoryError { available: 0, .. })
    ));
}

#[test]
fn test_min_history_is_configurable_upward() {
    assert!(matches!(
        Forecaster::new(default_forecast_start(), 1),
        Err(PipelineError::InvalidParameter(_))
    ));

    let forecaster = Forecaster::new(default_forecast_start(), 30).unwrap();
    let result = forecaster.forecast(
        Asset::Bitcoin,
        &history(day(2024, 1, 1), &[1.0; 20]),
        day(2025, 1, 1),
    );
    assert!(matches!(
        result,
        Err(PipelineError::InsufficientHistoryError { required: 30, available: 20, .. })
    ));
}

#[test]
fn test_forecasts_are_deterministic() {
    let mut rng = StdRng::seed_from_u64(42);
    let mut price = 30_000.0;
    let closes: Vec<f64> = (0..400)
        .map(|_| {
            price *= 1.0 + rng.gen_range(-0.03..0.03);
            price
        })
        .collect();
    let obs = history(day(2021, 1, 1), &closes);
    let as_of = day(2023, 1, 1);

    let first = Forecaster::default().forecast(Asset::Bitcoin, &obs, as_of).unwrap();
    let second = Forecaster::default().forecast(Asset::Bitcoin, &obs, as_of).unwrap();

    assert_eq!(first, second);
    assert!(first.iter().all(|r| r.forecast.is_finite()));
}

#[test]
fn test_fixed_parameter_model() {
    let forecaster = Forecaster::default().with_model(HoltTrend::with_params(0.5, 0.5).unwrap());
    let records = forecaster
        .forecast(Asset::Bitcoin, &history(day(2024, 1, 1), &[1.0, 3.0, 5.0]), day(2024, 1, 4))
        .unwrap();

    // Exact trend, so any smoothing keeps level 5 and trend 2.
    assert_relative_eq!(records[0].forecast, 7.0, epsilon = 1e-12);
    assert_relative_eq!(records[1].forecast, 19.0, epsilon = 1e-12);
}

#[rstest]
#[case(500.0)]
#[case(-500.0)]
#[case(1500.0)]
fn test_first_day_jump_does_not_drive_long_horizons(#[case] jump: f64) {
    let mut rng = StdRng::seed_from_u64(7);
    let mut price = 20_000.0;
    let mut closes: Vec<f64> = (0..2900)
        .map(|_| {
            price += rng.gen_range(-1.0..1.0);
            price
        })
        .collect();
    closes[0] -= jump;

    let records = Forecaster::default()
        .forecast(Asset::Bitcoin, &history(day(2018, 1, 1), &closes), day(2026, 1, 1))
        .unwrap();

    let ten_years = records
        .iter()
        .find(|r| r.horizon == Horizon::TenYears)
        .unwrap();
    assert!(
        ten_years.return_pct.abs() < 25.0,
        "10-year return {}% after a first-day jump of {}",
        ten_years.return_pct,
        jump
    );
}
