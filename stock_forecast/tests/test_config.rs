use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use rstest::rstest;
use std::io::Write;
use std::time::Duration;
use stock_forecast::models::InformationCriterion;
use stock_forecast::{ForecastConfig, ForecastError, SelectionMode};
use tempfile::NamedTempFile;

#[test]
fn test_defaults() {
    let config = ForecastConfig::default();
    assert_eq!(config.horizon_days, 365);
    assert_eq!(config.mode, SelectionMode::Best);
    assert_eq!(config.date_column, "Date");
    assert_eq!(config.value_column, "Close");
    assert!(config.parallel);
    assert_eq!(config.fit_timeout(), None);

    assert!(config.seasonal.yearly_seasonality);
    assert!(config.seasonal.weekly_seasonality);
    assert!(!config.seasonal.daily_seasonality);
    assert_eq!(config.seasonal.n_changepoints, 25);

    assert_eq!(config.auto_arima.max_p, 5);
    assert_eq!(config.auto_arima.max_q, 5);
    assert!(config.auto_arima.stepwise);
    assert_eq!(config.auto_arima.information_criterion, InformationCriterion::Aic);
}

#[test]
fn test_partial_json_overrides() {
    let config = ForecastConfig::from_json_str(
        r#"{
            "horizon_days": 30,
            "mode": "arima",
            "fit_timeout_secs": 5,
            "parallel": false,
            "seasonal": { "weekly_seasonality": false, "uncertainty_samples": 250 },
            "auto_arima": { "stepwise": false, "information_criterion": "Bic" }
        }"#,
    )
    .unwrap();

    assert_eq!(config.horizon_days, 30);
    assert_eq!(config.mode, SelectionMode::AutoRegressive);
    assert_eq!(config.fit_timeout(), Some(Duration::from_secs(5)));
    assert!(!config.parallel);
    assert!(!config.seasonal.weekly_seasonality);
    assert!(config.seasonal.yearly_seasonality);
    assert_eq!(config.seasonal.uncertainty_samples, 250);
    assert!(!config.auto_arima.stepwise);
    assert_eq!(config.auto_arima.max_order, 5);
    assert_eq!(config.auto_arima.information_criterion, InformationCriterion::Bic);
}

#[test]
fn test_holidays_from_json() {
    let config = ForecastConfig::from_json_str(
        r#"{ "seasonal": { "holidays": [
            { "name": "christmas", "dates": ["2022-12-25", "2023-12-25"] }
        ] } }"#,
    )
    .unwrap();

    let holidays = &config.seasonal.holidays;
    assert_eq!(holidays.len(), 1);
    assert_eq!(holidays[0].name, "christmas");
    assert_eq!(holidays[0].dates[1], NaiveDate::from_ymd_opt(2023, 12, 25).unwrap());
}

#[rstest]
#[case::zero(r#"{"horizon_days": 0}"#)]
#[case::negative(r#"{"horizon_days": -7}"#)]
#[case::fractional(r#"{"horizon_days": 1.5}"#)]
#[case::string(r#"{"horizon_days": "30"}"#)]
#[case::null(r#"{"horizon_days": null}"#)]
fn test_invalid_horizon(#[case] json: &str) {
    match ForecastConfig::from_json_str(json) {
        Err(ForecastError::InvalidHorizonError(_)) => {}
        other => panic!("expected InvalidHorizonError, got {:?}", other),
    }
}

#[rstest]
#[case::interval_width(r#"{"seasonal": {"interval_width": 1.2}}"#)]
#[case::prior_scale(r#"{"seasonal": {"changepoint_prior_scale": -0.1}}"#)]
#[case::alpha(r#"{"auto_arima": {"alpha": 0.0}}"#)]
#[case::timeout(r#"{"fit_timeout_secs": 0}"#)]
#[case::empty_column(r#"{"value_column": ""}"#)]
fn test_invalid_parameters(#[case] json: &str) {
    match ForecastConfig::from_json_str(json) {
        Err(ForecastError::InvalidParameter(_)) => {}
        other => panic!("expected InvalidParameter, got {:?}", other),
    }
}

#[test]
fn test_unknown_mode_is_rejected() {
    let result = ForecastConfig::from_json_str(r#"{"mode": "coin-flip"}"#);
    assert!(matches!(result, Err(ForecastError::SerializationError(_))));
}

#[test]
fn test_from_json_file() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, r#"{{"horizon_days": 90, "mode": "prophet"}}"#).unwrap();

    let config = ForecastConfig::from_json_file(file.path()).unwrap();
    assert_eq!(config.horizon_days, 90);
    assert_eq!(config.mode, SelectionMode::Seasonal);

    assert!(matches!(
        ForecastConfig::from_json_file("/no/such/config.json"),
        Err(ForecastError::IoError(_))
    ));
}
