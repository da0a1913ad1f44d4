use chrono::NaiveDate;
use polars::prelude::*;
use pretty_assertions::assert_eq;
use rstest::rstest;
use std::io::Write;
use std::path::Path;
use stock_forecast::data::{DataLoader, PreparedSeries, SeriesPreparer, TimeSeriesPoint};
use stock_forecast::ForecastError;
use tempfile::NamedTempFile;

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn price_table() -> DataFrame {
    df!(
        "Date" => &["2023-01-02", "2023-01-03", "2023-01-04"],
        "Open" => &[99.0, 101.0, 102.5],
        "Close" => &[100.0, 102.0, 101.5],
        "RSI" => &[55.0, 58.0, 52.0]
    )
    .unwrap()
}

fn assert_invalid_input<T: std::fmt::Debug>(result: Result<T, ForecastError>) {
    match result {
        Err(ForecastError::InvalidInputError(_)) => {}
        other => panic!("expected InvalidInputError, got {:?}", other),
    }
}

#[test]
fn test_prepare_keeps_only_date_and_close() {
    let series = SeriesPreparer::default().prepare(&price_table()).unwrap();

    assert_eq!(series.len(), 3);
    assert_eq!(series.values(), vec![100.0, 102.0, 101.5]);
    assert_eq!(
        series.timestamps(),
        vec![ymd(2023, 1, 2), ymd(2023, 1, 3), ymd(2023, 1, 4)]
    );
    assert_eq!(series.first_timestamp(), ymd(2023, 1, 2));
    assert_eq!(series.last_timestamp(), ymd(2023, 1, 4));
}

#[test]
fn test_prepare_matches_columns_case_insensitively() {
    let df = df!(
        "date" => &["2023-01-02", "2023-01-03"],
        "close" => &[10.0, 11.0]
    )
    .unwrap();

    let series = SeriesPreparer::default().prepare(&df).unwrap();
    assert_eq!(series.values(), vec![10.0, 11.0]);
}

#[test]
fn test_prepare_with_custom_columns() {
    let df = df!(
        "Day" => &["2023-01-02", "2023-01-03"],
        "Adj Close" => &[10.0, 11.0]
    )
    .unwrap();

    let preparer = SeriesPreparer::new("Day", "Adj Close");
    assert_eq!(preparer.value_column(), "Adj Close");
    assert_eq!(preparer.prepare(&df).unwrap().len(), 2);
}

#[test]
fn test_prepare_accepts_timestamp_strings() {
    let df = df!(
        "Date" => &["2023-01-02 00:00:00-05:00", "2023-01-03 00:00:00-05:00"],
        "Close" => &[10.0, 11.0]
    )
    .unwrap();

    let series = SeriesPreparer::default().prepare(&df).unwrap();
    assert_eq!(series.timestamps(), vec![ymd(2023, 1, 2), ymd(2023, 1, 3)]);
}

#[test]
fn test_prepare_accepts_date_dtype() {
    let dates = Series::new("Date", &[ymd(2023, 1, 2), ymd(2023, 1, 3)]);
    let closes = Series::new("Close", &[10.0, 11.0]);
    let df = DataFrame::new(vec![dates, closes]).unwrap();

    let series = SeriesPreparer::default().prepare(&df).unwrap();
    assert_eq!(series.timestamps(), vec![ymd(2023, 1, 2), ymd(2023, 1, 3)]);
}

#[test]
fn test_prepare_casts_integer_prices() {
    let df = df!(
        "Date" => &["2023-01-02", "2023-01-03"],
        "Close" => &[10i64, 12i64]
    )
    .unwrap();

    let series = SeriesPreparer::default().prepare(&df).unwrap();
    assert_eq!(series.values(), vec![10.0, 12.0]);
}

#[rstest]
#[case::missing_close("Close")]
#[case::missing_date("Date")]
fn test_prepare_missing_column(#[case] dropped: &str) {
    let df = price_table().drop(dropped).unwrap();
    assert_invalid_input(SeriesPreparer::default().prepare(&df));
}

#[test]
fn test_prepare_empty_table() {
    let df = df!(
        "Date" => Vec::<&str>::new(),
        "Close" => Vec::<f64>::new()
    )
    .unwrap();
    assert_invalid_input(SeriesPreparer::default().prepare(&df));
}

#[rstest]
#[case::out_of_order(&["2023-01-03", "2023-01-02"], &[1.0, 2.0])]
#[case::duplicate_date(&["2023-01-02", "2023-01-02"], &[1.0, 2.0])]
#[case::unparsable_date(&["2023-01-02", "yesterday"], &[1.0, 2.0])]
#[case::zero_price(&["2023-01-02", "2023-01-03"], &[1.0, 0.0])]
#[case::negative_price(&["2023-01-02", "2023-01-03"], &[-1.0, 2.0])]
fn test_prepare_rejects_bad_rows(#[case] dates: &[&str], #[case] closes: &[f64]) {
    let df = df!("Date" => dates, "Close" => closes).unwrap();
    assert_invalid_input(SeriesPreparer::default().prepare(&df));
}

#[test]
fn test_prepare_rejects_null_price() {
    let df = df!(
        "Date" => &["2023-01-02", "2023-01-03"],
        "Close" => &[Some(1.0), None]
    )
    .unwrap();
    assert_invalid_input(SeriesPreparer::default().prepare(&df));
}

#[test]
fn test_prepared_series_invariants() {
    assert_invalid_input(PreparedSeries::new(Vec::new()));
    assert_invalid_input(PreparedSeries::new(vec![TimeSeriesPoint {
        timestamp: ymd(2023, 1, 2),
        value: f64::NAN,
    }]));
    assert_invalid_input(PreparedSeries::from_parts(vec![ymd(2023, 1, 2)], vec![]));

    let series = PreparedSeries::from_parts(vec![ymd(2023, 1, 2)], vec![5.0]).unwrap();
    assert_eq!(series.points()[0].value, 5.0);
    assert!(!series.is_empty());
}

#[test]
fn test_data_loader_from_csv() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "Date,Open,High,Low,Close,Volume").unwrap();
    writeln!(file, "2023-01-02,100.0,105.0,98.0,103.0,1000").unwrap();
    writeln!(file, "2023-01-03,103.0,107.0,101.0,106.0,1200").unwrap();
    writeln!(file, "2023-01-04,106.0,110.0,104.0,108.0,1500").unwrap();

    let df = DataLoader::from_csv(file.path()).unwrap();
    assert_eq!(df.height(), 3);

    let series = SeriesPreparer::default().prepare(&df).unwrap();
    assert_eq!(series.values(), vec![103.0, 106.0, 108.0]);
}

#[test]
fn test_data_loader_missing_file() {
    match DataLoader::from_csv("/definitely/not/here.csv") {
        Err(ForecastError::IoError(_)) => {}
        other => panic!("expected IoError, got {:?}", other.map(|df| df.height())),
    }
}

#[test]
fn test_ticker_path_and_load() {
    assert_eq!(
        DataLoader::ticker_path("data", " aapl "),
        Path::new("data").join("AAPL.csv")
    );

    let dir = tempfile::tempdir().unwrap();
    let mut file = std::fs::File::create(dir.path().join("MSFT.csv")).unwrap();
    writeln!(file, "Date,Close").unwrap();
    writeln!(file, "2023-01-02,250.0").unwrap();
    writeln!(file, "2023-01-03,252.5").unwrap();
    drop(file);

    let series = DataLoader::load_ticker(dir.path(), "msft", &SeriesPreparer::default()).unwrap();
    assert_eq!(series.values(), vec![250.0, 252.5]);
}
