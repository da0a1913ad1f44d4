//! Price table loading and preparation for forecasting

use crate::error::{ForecastError, Result};
use crate::utils::{date_from_epoch_days, parse_date};
use chrono::NaiveDate;
use polars::prelude::*;
use serde::Serialize;
use std::fs::File;
use std::path::{Path, PathBuf};

/// A single observation of the prepared series
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimeSeriesPoint {
    pub timestamp: NaiveDate,
    pub value: f64,
}

/// Chronological `(timestamp, value)` sequence consumed by the forecasters.
///
/// Always non-empty, with strictly increasing timestamps and finite values.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedSeries {
    points: Vec<TimeSeriesPoint>,
}

impl PreparedSeries {
    /// Build a series, checking ordering and value invariants
    pub fn new(points: Vec<TimeSeriesPoint>) -> Result<Self> {
        if points.is_empty() {
            return Err(ForecastError::InvalidInputError(
                "Price table contains no rows".to_string(),
            ));
        }

        if let Some(bad) = points.iter().position(|p| !p.value.is_finite()) {
            return Err(ForecastError::InvalidInputError(format!(
                "Value at row {} is not a finite number",
                bad
            )));
        }

        if let Some(bad) = points
            .windows(2)
            .position(|w| w[1].timestamp <= w[0].timestamp)
        {
            return Err(ForecastError::InvalidInputError(format!(
                "Timestamps must be strictly increasing: {} follows {} at row {}",
                points[bad + 1].timestamp,
                points[bad].timestamp,
                bad + 1
            )));
        }

        Ok(Self { points })
    }

    /// Build a series from parallel date and value vectors
    pub fn from_parts(dates: Vec<NaiveDate>, values: Vec<f64>) -> Result<Self> {
        if dates.len() != values.len() {
            return Err(ForecastError::InvalidInputError(format!(
                "Dates length ({}) doesn't match values length ({})",
                dates.len(),
                values.len()
            )));
        }

        Self::new(
            dates
                .into_iter()
                .zip(values)
                .map(|(timestamp, value)| TimeSeriesPoint { timestamp, value })
                .collect(),
        )
    }

    pub fn points(&self) -> &[TimeSeriesPoint] {
        &self.points
    }

    /// Observed values in order
    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    /// Timestamps in order
    pub fn timestamps(&self) -> Vec<NaiveDate> {
        self.points.iter().map(|p| p.timestamp).collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first_timestamp(&self) -> NaiveDate {
        self.points[0].timestamp
    }

    pub fn last_timestamp(&self) -> NaiveDate {
        self.points[self.points.len() - 1].timestamp
    }
}

/// Turns a raw price table into a [`PreparedSeries`].
///
/// Only the date and value columns are read; indicator columns computed
/// upstream are ignored. Row order is kept as given.
#[derive(Debug, Clone)]
pub struct SeriesPreparer {
    date_column: String,
    value_column: String,
}

impl Default for SeriesPreparer {
    fn default() -> Self {
        Self::new("Date", "Close")
    }
}

impl SeriesPreparer {
    pub fn new(date_column: impl Into<String>, value_column: impl Into<String>) -> Self {
        Self {
            date_column: date_column.into(),
            value_column: value_column.into(),
        }
    }

    pub fn date_column(&self) -> &str {
        &self.date_column
    }

    pub fn value_column(&self) -> &str {
        &self.value_column
    }

    /// Select, coerce and validate the date and value columns of `df`
    pub fn prepare(&self, df: &DataFrame) -> Result<PreparedSeries> {
        let date_name = Self::find_column(df, &self.date_column)?;
        let value_name = Self::find_column(df, &self.value_column)?;

        if df.height() == 0 {
            return Err(ForecastError::InvalidInputError(
                "Price table contains no rows".to_string(),
            ));
        }

        let dates = Self::dates(df.column(&date_name)?)?;
        let values = Self::values(df.column(&value_name)?)?;

        if let Some(bad) = values.iter().position(|v| *v <= 0.0) {
            return Err(ForecastError::InvalidInputError(format!(
                "Column '{}' must hold positive prices, found {} at row {}",
                value_name, values[bad], bad
            )));
        }

        PreparedSeries::from_parts(dates, values)
    }

    /// Exact name first, then ASCII case-insensitive
    fn find_column(df: &DataFrame, wanted: &str) -> Result<String> {
        let names = df.get_column_names();
        names
            .iter()
            .find(|name| **name == wanted)
            .or_else(|| names.iter().find(|name| name.eq_ignore_ascii_case(wanted)))
            .map(|name| name.to_string())
            .ok_or_else(|| {
                ForecastError::InvalidInputError(format!(
                    "Required column '{}' not found (available: {})",
                    wanted,
                    names.join(", ")
                ))
            })
    }

    fn dates(col: &Series) -> Result<Vec<NaiveDate>> {
        let name = col.name().to_string();
        let missing =
            |row: usize| ForecastError::InvalidInputError(format!("Column '{}' has no date at row {}", name, row));

        match col.dtype() {
            DataType::Utf8 => col
                .utf8()?
                .into_iter()
                .enumerate()
                .map(|(row, cell)| {
                    let raw = cell.ok_or_else(|| missing(row))?;
                    parse_date(raw).ok_or_else(|| {
                        ForecastError::InvalidInputError(format!(
                            "Cannot parse '{}' in column '{}' as a date",
                            raw, name
                        ))
                    })
                })
                .collect(),
            DataType::Date => {
                let days = col.cast(&DataType::Int32)?;
                days.i32()?
                    .into_iter()
                    .enumerate()
                    .map(|(row, cell)| {
                        cell.and_then(|d| date_from_epoch_days(d as i64))
                            .ok_or_else(|| missing(row))
                    })
                    .collect()
            }
            DataType::Datetime(unit, _) => {
                let per_day: i64 = match unit {
                    TimeUnit::Nanoseconds => 86_400_000_000_000,
                    TimeUnit::Microseconds => 86_400_000_000,
                    TimeUnit::Milliseconds => 86_400_000,
                };
                let ticks = col.cast(&DataType::Int64)?;
                ticks
                    .i64()?
                    .into_iter()
                    .enumerate()
                    .map(|(row, cell)| {
                        cell.and_then(|t| date_from_epoch_days(t.div_euclid(per_day)))
                            .ok_or_else(|| missing(row))
                    })
                    .collect()
            }
            other => Err(ForecastError::InvalidInputError(format!(
                "Column '{}' has type {} which cannot be read as dates",
                name, other
            ))),
        }
    }

    fn values(col: &Series) -> Result<Vec<f64>> {
        let name = col.name().to_string();
        let floats = col.cast(&DataType::Float64)?;
        floats
            .f64()?
            .into_iter()
            .enumerate()
            .map(|(row, cell)| {
                cell.ok_or_else(|| {
                    ForecastError::InvalidInputError(format!(
                        "Column '{}' has a missing or non-numeric value at row {}",
                        name, row
                    ))
                })
            })
            .collect()
    }
}

/// Loader for price tables written by the acquisition layer
#[derive(Debug)]
pub struct DataLoader;

impl DataLoader {
    /// Load a price table from a CSV file with a header row
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<DataFrame> {
        let file = File::open(path.as_ref())?;
        let df = CsvReader::new(file)
            .infer_schema(Some(100))
            .has_header(true)
            .finish()?;

        tracing::debug!(
            path = %path.as_ref().display(),
            rows = df.height(),
            columns = df.width(),
            "loaded price table"
        );
        Ok(df)
    }

    /// Conventional location of a ticker's table: `<dir>/<TICKER>.csv`
    pub fn ticker_path<P: AsRef<Path>>(dir: P, ticker: &str) -> PathBuf {
        dir.as_ref()
            .join(format!("{}.csv", ticker.trim().to_uppercase()))
    }

    /// Load and prepare a ticker's table in one step
    pub fn load_ticker<P: AsRef<Path>>(
        dir: P,
        ticker: &str,
        preparer: &SeriesPreparer,
    ) -> Result<PreparedSeries> {
        let df = Self::from_csv(Self::ticker_path(dir, ticker))?;
        preparer.prepare(&df)
    }
}
