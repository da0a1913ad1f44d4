//! Utility functions for the stock_forecast crate

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime};

pub mod linalg;
pub mod optimization;
pub mod stationarity;

/// Days between 0001-01-01 (CE day 1) and 1970-01-01
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Parse a date cell as written by common price feeds.
///
/// Accepts plain `YYYY-MM-DD`, RFC 3339 timestamps, and `YYYY-MM-DD HH:MM:SS`
/// with or without a UTC offset. Timestamps are truncated to their calendar date.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%:z") {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.date());
    }
    None
}

/// Convert a day count since the Unix epoch into a date
pub fn date_from_epoch_days(days: i64) -> Option<NaiveDate> {
    let days = i32::try_from(days).ok()?;
    NaiveDate::from_num_days_from_ce_opt(days.checked_add(UNIX_EPOCH_DAYS_FROM_CE)?)
}

/// Days since the Unix epoch, as used for calendar-aligned Fourier terms
pub fn epoch_days(date: NaiveDate) -> f64 {
    (date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE) as f64
}

/// Create `horizon` consecutive daily dates following `last`
pub fn future_dates(last: NaiveDate, horizon: usize) -> Vec<NaiveDate> {
    (1..=horizon as i64)
        .map(|offset| last + Duration::days(offset))
        .collect()
}

/// Apply `d` rounds of first differencing
pub fn difference(series: &[f64], d: usize) -> Vec<f64> {
    let mut result = series.to_vec();
    for _ in 0..d {
        if result.len() <= 1 {
            return Vec::new();
        }
        result = result.windows(2).map(|w| w[1] - w[0]).collect();
    }
    result
}

/// Undo `d` rounds of differencing for values that continue `original`.
///
/// `future_diffs` are values on the `d`-times differenced scale that follow
/// the end of `original`.
pub fn integrate(future_diffs: &[f64], original: &[f64], d: usize) -> Vec<f64> {
    let mut result = future_diffs.to_vec();
    for level in (0..d).rev() {
        let anchor = difference(original, level).last().copied().unwrap_or(0.0);
        let mut running = anchor;
        result = result
            .iter()
            .map(|step| {
                running += step;
                running
            })
            .collect();
    }
    result
}

/// Check whether every value equals the first one (within a relative tolerance)
pub fn is_constant(values: &[f64]) -> bool {
    match values.first() {
        None => true,
        Some(&first) => {
            let tolerance = 1e-12 * first.abs().max(1.0);
            values.iter().all(|v| (v - first).abs() <= tolerance)
        }
    }
}

/// Linear-interpolated percentile of an ascending slice, `q` in [0, 1]
pub fn percentile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let position = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let weight = position - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * weight
}
