//! In-sample error metrics used to compare forecasters

use crate::error::{ForecastError, Result};
use serde::Serialize;
use std::fmt;

/// Mean absolute and root-mean-squared error of a fit
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ErrorMetrics {
    /// Mean Absolute Error
    pub mae: f64,
    /// Root Mean Squared Error
    pub rmse: f64,
}

impl ErrorMetrics {
    /// Strictly lower on both metrics.
    ///
    /// Winning one metric and losing (or tying) the other is not a win, and
    /// any NaN comparison is false.
    pub fn beats(&self, other: &ErrorMetrics) -> bool {
        self.mae < other.mae && self.rmse < other.rmse
    }
}

impl fmt::Display for ErrorMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MAE: {:.4}, RMSE: {:.4}", self.mae, self.rmse)
    }
}

/// Compare positionally aligned `actual` and `predicted` values
pub fn score(actual: &[f64], predicted: &[f64]) -> Result<ErrorMetrics> {
    if actual.len() != predicted.len() || actual.is_empty() {
        return Err(ForecastError::MisalignedSeriesError {
            actual: actual.len(),
            predicted: predicted.len(),
        });
    }

    let n = actual.len() as f64;
    let (abs_sum, sq_sum) = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| a - p)
        .fold((0.0, 0.0), |(abs_sum, sq_sum), e| {
            (abs_sum + e.abs(), sq_sum + e * e)
        });

    Ok(ErrorMetrics {
        mae: abs_sum / n,
        rmse: (sq_sum / n).sqrt(),
    })
}
