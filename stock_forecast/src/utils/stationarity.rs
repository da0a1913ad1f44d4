//! KPSS stationarity test and the differencing order it implies.

use crate::utils::{difference, is_constant};
use statrs::statistics::Statistics;

/// KPSS critical values for level stationarity with their tail probabilities
const KPSS_TABLE: [(f64, f64); 4] = [(0.347, 0.10), (0.463, 0.05), (0.574, 0.025), (0.739, 0.01)];

/// Result of a KPSS level-stationarity test
#[derive(Debug, Clone, Copy)]
pub struct KpssResult {
    /// Test statistic
    pub statistic: f64,
    /// p-value interpolated from the critical-value table, clipped to [0.01, 0.10]
    pub p_value: f64,
    /// Bartlett window length used for the long-run variance
    pub lags: usize,
}

impl KpssResult {
    /// Null of stationarity is kept at significance `alpha`
    pub fn is_stationary(&self, alpha: f64) -> bool {
        self.p_value >= alpha
    }
}

/// KPSS test with the null hypothesis that `series` is level-stationary.
///
/// Series shorter than 4 points, or with zero long-run variance, are reported
/// as stationary since there is nothing to difference away.
pub fn kpss_test(series: &[f64]) -> KpssResult {
    let n = series.len();
    if n < 4 {
        return KpssResult {
            statistic: 0.0,
            p_value: 0.10,
            lags: 0,
        };
    }

    let lags = ((3.0 * (n as f64).sqrt() / 13.0).trunc() as usize).min(n - 1);
    let mean = series.iter().mean();
    let residuals: Vec<f64> = series.iter().map(|x| x - mean).collect();

    let mut partial = 0.0;
    let eta: f64 = residuals
        .iter()
        .map(|r| {
            partial += r;
            partial * partial
        })
        .sum::<f64>()
        / (n * n) as f64;

    let mut long_run = residuals.iter().map(|r| r * r).sum::<f64>() / n as f64;
    for lag in 1..=lags {
        let weight = 1.0 - lag as f64 / (lags + 1) as f64;
        let autocov = residuals[lag..]
            .iter()
            .zip(&residuals)
            .map(|(a, b)| a * b)
            .sum::<f64>()
            / n as f64;
        long_run += 2.0 * weight * autocov;
    }

    if long_run <= 0.0 || !long_run.is_finite() {
        return KpssResult {
            statistic: 0.0,
            p_value: 0.10,
            lags,
        };
    }

    let statistic = eta / long_run;
    KpssResult {
        statistic,
        p_value: kpss_p_value(statistic),
        lags,
    }
}

fn kpss_p_value(statistic: f64) -> f64 {
    let (first_cv, first_p) = KPSS_TABLE[0];
    if statistic <= first_cv {
        return first_p;
    }
    for pair in KPSS_TABLE.windows(2) {
        let (lo_cv, lo_p) = pair[0];
        let (hi_cv, hi_p) = pair[1];
        if statistic <= hi_cv {
            let weight = (statistic - lo_cv) / (hi_cv - lo_cv);
            return lo_p + weight * (hi_p - lo_p);
        }
    }
    KPSS_TABLE[KPSS_TABLE.len() - 1].1
}

/// Number of first differences needed before KPSS stops rejecting stationarity
pub fn kpss_differencing_order(series: &[f64], alpha: f64, max_d: usize) -> usize {
    let mut current = series.to_vec();
    let mut d = 0;
    while d < max_d && !is_constant(&current) && !kpss_test(&current).is_stationary(alpha) {
        current = difference(&current, 1);
        d += 1;
        if current.len() < 4 {
            break;
        }
    }
    d
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alternating(n: usize) -> Vec<f64> {
        (0..n).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect()
    }

    #[test]
    fn alternating_series_is_stationary() {
        let result = kpss_test(&alternating(100));
        assert!(result.is_stationary(0.05));
    }

    #[test]
    fn trending_series_is_not_stationary() {
        let trend: Vec<f64> = (0..100).map(|i| i as f64 * 0.5).collect();
        let result = kpss_test(&trend);
        assert!(!result.is_stationary(0.05));
        assert!(result.p_value <= 0.01 + 1e-12);
    }

    #[test]
    fn trend_needs_one_difference() {
        let series: Vec<f64> = (0..100)
            .map(|i| 100.0 + 0.5 * i as f64 + if i % 2 == 0 { 1.0 } else { -1.0 })
            .collect();
        assert_eq!(kpss_differencing_order(&series, 0.05, 2), 1);
    }

    #[test]
    fn stationary_series_needs_no_difference() {
        assert_eq!(kpss_differencing_order(&alternating(60), 0.05, 2), 0);
    }

    #[test]
    fn short_series_reports_stationary() {
        assert!(kpss_test(&[1.0, 2.0]).is_stationary(0.05));
    }
}
