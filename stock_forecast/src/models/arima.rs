//! ARIMA models for time series forecasting

use crate::data::PreparedSeries;
use crate::error::{ForecastError, Result};
use crate::models::{ForecastModel, ForecastPoint, ModelParams, TrainedForecastModel};
use crate::utils::optimization::{nelder_mead, SimplexOptions};
use crate::utils::{difference, future_dates, integrate};
use chrono::NaiveDate;
use serde::Serialize;
use statrs::statistics::Statistics;
use std::f64::consts::PI;

/// Parameters reported for a fitted ARIMA model
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArimaParams {
    /// (p, d, q)
    pub order: (usize, usize, usize),
    /// Whether a mean (d = 0) or drift (d = 1) term was estimated
    pub with_intercept: bool,
    pub intercept: f64,
    pub ar_coefficients: Vec<f64>,
    pub ma_coefficients: Vec<f64>,
    pub sigma2: f64,
    pub aic: f64,
    pub bic: f64,
    /// Candidate orders fitted during automatic selection (1 for a fixed order)
    pub models_evaluated: usize,
}

/// ARIMA model (AutoRegressive Integrated Moving Average) of fixed order
#[derive(Debug, Clone)]
pub struct ArimaModel {
    /// Name of the model
    name: String,
    /// AR order (p)
    p: usize,
    /// Differencing order (d)
    d: usize,
    /// MA order (q)
    q: usize,
    /// Estimate a mean/drift term on the differenced scale
    with_intercept: bool,
    /// Leading differenced values excluded from the sum of squares (at least `p`)
    conditioning: usize,
}

/// Trained ARIMA model
#[derive(Debug, Clone)]
pub struct FittedArima {
    name: String,
    p: usize,
    d: usize,
    q: usize,
    with_intercept: bool,
    /// Mean of the differenced series (zero without intercept)
    mean: f64,
    ar_coefficients: Vec<f64>,
    ma_coefficients: Vec<f64>,
    /// Observed levels
    history: Vec<f64>,
    /// History differenced `d` times
    differenced: Vec<f64>,
    /// One-step residuals on the differenced scale
    residuals: Vec<f64>,
    sigma2: f64,
    aic: f64,
    bic: f64,
    last_timestamp: NaiveDate,
    models_evaluated: usize,
}

impl ArimaModel {
    /// Create a new ARIMA model; an intercept is included when `d <= 1`
    pub fn new(p: usize, d: usize, q: usize) -> Self {
        Self {
            name: format!("ARIMA({},{},{})", p, d, q),
            p,
            d,
            q,
            with_intercept: d <= 1,
            conditioning: p,
        }
    }

    /// Override whether a mean/drift term is estimated
    pub fn with_intercept(mut self, with_intercept: bool) -> Self {
        self.with_intercept = with_intercept;
        self
    }

    /// Condition on the first `lags` differenced values instead of the first `p`.
    ///
    /// Candidates sharing one conditioning length are scored on the same
    /// sample, so their information criteria can be compared.
    pub fn with_conditioning(mut self, lags: usize) -> Self {
        self.conditioning = lags.max(self.p);
        self
    }

    pub fn order(&self) -> (usize, usize, usize) {
        (self.p, self.d, self.q)
    }

    /// Fewest observations this order can be estimated from
    pub fn min_observations(&self) -> usize {
        self.d + self.conditioning + self.q + 3
    }

    /// Conditional sum of squares estimate on the full history
    pub(crate) fn estimate(&self, values: &[f64], last_timestamp: NaiveDate) -> Result<FittedArima> {
        if values.len() < self.min_observations() {
            return Err(ForecastError::ModelFitError(format!(
                "Insufficient data for {}. Need at least {} observations, got {}.",
                self.name,
                self.min_observations(),
                values.len()
            )));
        }

        let differenced = difference(values, self.d);
        let (p, q) = (self.p, self.q);
        let start = self.conditioning;
        let offset = usize::from(self.with_intercept);

        // Estimate on unit-RMS data so the search behaves the same at any price scale
        let rms = (differenced.iter().map(|w| w * w).sum::<f64>() / differenced.len() as f64).sqrt();
        let unit = if rms > 0.0 { rms } else { 1.0 };
        let scaled: Vec<f64> = differenced.iter().map(|w| w / unit).collect();

        let unpack = |x: &[f64]| {
            let mean = if self.with_intercept { x[0] } else { 0.0 };
            let ar = stationary_coefficients(&x[offset..offset + p]);
            let ma: Vec<f64> = stationary_coefficients(&x[offset + p..])
                .into_iter()
                .map(|a| -a)
                .collect();
            (mean, ar, ma)
        };

        let (scaled_mean, ar_coefficients, ma_coefficients) = if p + q == 0 {
            // Closed form: the least-squares mean
            let mean = if self.with_intercept {
                scaled[start..].iter().mean()
            } else {
                0.0
            };
            (mean, Vec::new(), Vec::new())
        } else {
            let mut initial = vec![0.0; offset + p + q];
            if self.with_intercept {
                initial[0] = scaled[start..].iter().mean();
            }
            let options = SimplexOptions {
                max_iter: 200 * (initial.len() + 1),
                tolerance: 1e-10 * scaled.len() as f64,
                ..SimplexOptions::default()
            };
            let optimum = nelder_mead(
                |x| {
                    let (mean, ar, ma) = unpack(x);
                    conditional_residuals(&scaled, start, mean, &ar, &ma).1
                },
                &initial,
                &options,
            );
            unpack(&optimum.point)
        };

        let (scaled_residuals, css) = conditional_residuals(
            &scaled,
            start,
            scaled_mean,
            &ar_coefficients,
            &ma_coefficients,
        );
        if !css.is_finite() {
            return Err(ForecastError::ModelFitError(format!(
                "{} produced a non-finite sum of squares",
                self.name
            )));
        }

        let n_eff = (differenced.len() - start) as f64;
        let sigma2 = (css / n_eff).max(f64::EPSILON) * unit * unit;
        let log_likelihood = -0.5 * n_eff * ((2.0 * PI * sigma2).ln() + 1.0);
        let k = (p + q + offset + 1) as f64;
        let mean = scaled_mean * unit;
        let residuals: Vec<f64> = scaled_residuals.iter().map(|e| e * unit).collect();

        Ok(FittedArima {
            name: self.name.clone(),
            p,
            d: self.d,
            q,
            with_intercept: self.with_intercept,
            mean,
            ar_coefficients,
            ma_coefficients,
            history: values.to_vec(),
            differenced,
            residuals,
            sigma2,
            aic: -2.0 * log_likelihood + 2.0 * k,
            bic: -2.0 * log_likelihood + k * n_eff.ln(),
            last_timestamp,
            models_evaluated: 1,
        })
    }
}

impl ForecastModel for ArimaModel {
    type Trained = FittedArima;

    fn train(&self, series: &PreparedSeries) -> Result<FittedArima> {
        self.estimate(&series.values(), series.last_timestamp())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl FittedArima {
    pub fn order(&self) -> (usize, usize, usize) {
        (self.p, self.d, self.q)
    }

    pub fn aic(&self) -> f64 {
        self.aic
    }

    pub fn bic(&self) -> f64 {
        self.bic
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ar_coefficients(&self) -> &[f64] {
        &self.ar_coefficients
    }

    pub fn ma_coefficients(&self) -> &[f64] {
        &self.ma_coefficients
    }

    pub(crate) fn set_models_evaluated(&mut self, count: usize) {
        self.models_evaluated = count;
    }

    /// Point forecasts on the level scale for the next `horizon` steps
    pub fn forecast_values(&self, horizon: usize) -> Vec<f64> {
        let mut extended = self.differenced.clone();
        let mut shocks = self.residuals.clone();

        for _ in 0..horizon {
            let t = extended.len();
            let next = one_step(
                &extended,
                &shocks,
                t,
                self.mean,
                &self.ar_coefficients,
                &self.ma_coefficients,
            );
            extended.push(next);
            shocks.push(0.0);
        }

        integrate(&extended[self.differenced.len()..], &self.history, self.d)
    }
}

impl TrainedForecastModel for FittedArima {
    fn forecast(&self, horizon: usize) -> Result<Vec<ForecastPoint>> {
        Ok(future_dates(self.last_timestamp, horizon)
            .into_iter()
            .zip(self.forecast_values(horizon))
            .map(|(date, yhat)| ForecastPoint::point(date, yhat))
            .collect())
    }

    /// One-step-ahead predictions on the level scale.
    ///
    /// The first `d` observations have no prior level and the conditioning
    /// window of differenced values is not predicted; both carry the observed value.
    fn in_sample(&self) -> Vec<f64> {
        self.history
            .iter()
            .enumerate()
            .map(|(t, &y)| {
                if t < self.d {
                    y
                } else {
                    y - self.residuals[t - self.d]
                }
            })
            .collect()
    }

    fn params(&self) -> ModelParams {
        ModelParams::AutoRegressive(ArimaParams {
            order: self.order(),
            with_intercept: self.with_intercept,
            intercept: self.mean,
            ar_coefficients: self.ar_coefficients.clone(),
            ma_coefficients: self.ma_coefficients.clone(),
            sigma2: self.sigma2,
            aic: self.aic,
            bic: self.bic,
            models_evaluated: self.models_evaluated,
        })
    }
}

/// Map unconstrained values to coefficients of a stationary AR polynomial.
///
/// Each value is squashed into (-1, 1) as a partial autocorrelation and the
/// Durbin-Levinson recursion turns those into polynomial coefficients.
fn stationary_coefficients(raw: &[f64]) -> Vec<f64> {
    let mut coefs: Vec<f64> = Vec::with_capacity(raw.len());
    for (k, value) in raw.iter().enumerate() {
        let partial = value.tanh();
        let previous = coefs.clone();
        for j in 0..k {
            coefs[j] = previous[j] - partial * previous[k - 1 - j];
        }
        coefs.push(partial);
    }
    coefs
}

/// Prediction for position `t` given values and shocks before it
fn one_step(values: &[f64], shocks: &[f64], t: usize, mean: f64, ar: &[f64], ma: &[f64]) -> f64 {
    let ar_part: f64 = ar
        .iter()
        .enumerate()
        .filter(|(i, _)| *i < t)
        .map(|(i, phi)| phi * (values[t - 1 - i] - mean))
        .sum();
    let ma_part: f64 = ma
        .iter()
        .enumerate()
        .filter(|(j, _)| *j < t)
        .map(|(j, theta)| theta * shocks[t - 1 - j])
        .sum();
    mean + ar_part + ma_part
}

/// Residuals and conditional sum of squares over `values[start..]`
fn conditional_residuals(
    values: &[f64],
    start: usize,
    mean: f64,
    ar: &[f64],
    ma: &[f64],
) -> (Vec<f64>, f64) {
    let mut residuals = vec![0.0; values.len()];
    let mut css = 0.0;

    for t in start..values.len() {
        let error = values[t] - one_step(values, &residuals, t, mean, ar, ma);
        residuals[t] = error;
        css += error * error;
    }

    (residuals, css)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn stationary_mapping_stays_inside_unit_circle() {
        let coefs = stationary_coefficients(&[0.0]);
        assert_relative_eq!(coefs[0], 0.0);

        let coefs = stationary_coefficients(&[50.0]);
        assert!(coefs[0] < 1.0 && coefs[0] > 0.99);

        // AR(2) with both partials at 0.5: phi1 = 0.25, phi2 = 0.5
        let half = 0.5f64.atanh();
        let coefs = stationary_coefficients(&[half, half]);
        assert_relative_eq!(coefs[0], 0.25, epsilon = 1e-12);
        assert_relative_eq!(coefs[1], 0.5, epsilon = 1e-12);
    }

    #[test]
    fn shared_conditioning_sets_the_sample() {
        let model = ArimaModel::new(0, 1, 0).with_conditioning(3);
        assert_eq!(model.min_observations(), 7);
        // Never below p
        assert_eq!(ArimaModel::new(4, 0, 0).with_conditioning(2).min_observations(), 7);

        let values: Vec<f64> = (0..12).map(|i| 10.0 + (i * i) as f64).collect();
        let day = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        let fit = model.estimate(&values, day).unwrap();
        let fitted = fit.in_sample();
        assert_eq!(&fitted[..4], &values[..4]);
        assert!(fit.residuals[..3].iter().all(|r| *r == 0.0));
    }

    #[test]
    fn residuals_vanish_for_exact_ar_process() {
        let mut values = vec![1.0];
        for t in 1..20 {
            values.push(0.5 * values[t - 1]);
        }
        let (residuals, css) = conditional_residuals(&values, 1, 0.0, &[0.5], &[]);
        assert_relative_eq!(css, 0.0, epsilon = 1e-20);
        assert_eq!(residuals.len(), values.len());
    }
}
