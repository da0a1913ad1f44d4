//! Additive trend plus seasonality model with changepoints
//!
//! The trend is piecewise linear with potential changepoints spread over the
//! early part of the history. Yearly, weekly and (optionally) daily cycles are
//! Fourier series on the calendar, and holidays enter as indicator columns.
//! Everything is estimated jointly as a penalised least-squares problem whose
//! penalties are the Gaussian priors on each coefficient group.

use crate::data::PreparedSeries;
use crate::error::{ForecastError, Result};
use crate::models::{
    fit_with, ForecastModel, ForecastPoint, Forecaster, ModelFamily, ModelFit, ModelParams,
    TrainedForecastModel,
};
use crate::utils::linalg::{dot, ridge_solve};
use crate::utils::{epoch_days, future_dates, percentile};
use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal, Poisson};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Prior scale on the base growth rate and offset
const TREND_PRIOR_SCALE: f64 = 5.0;
/// Passes re-estimating the noise scale between penalised solves
const NOISE_PASSES: usize = 3;
/// Lower bound on the noise variance in scaled units
const MIN_NOISE_VARIANCE: f64 = 1e-6;

/// Named dates whose effect is estimated separately
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HolidayConfig {
    pub name: String,
    pub dates: Vec<NaiveDate>,
}

/// A Fourier-series seasonal cycle
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeasonalityComponent {
    pub name: String,
    /// Period in days
    pub period: f64,
    pub fourier_order: usize,
    pub prior_scale: f64,
}

impl SeasonalityComponent {
    fn features(&self, day: f64, row: &mut Vec<f64>) {
        for i in 1..=self.fourier_order {
            let angle = 2.0 * PI * i as f64 * day / self.period;
            row.push(angle.sin());
            row.push(angle.cos());
        }
    }
}

/// Hyperparameters of [`SeasonalForecaster`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeasonalConfig {
    pub yearly_seasonality: bool,
    pub yearly_order: usize,
    pub weekly_seasonality: bool,
    pub weekly_order: usize,
    pub daily_seasonality: bool,
    pub daily_order: usize,
    /// Flexibility of the trend at each changepoint
    pub changepoint_prior_scale: f64,
    pub n_changepoints: usize,
    /// Share of the history in which changepoints may be placed
    pub changepoint_range: f64,
    pub seasonality_prior_scale: f64,
    pub holidays_prior_scale: f64,
    /// Coverage of the uncertainty interval
    pub interval_width: f64,
    pub uncertainty_samples: usize,
    pub seed: u64,
    pub holidays: Vec<HolidayConfig>,
}

impl Default for SeasonalConfig {
    fn default() -> Self {
        Self {
            yearly_seasonality: true,
            yearly_order: 10,
            weekly_seasonality: true,
            weekly_order: 3,
            daily_seasonality: false,
            daily_order: 4,
            changepoint_prior_scale: 0.1,
            n_changepoints: 25,
            changepoint_range: 0.8,
            seasonality_prior_scale: 10.0,
            holidays_prior_scale: 10.0,
            interval_width: 0.8,
            uncertainty_samples: 1000,
            seed: 0,
            holidays: Vec::new(),
        }
    }
}

impl SeasonalConfig {
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("changepoint_prior_scale", self.changepoint_prior_scale),
            ("seasonality_prior_scale", self.seasonality_prior_scale),
            ("holidays_prior_scale", self.holidays_prior_scale),
        ];
        if let Some((name, value)) = positive.iter().find(|(_, v)| !(*v > 0.0 && v.is_finite())) {
            return Err(ForecastError::InvalidParameter(format!(
                "seasonal.{} must be positive, got {}",
                name, value
            )));
        }
        if !(self.changepoint_range > 0.0 && self.changepoint_range <= 1.0) {
            return Err(ForecastError::InvalidParameter(format!(
                "seasonal.changepoint_range must be in (0, 1], got {}",
                self.changepoint_range
            )));
        }
        if !(self.interval_width > 0.0 && self.interval_width < 1.0) {
            return Err(ForecastError::InvalidParameter(format!(
                "seasonal.interval_width must be in (0, 1), got {}",
                self.interval_width
            )));
        }
        if self.uncertainty_samples == 0 {
            return Err(ForecastError::InvalidParameter(
                "seasonal.uncertainty_samples must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Enabled seasonal cycles
    pub fn components(&self) -> Vec<SeasonalityComponent> {
        let candidates = [
            ("yearly", self.yearly_seasonality, 365.25, self.yearly_order),
            ("weekly", self.weekly_seasonality, 7.0, self.weekly_order),
            ("daily", self.daily_seasonality, 1.0, self.daily_order),
        ];
        candidates
            .into_iter()
            .filter(|(_, enabled, _, order)| *enabled && *order > 0)
            .map(|(name, _, period, fourier_order)| SeasonalityComponent {
                name: name.to_string(),
                period,
                fourier_order,
                prior_scale: self.seasonality_prior_scale,
            })
            .collect()
    }
}

/// Parameters reported for a fitted seasonal model
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeasonalParams {
    pub seasonalities: Vec<SeasonalityComponent>,
    pub changepoint_prior_scale: f64,
    /// Changepoints actually placed (fewer than configured on short histories)
    pub n_changepoints: usize,
    pub changepoint_range: f64,
    pub holidays: Vec<String>,
    pub holidays_prior_scale: f64,
    pub interval_width: f64,
    pub growth_rate: f64,
}

/// Trend plus seasonality forecaster with uncertainty intervals
#[derive(Debug, Clone, Default)]
pub struct SeasonalForecaster {
    config: SeasonalConfig,
}

impl SeasonalForecaster {
    pub fn new(config: SeasonalConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SeasonalConfig {
        &self.config
    }
}

/// Trained seasonal model, in scaled units internally
#[derive(Debug, Clone)]
pub struct FittedSeasonalModel {
    config: SeasonalConfig,
    components: Vec<SeasonalityComponent>,
    timestamps: Vec<NaiveDate>,
    /// Epoch day of the first observation
    start: f64,
    /// Days between first and last observation
    span: f64,
    y_scale: f64,
    changepoints: Vec<f64>,
    /// Coefficients: offset, growth, changepoint deltas, then features
    coefficients: Vec<f64>,
    sigma: f64,
    in_sample: Vec<f64>,
}

/// Scaled changepoint locations taken from the first `range` share of `t`
fn place_changepoints(t: &[f64], requested: usize, range: f64) -> Vec<f64> {
    let hist_size = (t.len() as f64 * range).floor() as usize;
    let count = requested.min(hist_size.saturating_sub(1));
    if count == 0 {
        return Vec::new();
    }
    let last = (hist_size - 1) as f64;
    (1..=count)
        .map(|i| {
            let index = (last * i as f64 / count as f64).round() as usize;
            t[index]
        })
        .collect()
}

impl FittedSeasonalModel {
    fn scaled_time(&self, date: NaiveDate) -> f64 {
        (epoch_days(date) - self.start) / self.span
    }

    fn design_row(&self, date: NaiveDate) -> Vec<f64> {
        design_row(
            date,
            self.scaled_time(date),
            &self.changepoints,
            &self.components,
            &self.config.holidays,
        )
    }

    /// Scaled mean prediction
    fn predict_scaled(&self, date: NaiveDate) -> f64 {
        dot(&self.design_row(date), &self.coefficients)
    }

    pub fn changepoints(&self) -> &[f64] {
        &self.changepoints
    }

    fn deltas(&self) -> &[f64] {
        &self.coefficients[2..2 + self.changepoints.len()]
    }

    /// Quantile bounds from simulated future trend changes plus noise
    fn simulate_bounds(&self, dates: &[NaiveDate], means: &[f64]) -> Result<Vec<(f64, f64)>> {
        let t: Vec<f64> = dates.iter().map(|d| self.scaled_time(*d)).collect();
        let t_max = t.iter().copied().fold(1.0, f64::max);
        let deltas = self.deltas();
        let laplace_scale = if deltas.is_empty() {
            1e-8
        } else {
            deltas.iter().map(|d| d.abs()).sum::<f64>() / deltas.len() as f64 + 1e-8
        };
        let change_rate = deltas.len() as f64 * (t_max - 1.0);

        let noise = Normal::new(0.0, self.sigma)
            .map_err(|e| ForecastError::ModelFitError(format!("noise distribution: {}", e)))?;
        let changes = if change_rate > 0.0 {
            Some(Poisson::new(change_rate).map_err(|e| {
                ForecastError::ModelFitError(format!("changepoint distribution: {}", e))
            })?)
        } else {
            None
        };

        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let samples = self.config.uncertainty_samples;
        let mut draws = vec![Vec::with_capacity(samples); dates.len()];

        for _ in 0..samples {
            let n_new = changes.as_ref().map_or(0, |c| c.sample(&mut rng) as usize);
            let new_changes: Vec<(f64, f64)> = (0..n_new)
                .map(|_| {
                    let location = rng.gen_range(1.0..=t_max);
                    let u: f64 = rng.gen_range(-0.5..0.5);
                    let tail = (1.0 - 2.0 * u.abs()).max(f64::MIN_POSITIVE);
                    let delta = -laplace_scale * u.signum() * tail.ln();
                    (location, delta)
                })
                .collect();

            for (i, (&ti, mean)) in t.iter().zip(means).enumerate() {
                let drift: f64 = new_changes
                    .iter()
                    .map(|(s, delta)| delta * (ti - s).max(0.0))
                    .sum();
                draws[i].push(mean + drift + noise.sample(&mut rng));
            }
        }

        let lower_q = (1.0 - self.config.interval_width) / 2.0;
        let upper_q = (1.0 + self.config.interval_width) / 2.0;
        Ok(draws
            .into_iter()
            .map(|mut d| {
                d.sort_by(|a, b| a.total_cmp(b));
                (percentile(&d, lower_q), percentile(&d, upper_q))
            })
            .collect())
    }
}

fn design_row(
    date: NaiveDate,
    t: f64,
    changepoints: &[f64],
    components: &[SeasonalityComponent],
    holidays: &[HolidayConfig],
) -> Vec<f64> {
    let mut row = Vec::with_capacity(2 + changepoints.len());
    row.push(1.0);
    row.push(t);
    row.extend(changepoints.iter().map(|s| (t - s).max(0.0)));
    let day = epoch_days(date);
    for component in components {
        component.features(day, &mut row);
    }
    row.extend(
        holidays
            .iter()
            .map(|h| if h.dates.contains(&date) { 1.0 } else { 0.0 }),
    );
    row
}

impl ForecastModel for SeasonalForecaster {
    type Trained = FittedSeasonalModel;

    fn train(&self, series: &PreparedSeries) -> Result<FittedSeasonalModel> {
        if series.len() < 2 {
            return Err(ForecastError::ModelFitError(format!(
                "Seasonal model needs at least 2 observations, got {}",
                series.len()
            )));
        }

        let timestamps = series.timestamps();
        let values = series.values();
        let start = epoch_days(series.first_timestamp());
        let span = epoch_days(series.last_timestamp()) - start;

        let y_scale = values.iter().fold(0.0, |acc: f64, v| acc.max(v.abs()));
        let y_scale = if y_scale > 0.0 { y_scale } else { 1.0 };
        let y: Vec<f64> = values.iter().map(|v| v / y_scale).collect();

        let t: Vec<f64> = timestamps
            .iter()
            .map(|d| (epoch_days(*d) - start) / span)
            .collect();
        let changepoints = place_changepoints(
            &t,
            self.config.n_changepoints,
            self.config.changepoint_range,
        );
        let components = self.config.components();

        let rows: Vec<Vec<f64>> = timestamps
            .iter()
            .zip(&t)
            .map(|(date, ti)| {
                design_row(*date, *ti, &changepoints, &components, &self.config.holidays)
            })
            .collect();

        // Prior scale per column, in the same order as the design row
        let mut prior_scales = vec![TREND_PRIOR_SCALE; 2];
        prior_scales.extend(vec![self.config.changepoint_prior_scale; changepoints.len()]);
        for component in &components {
            prior_scales.extend(vec![component.prior_scale; 2 * component.fourier_order]);
        }
        prior_scales.extend(vec![self.config.holidays_prior_scale; self.config.holidays.len()]);

        let n = y.len() as f64;
        let y_mean = y.iter().sum::<f64>() / n;
        let mut noise_variance =
            (y.iter().map(|v| (v - y_mean).powi(2)).sum::<f64>() / n).max(MIN_NOISE_VARIANCE);
        let mut coefficients = Vec::new();

        for _ in 0..NOISE_PASSES {
            let penalty: Vec<f64> = prior_scales
                .iter()
                .map(|s| noise_variance / (s * s))
                .collect();
            coefficients = ridge_solve(&rows, &y, &penalty).ok_or_else(|| {
                ForecastError::ModelFitError(
                    "Seasonal model normal equations are singular".to_string(),
                )
            })?;
            let rss: f64 = rows
                .iter()
                .zip(&y)
                .map(|(row, target)| (target - dot(row, &coefficients)).powi(2))
                .sum();
            noise_variance = (rss / n).max(MIN_NOISE_VARIANCE);
        }

        let in_sample: Vec<f64> = rows
            .iter()
            .map(|row| dot(row, &coefficients) * y_scale)
            .collect();

        tracing::debug!(
            changepoints = changepoints.len(),
            features = prior_scales.len(),
            sigma = noise_variance.sqrt() * y_scale,
            "fitted seasonal model"
        );

        Ok(FittedSeasonalModel {
            config: self.config.clone(),
            components,
            timestamps,
            start,
            span,
            y_scale,
            changepoints,
            coefficients,
            sigma: noise_variance.sqrt(),
            in_sample,
        })
    }

    fn name(&self) -> &str {
        "Seasonal"
    }
}

impl TrainedForecastModel for FittedSeasonalModel {
    /// History plus `horizon` future days, each with bounds
    fn forecast(&self, horizon: usize) -> Result<Vec<ForecastPoint>> {
        let last = self.timestamps[self.timestamps.len() - 1];
        let mut dates = self.timestamps.clone();
        dates.extend(future_dates(last, horizon));

        let means: Vec<f64> = dates.iter().map(|d| self.predict_scaled(*d)).collect();
        let bounds = self.simulate_bounds(&dates, &means)?;

        Ok(dates
            .into_iter()
            .zip(means)
            .zip(bounds)
            .map(|((timestamp, mean), (lower, upper))| ForecastPoint {
                timestamp,
                yhat: mean * self.y_scale,
                yhat_lower: Some(lower * self.y_scale),
                yhat_upper: Some(upper * self.y_scale),
            })
            .collect())
    }

    fn in_sample(&self) -> Vec<f64> {
        self.in_sample.clone()
    }

    fn params(&self) -> ModelParams {
        ModelParams::Seasonal(SeasonalParams {
            seasonalities: self.components.clone(),
            changepoint_prior_scale: self.config.changepoint_prior_scale,
            n_changepoints: self.changepoints.len(),
            changepoint_range: self.config.changepoint_range,
            holidays: self.config.holidays.iter().map(|h| h.name.clone()).collect(),
            holidays_prior_scale: self.config.holidays_prior_scale,
            interval_width: self.config.interval_width,
            growth_rate: self.coefficients[1] * self.y_scale / self.span,
        })
    }
}

impl Forecaster for SeasonalForecaster {
    fn family(&self) -> ModelFamily {
        ModelFamily::Seasonal
    }

    fn fit_model(&self, series: &PreparedSeries, horizon: usize) -> Result<ModelFit> {
        fit_with(self, series, horizon)
    }
}
