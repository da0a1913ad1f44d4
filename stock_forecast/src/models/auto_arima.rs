//! Automatic ARIMA order selection

use crate::data::PreparedSeries;
use crate::error::{ForecastError, Result};
use crate::models::arima::{ArimaModel, FittedArima};
use crate::models::{fit_with, ForecastModel, Forecaster, ModelFamily, ModelFit};
use crate::utils::is_constant;
use crate::utils::stationarity::kpss_differencing_order;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Criterion minimised during the order search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum InformationCriterion {
    #[default]
    Aic,
    Bic,
}

impl InformationCriterion {
    fn of(&self, fit: &FittedArima) -> f64 {
        match self {
            InformationCriterion::Aic => fit.aic(),
            InformationCriterion::Bic => fit.bic(),
        }
    }
}

/// Search bounds for [`AutoArimaForecaster`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoArimaConfig {
    pub max_p: usize,
    pub max_q: usize,
    pub max_d: usize,
    /// Upper bound on p + q
    pub max_order: usize,
    /// Upper bound on candidate fits
    pub max_models: usize,
    /// Hyndman-Khandakar neighbourhood search instead of the full grid
    pub stepwise: bool,
    /// Significance level of the KPSS tests choosing d
    pub alpha: f64,
    pub information_criterion: InformationCriterion,
}

impl Default for AutoArimaConfig {
    fn default() -> Self {
        Self {
            max_p: 5,
            max_q: 5,
            max_d: 2,
            max_order: 5,
            max_models: 100,
            stepwise: true,
            alpha: 0.05,
            information_criterion: InformationCriterion::Aic,
        }
    }
}

impl AutoArimaConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.alpha > 0.0 && self.alpha < 1.0) {
            return Err(ForecastError::InvalidParameter(format!(
                "auto_arima.alpha must be in (0, 1), got {}",
                self.alpha
            )));
        }
        if self.max_models == 0 {
            return Err(ForecastError::InvalidParameter(
                "auto_arima.max_models must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Non-seasonal ARIMA with the order chosen by information criterion
#[derive(Debug, Clone, Default)]
pub struct AutoArimaForecaster {
    config: AutoArimaConfig,
}

/// Bookkeeping for one order search
struct OrderSearch<'a> {
    config: &'a AutoArimaConfig,
    values: &'a [f64],
    last_timestamp: NaiveDate,
    d: usize,
    /// Shared conditioning length, which also caps p
    conditioning: usize,
    visited: HashSet<(usize, usize)>,
    evaluated: usize,
    best: Option<(f64, FittedArima)>,
}

impl<'a> OrderSearch<'a> {
    fn exhausted(&self) -> bool {
        self.evaluated >= self.config.max_models
    }

    /// Fit ARIMA(p, d, q) unless it is out of bounds or already tried.
    /// Returns true when it becomes the new best.
    fn consider(&mut self, p: usize, q: usize) -> bool {
        if p > self.conditioning
            || q > self.config.max_q
            || p + q > self.config.max_order
            || self.exhausted()
            || !self.visited.insert((p, q))
        {
            return false;
        }

        let model = ArimaModel::new(p, self.d, q).with_conditioning(self.conditioning);
        if self.values.len() < model.min_observations() {
            return false;
        }
        self.evaluated += 1;

        match model.estimate(self.values, self.last_timestamp) {
            Ok(fit) => {
                let criterion = self.config.information_criterion.of(&fit);
                tracing::debug!(
                    order = ?model.order(),
                    criterion,
                    "evaluated ARIMA candidate"
                );
                let improves = criterion.is_finite()
                    && self
                        .best
                        .as_ref()
                        .map_or(true, |(best, _)| criterion < *best);
                if improves {
                    self.best = Some((criterion, fit));
                }
                improves
            }
            Err(err) => {
                tracing::debug!(order = ?model.order(), error = %err, "ARIMA candidate failed");
                false
            }
        }
    }

    fn best_order(&self) -> Option<(usize, usize)> {
        self.best.as_ref().map(|(_, fit)| {
            let (p, _, q) = fit.order();
            (p, q)
        })
    }

    fn stepwise(&mut self) {
        for (p, q) in [(2, 2), (0, 0), (1, 0), (0, 1)] {
            self.consider(p, q);
        }

        while let Some((p, q)) = self.best_order() {
            if self.exhausted() {
                break;
            }
            let neighbours = [
                (p.checked_sub(1), Some(q)),
                (Some(p + 1), Some(q)),
                (Some(p), q.checked_sub(1)),
                (Some(p), Some(q + 1)),
                (p.checked_sub(1), q.checked_sub(1)),
                (Some(p + 1), Some(q + 1)),
                (p.checked_sub(1), Some(q + 1)),
                (Some(p + 1), q.checked_sub(1)),
            ];
            let moved = neighbours
                .into_iter()
                .filter_map(|(p, q)| Some((p?, q?)))
                .any(|(p, q)| self.consider(p, q));
            if !moved {
                break;
            }
        }
    }

    fn exhaustive(&mut self) {
        for p in 0..=self.conditioning {
            for q in 0..=self.config.max_q {
                self.consider(p, q);
            }
        }
    }
}

impl AutoArimaForecaster {
    pub fn new(config: AutoArimaConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &AutoArimaConfig {
        &self.config
    }

    /// Choose d by KPSS, search (p, q), and return the best fit on the full history
    pub fn select_model(&self, values: &[f64], last_timestamp: NaiveDate) -> Result<FittedArima> {
        if values.len() < 2 {
            return Err(ForecastError::ModelFitError(format!(
                "ARIMA needs at least 2 observations, got {}",
                values.len()
            )));
        }
        if is_constant(values) {
            return Err(ForecastError::ModelFitError(
                "series is constant; no ARIMA order can be identified".to_string(),
            ));
        }

        let d = kpss_differencing_order(values, self.config.alpha, self.config.max_d);
        // Every candidate skips the same leading values, leaving room for MA terms
        let conditioning = self
            .config
            .max_p
            .min(values.len().saturating_sub(d + 3) / 2);
        let mut search = OrderSearch {
            config: &self.config,
            values,
            last_timestamp,
            d,
            conditioning,
            visited: HashSet::new(),
            evaluated: 0,
            best: None,
        };

        if self.config.stepwise {
            search.stepwise();
        } else {
            search.exhaustive();
        }

        let evaluated = search.evaluated;
        let (criterion, mut fit) = search.best.ok_or_else(|| {
            ForecastError::ModelFitError(format!(
                "no ARIMA candidate with d = {} could be fitted to {} observations",
                d,
                values.len()
            ))
        })?;
        fit.set_models_evaluated(evaluated);

        tracing::info!(
            order = ?fit.order(),
            criterion,
            models_evaluated = evaluated,
            "selected ARIMA order"
        );
        Ok(fit)
    }
}

impl ForecastModel for AutoArimaForecaster {
    type Trained = FittedArima;

    fn train(&self, series: &PreparedSeries) -> Result<FittedArima> {
        self.select_model(&series.values(), series.last_timestamp())
    }

    fn name(&self) -> &str {
        "AutoARIMA"
    }
}

impl Forecaster for AutoArimaForecaster {
    fn family(&self) -> ModelFamily {
        ModelFamily::AutoRegressive
    }

    fn fit_model(&self, series: &PreparedSeries, horizon: usize) -> Result<ModelFit> {
        fit_with(self, series, horizon)
    }
}
