//! Forecasting models and the shared result types

use crate::data::PreparedSeries;
use crate::error::{ForecastError, Result};
use crate::scoring::{self, ErrorMetrics};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::{self, Debug};

pub mod arima;
pub mod auto_arima;
pub mod seasonal;

pub use arima::{ArimaModel, ArimaParams, FittedArima};
pub use auto_arima::{AutoArimaConfig, AutoArimaForecaster, InformationCriterion};
pub use seasonal::{
    FittedSeasonalModel, HolidayConfig, SeasonalConfig, SeasonalForecaster, SeasonalParams,
    SeasonalityComponent,
};

/// The two competing model families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ModelFamily {
    Seasonal,
    AutoRegressive,
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelFamily::Seasonal => write!(f, "Seasonal"),
            ModelFamily::AutoRegressive => write!(f, "AutoRegressive"),
        }
    }
}

/// One row of model output.
///
/// `None` bounds mean the model has no native uncertainty estimate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ForecastPoint {
    pub timestamp: NaiveDate,
    pub yhat: f64,
    pub yhat_lower: Option<f64>,
    pub yhat_upper: Option<f64>,
}

impl ForecastPoint {
    /// Point estimate without bounds
    pub fn point(timestamp: NaiveDate, yhat: f64) -> Self {
        Self {
            timestamp,
            yhat,
            yhat_lower: None,
            yhat_upper: None,
        }
    }

    pub fn has_bounds(&self) -> bool {
        self.yhat_lower.is_some() && self.yhat_upper.is_some()
    }
}

/// Fitted parameters, tagged by model family
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind")]
pub enum ModelParams {
    Seasonal(SeasonalParams),
    AutoRegressive(ArimaParams),
}

impl ModelParams {
    pub fn family(&self) -> ModelFamily {
        match self {
            ModelParams::Seasonal(_) => ModelFamily::Seasonal,
            ModelParams::AutoRegressive(_) => ModelFamily::AutoRegressive,
        }
    }

    /// Flatten into a name → value mapping for display
    pub fn to_map(&self) -> BTreeMap<String, serde_json::Value> {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => map.into_iter().collect(),
            _ => BTreeMap::new(),
        }
    }
}

/// Raw output of a forecaster, before it is scored
#[derive(Debug, Clone)]
pub struct ModelFit {
    /// Points reported by the model (history and/or future, per family)
    pub points: Vec<ForecastPoint>,
    pub params: ModelParams,
    /// Fitted values aligned positionally with the training series
    pub in_sample: Vec<f64>,
}

/// A scored model run
#[derive(Debug, Clone, Serialize)]
pub struct ForecastResult {
    family: ModelFamily,
    points: Vec<ForecastPoint>,
    params: ModelParams,
    mae: f64,
    rmse: f64,
}

impl ForecastResult {
    /// Score `fit` against the observed values it was trained on
    pub fn from_fit(family: ModelFamily, fit: ModelFit, actual: &[f64]) -> Result<Self> {
        let metrics = scoring::score(actual, &fit.in_sample)?;
        Ok(Self {
            family,
            points: fit.points,
            params: fit.params,
            mae: metrics.mae,
            rmse: metrics.rmse,
        })
    }

    pub fn family(&self) -> ModelFamily {
        self.family
    }

    pub fn points(&self) -> &[ForecastPoint] {
        &self.points
    }

    pub fn params(&self) -> &ModelParams {
        &self.params
    }

    pub fn mae(&self) -> f64 {
        self.mae
    }

    pub fn rmse(&self) -> f64 {
        self.rmse
    }

    pub fn metrics(&self) -> ErrorMetrics {
        ErrorMetrics {
            mae: self.mae,
            rmse: self.rmse,
        }
    }

    /// Points strictly after `date`
    pub fn points_after(&self, date: NaiveDate) -> impl Iterator<Item = &ForecastPoint> {
        self.points.iter().filter(move |p| p.timestamp > date)
    }
}

/// Trained forecast model
pub trait TrainedForecastModel: Debug {
    /// Points for the model's reporting window, extended `horizon` days past the history
    fn forecast(&self, horizon: usize) -> Result<Vec<ForecastPoint>>;

    /// Fitted values over the training history
    fn in_sample(&self) -> Vec<f64>;

    /// Parameters describing the fit
    fn params(&self) -> ModelParams;
}

/// Forecast model that can be trained on a prepared series
pub trait ForecastModel: Debug + Clone {
    /// The type of trained model produced
    type Trained: TrainedForecastModel;

    /// Train the model on the full history
    fn train(&self, series: &PreparedSeries) -> Result<Self::Trained>;

    /// Get the name of the model
    fn name(&self) -> &str;
}

/// Object-safe entry point used by the selector.
///
/// Implementors only provide [`Forecaster::fit_model`]; scoring against the
/// history is shared.
pub trait Forecaster: Send + Sync {
    fn family(&self) -> ModelFamily;

    /// Fit on `series` and forecast `horizon` days ahead, unscored
    fn fit_model(&self, series: &PreparedSeries, horizon: usize) -> Result<ModelFit>;

    /// Fit, forecast, and score in-sample predictions against `series`
    fn fit(&self, series: &PreparedSeries, horizon: usize) -> Result<ForecastResult> {
        let fit = self.fit_model(series, horizon)?;
        ForecastResult::from_fit(self.family(), fit, &series.values())
    }
}

/// Reject a zero horizon
pub fn check_horizon(horizon: usize) -> Result<()> {
    if horizon == 0 {
        return Err(ForecastError::InvalidHorizonError(
            "horizon must be a positive number of days, got 0".to_string(),
        ));
    }
    Ok(())
}

/// Train `model`, then collect its forecast, in-sample fit and parameters
pub fn fit_with<M: ForecastModel>(
    model: &M,
    series: &PreparedSeries,
    horizon: usize,
) -> Result<ModelFit> {
    check_horizon(horizon)?;
    let trained = model.train(series)?;
    Ok(ModelFit {
        points: trained.forecast(horizon)?,
        params: trained.params(),
        in_sample: trained.in_sample(),
    })
}
