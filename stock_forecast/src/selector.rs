//! Runs the competing forecasters and picks one
//!
//! In Best mode both forecasters are fitted and scored on the same history.
//! The seasonal model is kept only when it is strictly better on both MAE and
//! RMSE; every other outcome, ties included, goes to the autoregressive model.

use crate::data::PreparedSeries;
use crate::error::{ForecastError, Result};
use crate::models::{
    check_horizon, AutoArimaForecaster, ForecastResult, Forecaster, ModelFamily, ModelParams,
    SeasonalForecaster,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Which forecaster(s) to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum SelectionMode {
    Seasonal,
    AutoRegressive,
    #[default]
    Best,
}

impl FromStr for SelectionMode {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "seasonal" | "prophet" => Ok(SelectionMode::Seasonal),
            "autoregressive" | "arima" => Ok(SelectionMode::AutoRegressive),
            "best" => Ok(SelectionMode::Best),
            other => Err(ForecastError::InvalidParameter(format!(
                "unknown selection mode '{}' (expected seasonal, autoregressive or best)",
                other
            ))),
        }
    }
}

impl TryFrom<String> for SelectionMode {
    type Error = ForecastError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl fmt::Display for SelectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionMode::Seasonal => write!(f, "Seasonal"),
            SelectionMode::AutoRegressive => write!(f, "AutoRegressive"),
            SelectionMode::Best => write!(f, "Best"),
        }
    }
}

/// Metrics of one forecaster that took part in a selection
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CandidateScore {
    pub family: ModelFamily,
    pub mae: f64,
    pub rmse: f64,
}

impl From<&ForecastResult> for CandidateScore {
    fn from(result: &ForecastResult) -> Self {
        Self {
            family: result.family(),
            mae: result.mae(),
            rmse: result.rmse(),
        }
    }
}

/// Result of one selection call
#[derive(Debug, Clone, Serialize)]
pub struct SelectionOutcome {
    mode: SelectionMode,
    chosen: ForecastResult,
    candidates: Vec<CandidateScore>,
}

impl SelectionOutcome {
    pub fn mode(&self) -> SelectionMode {
        self.mode
    }

    pub fn chosen(&self) -> &ForecastResult {
        &self.chosen
    }

    pub fn into_chosen(self) -> ForecastResult {
        self.chosen
    }

    /// Every forecaster that ran, in run order
    pub fn candidates(&self) -> &[CandidateScore] {
        &self.candidates
    }

    pub fn chosen_family(&self) -> ModelFamily {
        self.chosen.family()
    }

    pub fn chosen_params(&self) -> &ModelParams {
        self.chosen.params()
    }

    /// Write the chosen forecast as `timestamp,yhat,yhat_lower,yhat_upper` rows
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = csv::Writer::from_path(path.as_ref())?;
        writer.write_record(["timestamp", "yhat", "yhat_lower", "yhat_upper"])?;
        let bound = |b: Option<f64>| b.map(|v| v.to_string()).unwrap_or_default();
        for point in self.chosen.points() {
            writer.write_record([
                point.timestamp.to_string(),
                point.yhat.to_string(),
                bound(point.yhat_lower),
                bound(point.yhat_upper),
            ])?;
        }
        writer.flush()?;
        tracing::debug!(
            path = %path.as_ref().display(),
            rows = self.chosen.points().len(),
            "wrote forecast"
        );
        Ok(())
    }
}

impl fmt::Display for SelectionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Selection mode: {}", self.mode)?;
        writeln!(f, "Chosen model: {}", self.chosen.family())?;
        writeln!(f, "MAE: {:.4}", self.chosen.mae())?;
        writeln!(f, "RMSE: {:.4}", self.chosen.rmse())?;
        if self.candidates.len() > 1 {
            writeln!(f, "Candidates:")?;
            for candidate in &self.candidates {
                writeln!(
                    f,
                    "  {:<15} MAE: {:.4}  RMSE: {:.4}",
                    candidate.family.to_string(),
                    candidate.mae,
                    candidate.rmse
                )?;
            }
        }
        writeln!(f, "Parameters:")?;
        for (name, value) in self.chosen.params().to_map() {
            writeln!(f, "  {}: {}", name, value)?;
        }
        Ok(())
    }
}

/// A fit running on a worker thread
struct PendingFit {
    family: ModelFamily,
    started: Instant,
    receiver: mpsc::Receiver<Result<ForecastResult>>,
}

impl PendingFit {
    fn spawn<F>(forecaster: Arc<F>, series: Arc<PreparedSeries>, horizon: usize) -> Result<Self>
    where
        F: Forecaster + ?Sized + 'static,
    {
        let family = forecaster.family();
        let (sender, receiver) = mpsc::channel();
        thread::Builder::new()
            .name(format!("{}-fit", family).to_lowercase())
            .spawn(move || {
                // The receiver is gone if the caller already timed out
                let _ = sender.send(forecaster.fit(&series, horizon));
            })?;
        Ok(Self {
            family,
            started: Instant::now(),
            receiver,
        })
    }

    fn wait(self, timeout: Option<Duration>) -> Result<ForecastResult> {
        let stopped = |family: ModelFamily| {
            ForecastError::ModelFitError(format!("{} worker stopped without a result", family))
        };
        match timeout {
            Some(limit) => {
                let remaining = limit.saturating_sub(self.started.elapsed());
                match self.receiver.recv_timeout(remaining) {
                    Ok(result) => result,
                    Err(RecvTimeoutError::Timeout) => {
                        tracing::warn!(model = %self.family, ?limit, "fit timed out");
                        Err(ForecastError::FitTimeoutError {
                            model: self.family.to_string(),
                            timeout: limit,
                        })
                    }
                    Err(RecvTimeoutError::Disconnected) => Err(stopped(self.family)),
                }
            }
            None => self.receiver.recv().map_err(|_| stopped(self.family))?,
        }
    }
}

/// Chooses between a seasonal and an autoregressive forecaster.
///
/// Holds no state between calls; the forecasters are injected so that any
/// [`Forecaster`] implementation can take part.
#[derive(Debug)]
pub struct ForecastSelector<S = SeasonalForecaster, A = AutoArimaForecaster> {
    seasonal: Arc<S>,
    autoregressive: Arc<A>,
    fit_timeout: Option<Duration>,
    parallel: bool,
}

impl Default for ForecastSelector {
    fn default() -> Self {
        Self::new(SeasonalForecaster::default(), AutoArimaForecaster::default())
    }
}

impl<S, A> ForecastSelector<S, A>
where
    S: Forecaster + 'static,
    A: Forecaster + 'static,
{
    pub fn new(seasonal: S, autoregressive: A) -> Self {
        Self {
            seasonal: Arc::new(seasonal),
            autoregressive: Arc::new(autoregressive),
            fit_timeout: None,
            parallel: true,
        }
    }

    /// Bound each forecaster's fit; `None` waits indefinitely
    pub fn with_fit_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.fit_timeout = timeout;
        self
    }

    /// Fit both forecasters concurrently in Best mode
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn fit_timeout(&self) -> Option<Duration> {
        self.fit_timeout
    }

    pub fn is_parallel(&self) -> bool {
        self.parallel
    }

    /// Fit the forecaster(s) for `mode` on `series` and pick the result
    pub fn select(
        &self,
        series: &PreparedSeries,
        horizon: usize,
        mode: SelectionMode,
    ) -> Result<SelectionOutcome> {
        check_horizon(horizon)?;
        tracing::info!(%mode, horizon, observations = series.len(), "selecting forecast");

        let outcome = match mode {
            SelectionMode::Seasonal => {
                let result = self.run_one(&self.seasonal, series, horizon)?;
                Self::single(mode, result)
            }
            SelectionMode::AutoRegressive => {
                let result = self.run_one(&self.autoregressive, series, horizon)?;
                Self::single(mode, result)
            }
            SelectionMode::Best => {
                let (seasonal, autoregressive) = self.run_both(series, horizon)?;
                Self::best(seasonal, autoregressive)
            }
        };

        tracing::info!(
            chosen = %outcome.chosen_family(),
            mae = outcome.chosen().mae(),
            rmse = outcome.chosen().rmse(),
            "forecast selected"
        );
        Ok(outcome)
    }

    fn run_one<F>(&self, forecaster: &Arc<F>, series: &PreparedSeries, horizon: usize) -> Result<ForecastResult>
    where
        F: Forecaster + 'static,
    {
        let result = match self.fit_timeout {
            None => forecaster.fit(series, horizon)?,
            Some(_) => PendingFit::spawn(Arc::clone(forecaster), Arc::new(series.clone()), horizon)?
                .wait(self.fit_timeout)?,
        };
        tracing::info!(
            family = %result.family(),
            mae = result.mae(),
            rmse = result.rmse(),
            "scored forecaster"
        );
        Ok(result)
    }

    fn run_both(&self, series: &PreparedSeries, horizon: usize) -> Result<(ForecastResult, ForecastResult)> {
        if !self.parallel {
            let seasonal = self.run_one(&self.seasonal, series, horizon)?;
            let autoregressive = self.run_one(&self.autoregressive, series, horizon)?;
            return Ok((seasonal, autoregressive));
        }

        let shared = Arc::new(series.clone());
        let seasonal = PendingFit::spawn(Arc::clone(&self.seasonal), Arc::clone(&shared), horizon)?;
        let autoregressive = PendingFit::spawn(Arc::clone(&self.autoregressive), shared, horizon)?;

        let seasonal = seasonal.wait(self.fit_timeout)?;
        let autoregressive = autoregressive.wait(self.fit_timeout)?;
        for result in [&seasonal, &autoregressive] {
            tracing::info!(
                family = %result.family(),
                mae = result.mae(),
                rmse = result.rmse(),
                "scored forecaster"
            );
        }
        Ok((seasonal, autoregressive))
    }

    fn single(mode: SelectionMode, result: ForecastResult) -> SelectionOutcome {
        SelectionOutcome {
            mode,
            candidates: vec![CandidateScore::from(&result)],
            chosen: result,
        }
    }

    fn best(seasonal: ForecastResult, autoregressive: ForecastResult) -> SelectionOutcome {
        let candidates = vec![
            CandidateScore::from(&seasonal),
            CandidateScore::from(&autoregressive),
        ];
        let seasonal_wins = seasonal.metrics().beats(&autoregressive.metrics());
        tracing::debug!(
            seasonal = %seasonal.metrics(),
            autoregressive = %autoregressive.metrics(),
            seasonal_wins,
            "compared forecasters"
        );

        SelectionOutcome {
            mode: SelectionMode::Best,
            chosen: if seasonal_wins { seasonal } else { autoregressive },
            candidates,
        }
    }
}
