//! Prepare-then-select entry point for the presentation layer

use crate::config::ForecastConfig;
use crate::data::{DataLoader, SeriesPreparer};
use crate::error::Result;
use crate::models::{AutoArimaForecaster, Forecaster, SeasonalForecaster};
use crate::selector::{ForecastSelector, SelectionOutcome};
use polars::prelude::DataFrame;
use std::path::Path;

/// A configured forecast run over one price table
#[derive(Debug)]
pub struct ForecastPipeline<S = SeasonalForecaster, A = AutoArimaForecaster> {
    config: ForecastConfig,
    preparer: SeriesPreparer,
    selector: ForecastSelector<S, A>,
}

impl ForecastPipeline {
    /// Build the preparer and both forecasters from `config`
    pub fn new(config: ForecastConfig) -> Result<Self> {
        config.validate()?;
        let selector = ForecastSelector::new(
            SeasonalForecaster::new(config.seasonal.clone())?,
            AutoArimaForecaster::new(config.auto_arima.clone())?,
        );
        Ok(Self::with_selector(config, selector))
    }
}

impl<S, A> ForecastPipeline<S, A>
where
    S: Forecaster + 'static,
    A: Forecaster + 'static,
{
    /// Use `selector` as given; its timeout and parallelism are taken from `config`
    pub fn with_selector(config: ForecastConfig, selector: ForecastSelector<S, A>) -> Self {
        let preparer = SeriesPreparer::new(config.date_column.clone(), config.value_column.clone());
        let selector = selector
            .with_fit_timeout(config.fit_timeout())
            .with_parallel(config.parallel);
        Self {
            config,
            preparer,
            selector,
        }
    }

    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }

    pub fn preparer(&self) -> &SeriesPreparer {
        &self.preparer
    }

    /// Prepare `df` and select a forecast with the configured horizon and mode
    pub fn run(&self, df: &DataFrame) -> Result<SelectionOutcome> {
        let series = self.preparer.prepare(df)?;
        tracing::info!(
            observations = series.len(),
            first = %series.first_timestamp(),
            last = %series.last_timestamp(),
            "prepared price series"
        );
        self.selector
            .select(&series, self.config.horizon_days, self.config.mode)
    }

    /// Load a CSV price table and run on it
    pub fn run_csv<P: AsRef<Path>>(&self, path: P) -> Result<SelectionOutcome> {
        let df = DataLoader::from_csv(path)?;
        self.run(&df)
    }
}
