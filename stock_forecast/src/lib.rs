//! # Stock Forecast
//!
//! Forecast selection for a single stock's closing prices.
//!
//! ## Features
//!
//! - Price table preparation from polars `DataFrame`s (CSV loading included)
//! - A seasonal model: piecewise-linear trend with changepoints, yearly and
//!   weekly Fourier seasonality, holidays, and simulated uncertainty bounds
//! - Automatic ARIMA: KPSS-chosen differencing and a stepwise order search
//! - In-sample MAE / RMSE scoring
//! - Selection between the two, with optional concurrent fits and timeouts
//!
//! ## Selection rule
//!
//! In [`SelectionMode::Best`] the seasonal model is chosen only when both its
//! MAE and RMSE are strictly lower than the autoregressive model's. Ties and
//! split decisions go to the autoregressive model.
//!
//! ## Quick Start
//!
//! ```no_run
//! use stock_forecast::{DataLoader, ForecastConfig, ForecastPipeline};
//!
//! let config = ForecastConfig {
//!     horizon_days: 30,
//!     ..ForecastConfig::default()
//! };
//! let pipeline = ForecastPipeline::new(config)?;
//!
//! let prices = DataLoader::from_csv("data/AAPL.csv")?;
//! let outcome = pipeline.run(&prices)?;
//!
//! println!("{}", outcome);
//! outcome.write_csv("forecast.csv")?;
//! # Ok::<(), stock_forecast::ForecastError>(())
//! ```

pub mod config;
pub mod data;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod scoring;
pub mod selector;
pub mod utils;

// Re-export commonly used types
pub use crate::config::ForecastConfig;
pub use crate::data::{DataLoader, PreparedSeries, SeriesPreparer, TimeSeriesPoint};
pub use crate::error::{ForecastError, Result};
pub use crate::models::{
    AutoArimaForecaster, ForecastModel, ForecastPoint, ForecastResult, Forecaster, ModelFamily,
    ModelFit, ModelParams, SeasonalForecaster, TrainedForecastModel,
};
pub use crate::pipeline::ForecastPipeline;
pub use crate::scoring::{score, ErrorMetrics};
pub use crate::selector::{CandidateScore, ForecastSelector, SelectionMode, SelectionOutcome};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
