//! # Stock Forecast Workspace
//!
//! Facade over the [`stock_forecast`] crate for callers that work with
//! ticker symbols and a directory of per-ticker price tables.
//!
//! ## Example
//!
//! ```
//! use stock_forecast_workspace::Ticker;
//!
//! let ticker = Ticker::new(" aapl ", "data");
//! assert_eq!(ticker.symbol(), "AAPL");
//! assert!(ticker.csv_path().ends_with("AAPL.csv"));
//! ```

pub use stock_forecast;

use std::path::{Path, PathBuf};
use stock_forecast::{DataLoader, ForecastConfig, ForecastPipeline, Result, SelectionOutcome};

/// A stock ticker whose price table lives in a data directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticker {
    symbol: String,
    data_dir: PathBuf,
}

impl Ticker {
    /// Creates a ticker; the symbol is trimmed and upper-cased.
    ///
    /// # Examples
    ///
    /// ```
    /// use stock_forecast_workspace::Ticker;
    ///
    /// let ticker = Ticker::new("msft", "/var/prices");
    /// assert_eq!(ticker.symbol(), "MSFT");
    /// ```
    pub fn new<P: AsRef<Path>>(symbol: &str, data_dir: P) -> Self {
        Self {
            symbol: symbol.trim().to_uppercase(),
            data_dir: data_dir.as_ref().to_path_buf(),
        }
    }

    /// Returns the normalised symbol.
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Returns the directory holding the price tables.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Location of this ticker's price table.
    pub fn csv_path(&self) -> PathBuf {
        DataLoader::ticker_path(&self.data_dir, &self.symbol)
    }

    /// Loads the price table and runs a forecast selection on it.
    pub fn forecast(&self, config: ForecastConfig) -> Result<SelectionOutcome> {
        ForecastPipeline::new(config)?.run_csv(self.csv_path())
    }
}
