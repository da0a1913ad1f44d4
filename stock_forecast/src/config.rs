//! Forecast configuration loaded from JSON

use crate::error::{ForecastError, Result};
use crate::models::{AutoArimaConfig, SeasonalConfig};
use crate::selector::SelectionMode;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Default forecast horizon in days
pub const DEFAULT_HORIZON_DAYS: usize = 365;

/// Everything a forecast run needs besides the price table.
///
/// Every field has a default, so `{}` is a valid configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// Days to forecast past the last observation
    pub horizon_days: usize,
    pub mode: SelectionMode,
    pub seasonal: SeasonalConfig,
    pub auto_arima: AutoArimaConfig,
    /// Per-forecaster fit budget; unbounded when absent
    pub fit_timeout_secs: Option<u64>,
    /// Fit both forecasters concurrently in Best mode
    pub parallel: bool,
    pub date_column: String,
    pub value_column: String,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            horizon_days: DEFAULT_HORIZON_DAYS,
            mode: SelectionMode::default(),
            seasonal: SeasonalConfig::default(),
            auto_arima: AutoArimaConfig::default(),
            fit_timeout_secs: None,
            parallel: true,
            date_column: "Date".to_string(),
            value_column: "Close".to_string(),
        }
    }
}

impl ForecastConfig {
    /// Parse and validate a JSON document
    pub fn from_json_str(json: &str) -> Result<Self> {
        let raw: serde_json::Value = serde_json::from_str(json)?;
        let object = raw.as_object().ok_or_else(|| {
            ForecastError::ConfigError("configuration must be a JSON object".to_string())
        })?;

        // Checked before deserialising so a negative or fractional horizon is
        // reported as a horizon problem rather than a type error.
        if let Some(horizon) = object.get("horizon_days") {
            match horizon.as_u64() {
                Some(days) if days > 0 => {}
                _ => {
                    return Err(ForecastError::InvalidHorizonError(format!(
                        "horizon_days must be a positive integer, got {}",
                        horizon
                    )))
                }
            }
        }

        let config: ForecastConfig = serde_json::from_value(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = fs::read_to_string(path.as_ref())?;
        tracing::debug!(path = %path.as_ref().display(), "loaded configuration");
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<()> {
        if self.horizon_days == 0 {
            return Err(ForecastError::InvalidHorizonError(
                "horizon_days must be a positive integer, got 0".to_string(),
            ));
        }
        if self.fit_timeout_secs == Some(0) {
            return Err(ForecastError::InvalidParameter(
                "fit_timeout_secs must be positive when set".to_string(),
            ));
        }
        if self.date_column.trim().is_empty() || self.value_column.trim().is_empty() {
            return Err(ForecastError::InvalidParameter(
                "date_column and value_column must be non-empty".to_string(),
            ));
        }
        self.seasonal.validate()?;
        self.auto_arima.validate()
    }

    pub fn fit_timeout(&self) -> Option<Duration> {
        self.fit_timeout_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_gives_defaults() {
        let config = ForecastConfig::from_json_str("{}").unwrap();
        assert_eq!(config, ForecastConfig::default());
        assert_eq!(config.horizon_days, 365);
        assert!(config.fit_timeout().is_none());
    }

    #[test]
    fn non_object_is_a_config_error() {
        assert!(matches!(
            ForecastConfig::from_json_str("[1, 2]"),
            Err(ForecastError::ConfigError(_))
        ));
    }
}
