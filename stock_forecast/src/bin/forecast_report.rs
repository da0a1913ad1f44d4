//! Print a forecast report for one price table.

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use stock_forecast::{ForecastConfig, ForecastPipeline, Result, SelectionMode};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "forecast_report")]
#[command(about = "Fit, score and select a stock price forecast", long_about = None)]
struct Cli {
    /// Price table (CSV with Date and Close columns)
    input: PathBuf,

    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write the chosen forecast here as CSV
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Selection mode (seasonal, autoregressive, best); overrides the config
    #[arg(short, long)]
    mode: Option<SelectionMode>,

    /// Days to forecast; overrides the config
    #[arg(long)]
    horizon: Option<usize>,
}

impl Cli {
    fn forecast_config(&self) -> Result<ForecastConfig> {
        let mut config = match &self.config {
            Some(path) => ForecastConfig::from_json_file(path)?,
            None => ForecastConfig::default(),
        };
        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        if let Some(horizon) = self.horizon {
            config.horizon_days = horizon;
        }
        config.validate()?;
        Ok(config)
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "forecast failed");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let pipeline = ForecastPipeline::new(cli.forecast_config()?)?;
    let outcome = pipeline.run_csv(&cli.input)?;
    print!("{}", outcome);

    if let Some(output) = &cli.output {
        outcome.write_csv(output)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use stock_forecast::ForecastError;

    #[test]
    fn overrides_take_precedence_over_defaults() {
        let cli = Cli::try_parse_from([
            "forecast_report",
            "data/AAPL.csv",
            "--mode",
            "arima",
            "--horizon",
            "30",
            "-o",
            "out.csv",
        ])
        .unwrap();

        assert_eq!(cli.input, PathBuf::from("data/AAPL.csv"));
        assert_eq!(cli.output, Some(PathBuf::from("out.csv")));

        let config = cli.forecast_config().unwrap();
        assert_eq!(config.mode, SelectionMode::AutoRegressive);
        assert_eq!(config.horizon_days, 30);
        assert_eq!(config.value_column, "Close");
    }

    #[test]
    fn zero_horizon_is_rejected() {
        let cli = Cli::try_parse_from(["forecast_report", "prices.csv", "--horizon", "0"]).unwrap();
        assert!(matches!(
            cli.forecast_config(),
            Err(ForecastError::InvalidHorizonError(_))
        ));
    }

    #[test]
    fn unknown_mode_fails_to_parse() {
        assert!(Cli::try_parse_from(["forecast_report", "prices.csv", "--mode", "coin"]).is_err());
        assert!(Cli::try_parse_from(["forecast_report"]).is_err());
    }
}
