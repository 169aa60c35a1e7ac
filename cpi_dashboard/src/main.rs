//! # cpi-dashboard
//!
//! Command-line front end: loads the CPI history, runs every configured
//! strategy for every horizon and prints the resulting tables.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use cpi_forecast::config::{DashboardConfig, StrategyConfig};
use cpi_forecast::export::{write_report_json, write_tables};
use cpi_forecast::models::auto_arima::AutoArimaConfig;
use cpi_forecast::models::nhits::NHitsConfig;
use cpi_forecast::run_dashboard;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod render;

#[derive(Parser, Debug)]
#[command(name = "cpi-dashboard")]
#[command(about = "Monthly CPI forecasts from several strategies", long_about = None, version)]
struct Cli {
    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// CSV file with Date and CPI columns
    #[arg(short, long)]
    data: Option<PathBuf>,

    /// Forecast horizon in months (repeatable)
    #[arg(short = 'H', long = "horizon")]
    horizons: Vec<usize>,

    /// Strategy to run (repeatable)
    #[arg(short, long = "strategy", value_enum)]
    strategies: Vec<StrategyKind>,

    /// Months withheld for a back-test
    #[arg(long)]
    holdout: Option<usize>,

    /// Seed for the neural strategy
    #[arg(long)]
    seed: Option<u64>,

    /// Prediction interval coverage, between 0 and 1
    #[arg(long)]
    confidence: Option<f64>,

    /// Directory for CSV tables and report.json
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Print the report as JSON instead of tables
    #[arg(long)]
    json: bool,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum StrategyKind {
    FixedArima,
    AutoArima,
    Nhits,
}

impl StrategyKind {
    fn default_config(self) -> StrategyConfig {
        match self {
            StrategyKind::FixedArima => StrategyConfig::default(),
            StrategyKind::AutoArima => StrategyConfig::AutoArima(AutoArimaConfig::default()),
            StrategyKind::Nhits => StrategyConfig::Nhits(NHitsConfig::default()),
        }
    }

    fn matches(self, config: &StrategyConfig) -> bool {
        matches!(
            (self, config),
            (StrategyKind::FixedArima, StrategyConfig::FixedArima(_))
                | (StrategyKind::AutoArima, StrategyConfig::AutoArima(_))
                | (StrategyKind::Nhits, StrategyConfig::Nhits(_))
        )
    }
}

impl Cli {
    /// Layer command-line flags over the configuration file
    fn into_config(self) -> Result<DashboardConfig> {
        let mut config = match &self.config {
            Some(path) => DashboardConfig::from_json_file(path)
                .with_context(|| format!("failed to read configuration {}", path.display()))?,
            None => DashboardConfig::default(),
        };

        if let Some(data) = self.data {
            config.data_path = data;
        }
        if !self.horizons.is_empty() {
            config.horizons = self.horizons;
        }
        if !self.strategies.is_empty() {
            // Keep file settings for a requested kind, defaults otherwise
            config.strategies = self
                .strategies
                .iter()
                .map(|kind| {
                    config
                        .strategies
                        .iter()
                        .find(|s| kind.matches(s))
                        .cloned()
                        .unwrap_or_else(|| kind.default_config())
                })
                .collect();
        }
        if let Some(seed) = self.seed {
            config.strategies = config
                .strategies
                .into_iter()
                .map(|s| s.with_seed(seed))
                .collect();
        }
        if self.holdout.is_some() {
            config.holdout_months = self.holdout;
        }
        if let Some(level) = self.confidence {
            config.confidence_level = level;
        }

        config.validate().context("invalid configuration")?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "cpi_dashboard=debug,cpi_forecast=debug"
    } else {
        "cpi_dashboard=info,cpi_forecast=info"
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();

    let json = cli.json;
    let output_dir = cli.output_dir.clone();
    let config = cli.into_config()?;
    info!(
        data = %config.data_path.display(),
        horizons = ?config.horizons,
        strategies = config.strategies.len(),
        "running dashboard"
    );

    let report = run_dashboard(&config)
        .with_context(|| format!("failed to load {}", config.data_path.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render::render_report(&report));
    }

    if let Some(dir) = output_dir {
        let written = write_tables(report.tables(), &dir)
            .with_context(|| format!("failed to write tables to {}", dir.display()))?;
        write_report_json(&report, dir.join("report.json"))?;
        info!(tables = written.len(), dir = %dir.display(), "exported report");
    }

    if report.failures() > 0 {
        info!(failed = report.failures(), "some forecast requests failed");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("cpi-dashboard").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn defaults_without_flags() {
        let config = parse(&[]).into_config().unwrap();
        assert_eq!(config, DashboardConfig::default());
    }

    #[test]
    fn flags_override_defaults() {
        let config = parse(&[
            "--data",
            "prices.csv",
            "-H",
            "6",
            "--strategy",
            "nhits",
            "--strategy",
            "auto-arima",
            "--seed",
            "11",
            "--holdout",
            "12",
        ])
        .into_config()
        .unwrap();

        assert_eq!(config.data_path, PathBuf::from("prices.csv"));
        assert_eq!(config.horizons, vec![6]);
        assert_eq!(config.holdout_months, Some(12));
        assert_eq!(config.strategies.len(), 2);
        assert!(matches!(&config.strategies[0], StrategyConfig::Nhits(c) if c.seed == 11));
        assert!(matches!(config.strategies[1], StrategyConfig::AutoArima(_)));
    }

    #[test]
    fn file_settings_survive_strategy_flag() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dashboard.json");
        std::fs::write(
            &path,
            r#"{"strategies": [{"kind": "fixed_arima", "p": 2, "d": 1, "q": 0}]}"#,
        )
        .unwrap();

        let config = parse(&["--config", path.to_str().unwrap(), "--strategy", "fixed-arima"])
            .into_config()
            .unwrap();
        assert!(matches!(&config.strategies[0], StrategyConfig::FixedArima(c) if c.p == 2));
    }

    #[test]
    fn invalid_overrides_are_rejected() {
        assert!(parse(&["-H", "0"]).into_config().is_err());
        assert!(parse(&["--confidence", "1.5"]).into_config().is_err());
    }
}
