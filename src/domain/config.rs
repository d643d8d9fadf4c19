//! Resolved run settings.

use std::fmt;
use std::path::PathBuf;

use chrono::NaiveDate;

use super::backtest::{BacktestConfig, DEFAULT_PERIODS_PER_YEAR};
use super::config_validation::{validate_run_config, DATE_FORMAT};
use super::error::CompareError;
use super::signal::{EmaCrossover, RsiThreshold};
use crate::ports::config_port::ConfigPort;

pub const DEFAULT_SYMBOL: &str = "SPY";
pub const DEFAULT_CSV_DIR: &str = "data";
pub const DEFAULT_SUMMARY_PATH: &str = "strategy_summary.csv";
pub const DEFAULT_CHART_DIR: &str = "charts";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    Yahoo,
    Csv { dir: PathBuf },
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::Yahoo => write!(f, "yahoo"),
            DataSource::Csv { dir } => write!(f, "csv ({})", dir.display()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub symbol: String,
    pub start_date: NaiveDate,
    pub source: DataSource,
    pub backtest: BacktestConfig,
    pub ema: EmaCrossover,
    pub rsi: RsiThreshold,
    pub show_details: bool,
    pub strategy_plots: bool,
    pub save_results: bool,
    pub summary_path: PathBuf,
    pub chart_dir: PathBuf,
}

fn default_start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2000, 1, 1).unwrap_or_default()
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            symbol: DEFAULT_SYMBOL.to_string(),
            start_date: default_start_date(),
            source: DataSource::Yahoo,
            backtest: BacktestConfig::default(),
            ema: EmaCrossover::default(),
            rsi: RsiThreshold::default(),
            show_details: false,
            strategy_plots: true,
            save_results: true,
            summary_path: PathBuf::from(DEFAULT_SUMMARY_PATH),
            chart_dir: PathBuf::from(DEFAULT_CHART_DIR),
        }
    }
}

/// Validate `config` and resolve it over the defaults.
pub fn build_run_config(config: &dyn ConfigPort) -> Result<RunConfig, CompareError> {
    validate_run_config(config)?;
    let defaults = RunConfig::default();

    let start_date = match config.get_string("data", "start_date") {
        Some(s) => NaiveDate::parse_from_str(&s, DATE_FORMAT).map_err(|_| {
            CompareError::config_invalid("data", "start_date", "expected YYYY-MM-DD")
        })?,
        None => defaults.start_date,
    };

    let source = match config.get_string("data", "source").as_deref() {
        Some("csv") => DataSource::Csv {
            dir: config
                .get_string("data", "csv_dir")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CSV_DIR)),
        },
        _ => DataSource::Yahoo,
    };

    let backtest = BacktestConfig {
        initial_cash: config.get_double("backtest", "initial_cash", defaults.backtest.initial_cash),
        commission: config.get_double("backtest", "commission", defaults.backtest.commission),
        periods_per_year: config.get_double(
            "backtest",
            "periods_per_year",
            DEFAULT_PERIODS_PER_YEAR,
        ),
    };
    backtest.validate()?;

    let ema = EmaCrossover::new(
        window(config, "ema", "fast", defaults.ema.fast)?,
        window(config, "ema", "slow", defaults.ema.slow)?,
    )?;
    let rsi = RsiThreshold::new(
        window(config, "rsi", "period", defaults.rsi.period)?,
        config.get_double("rsi", "lower", defaults.rsi.lower),
        config.get_double("rsi", "upper", defaults.rsi.upper),
    )?;

    Ok(RunConfig {
        symbol: config
            .get_string("data", "symbol")
            .map(|s| s.to_uppercase())
            .unwrap_or(defaults.symbol),
        start_date,
        source,
        backtest,
        ema,
        rsi,
        show_details: config.get_bool("output", "show_details", defaults.show_details),
        strategy_plots: config.get_bool("output", "strategy_plots", defaults.strategy_plots),
        save_results: config.get_bool("output", "save_results", defaults.save_results),
        summary_path: config
            .get_string("output", "summary_path")
            .map(PathBuf::from)
            .unwrap_or(defaults.summary_path),
        chart_dir: config
            .get_string("output", "chart_dir")
            .map(PathBuf::from)
            .unwrap_or(defaults.chart_dir),
    })
}

fn window(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: usize,
) -> Result<usize, CompareError> {
    let value = config.get_int(section, key, default as i64);
    usize::try_from(value)
        .map_err(|_| CompareError::config_invalid(section, key, "window must be positive"))
}

impl fmt::Display for RunConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:<18}{}", "symbol", self.symbol)?;
        writeln!(f, "{:<18}{}", "start_date", self.start_date)?;
        writeln!(f, "{:<18}{}", "source", self.source)?;
        writeln!(f, "{:<18}{}", "initial_cash", self.backtest.initial_cash)?;
        writeln!(f, "{:<18}{}", "commission", self.backtest.commission)?;
        writeln!(f, "{:<18}{}", "periods_per_year", self.backtest.periods_per_year)?;
        writeln!(f, "{:<18}{}", "ema", self.ema)?;
        writeln!(f, "{:<18}{}", "rsi", self.rsi)?;
        writeln!(f, "{:<18}{}", "show_details", self.show_details)?;
        writeln!(f, "{:<18}{}", "strategy_plots", self.strategy_plots)?;
        writeln!(f, "{:<18}{}", "save_results", self.save_results)?;
        writeln!(f, "{:<18}{}", "summary_path", self.summary_path.display())?;
        write!(f, "{:<18}{}", "chart_dir", self.chart_dir.display())
    }
}
