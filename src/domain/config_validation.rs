//! Configuration validation.
//!
//! Every key is optional, but a key that is present must parse and be in range.

use std::str::FromStr;

use crate::domain::error::CompareError;
use crate::ports::config_port::{parse_bool, ConfigPort};
use chrono::NaiveDate;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn validate_run_config(config: &dyn ConfigPort) -> Result<(), CompareError> {
    validate_data(config)?;
    validate_backtest(config)?;
    validate_ema(config)?;
    validate_rsi(config)?;
    validate_output(config)?;
    Ok(())
}

/// Parse an optional key, turning a malformed value into `ConfigInvalid`.
fn parsed<T: FromStr>(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    expected: &str,
) -> Result<Option<T>, CompareError> {
    match config.get_string(section, key) {
        None => Ok(None),
        Some(raw) => raw.parse::<T>().map(Some).map_err(|_| {
            CompareError::config_invalid(
                section,
                key,
                format!("expected {}, got {:?}", expected, raw),
            )
        }),
    }
}

fn validate_data(config: &dyn ConfigPort) -> Result<(), CompareError> {
    if let Some(start) = config.get_string("data", "start_date") {
        NaiveDate::parse_from_str(&start, DATE_FORMAT).map_err(|_| {
            CompareError::config_invalid(
                "data",
                "start_date",
                "invalid start_date format, expected YYYY-MM-DD",
            )
        })?;
    }
    if let Some(symbol) = config.get_string("data", "symbol") {
        if symbol.chars().any(char::is_whitespace) {
            return Err(CompareError::config_invalid(
                "data",
                "symbol",
                "symbol must not contain whitespace",
            ));
        }
    }
    match config.get_string("data", "source").as_deref() {
        None | Some("yahoo") | Some("csv") => Ok(()),
        Some(other) => Err(CompareError::config_invalid(
            "data",
            "source",
            format!("unknown source {:?}, expected yahoo or csv", other),
        )),
    }
}

fn validate_backtest(config: &dyn ConfigPort) -> Result<(), CompareError> {
    let cash = parsed::<f64>(config, "backtest", "initial_cash", "a number")?;
    if cash.is_some_and(|c| !(c.is_finite() && c > 0.0)) {
        return Err(CompareError::config_invalid(
            "backtest",
            "initial_cash",
            "initial_cash must be positive",
        ));
    }
    let commission = parsed::<f64>(config, "backtest", "commission", "a number")?;
    if commission.is_some_and(|c| !(0.0..1.0).contains(&c)) {
        return Err(CompareError::config_invalid(
            "backtest",
            "commission",
            "commission must be a fraction in [0, 1)",
        ));
    }
    let periods = parsed::<f64>(config, "backtest", "periods_per_year", "a number")?;
    if periods.is_some_and(|p| !(p.is_finite() && p > 0.0)) {
        return Err(CompareError::config_invalid(
            "backtest",
            "periods_per_year",
            "periods_per_year must be positive",
        ));
    }
    Ok(())
}

fn validate_window(config: &dyn ConfigPort, section: &str, key: &str) -> Result<(), CompareError> {
    match parsed::<i64>(config, section, key, "an integer")? {
        Some(w) if w < 1 => Err(CompareError::config_invalid(
            section,
            key,
            format!("{} must be at least 1", key),
        )),
        _ => Ok(()),
    }
}

fn validate_ema(config: &dyn ConfigPort) -> Result<(), CompareError> {
    validate_window(config, "ema", "fast")?;
    validate_window(config, "ema", "slow")?;
    let fast = config.get_int("ema", "fast", 50);
    let slow = config.get_int("ema", "slow", 200);
    if fast >= slow {
        return Err(CompareError::config_invalid(
            "ema",
            "fast",
            format!("fast ({}) must be below slow ({})", fast, slow),
        ));
    }
    Ok(())
}

fn validate_rsi(config: &dyn ConfigPort) -> Result<(), CompareError> {
    validate_window(config, "rsi", "period")?;
    for key in ["lower", "upper"] {
        let level = parsed::<f64>(config, "rsi", key, "a number")?;
        if level.is_some_and(|l| !(0.0..=100.0).contains(&l)) {
            return Err(CompareError::config_invalid(
                "rsi",
                key,
                format!("{} must be within 0..=100", key),
            ));
        }
    }
    let lower = config.get_double("rsi", "lower", 30.0);
    let upper = config.get_double("rsi", "upper", 70.0);
    if lower >= upper {
        return Err(CompareError::config_invalid(
            "rsi",
            "lower",
            format!("lower ({}) must be below upper ({})", lower, upper),
        ));
    }
    Ok(())
}

fn validate_output(config: &dyn ConfigPort) -> Result<(), CompareError> {
    for key in ["show_details", "strategy_plots", "save_results"] {
        if let Some(raw) = config.get_string("output", key) {
            if parse_bool(&raw).is_none() {
                return Err(CompareError::config_invalid(
                    "output",
                    key,
                    format!("expected true or false, got {:?}", raw),
                ));
            }
        }
    }
    Ok(())
}
