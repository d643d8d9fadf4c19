//! Cost and frequency parameters shared by every simulated strategy.

use super::error::CompareError;

/// Calendar-day annualisation for daily bars.
pub const DEFAULT_PERIODS_PER_YEAR: f64 = 365.0;

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub initial_cash: f64,
    /// Fee as a fraction of traded value, charged on both entry and exit.
    pub commission: f64,
    pub periods_per_year: f64,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig {
            initial_cash: 10_000.0,
            commission: 0.002,
            periods_per_year: DEFAULT_PERIODS_PER_YEAR,
        }
    }
}

impl BacktestConfig {
    pub fn validate(&self) -> Result<(), CompareError> {
        if !(self.initial_cash.is_finite() && self.initial_cash > 0.0) {
            return Err(CompareError::invalid_parameter(
                "initial_cash",
                "initial cash must be positive",
            ));
        }
        if !(0.0..1.0).contains(&self.commission) {
            return Err(CompareError::invalid_parameter(
                "commission",
                "commission must be a fraction in [0, 1)",
            ));
        }
        if !(self.periods_per_year.is_finite() && self.periods_per_year > 0.0) {
            return Err(CompareError::invalid_parameter(
                "periods_per_year",
                "periods per year must be positive",
            ));
        }
        Ok(())
    }
}
