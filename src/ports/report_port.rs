//! Chart output port trait.

use std::path::PathBuf;

use crate::domain::error::CompareError;
use crate::domain::price::PriceSeries;
use crate::domain::registry::{StrategyRegistry, StrategyRun};

/// Port for writing comparison charts.
pub trait ReportPort {
    /// Overlaid equity and drawdown charts for every strategy, returning the
    /// files written.
    fn write_comparison(
        &self,
        symbol: &str,
        registry: &StrategyRegistry,
    ) -> Result<Vec<PathBuf>, CompareError>;

    /// Price with the strategy's fills, plus its equity curve.
    fn write_strategy(&self, prices: &PriceSeries, run: &StrategyRun)
    -> Result<PathBuf, CompareError>;
}
