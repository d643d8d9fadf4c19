//! Price data access port trait.

use crate::domain::error::CompareError;
use crate::domain::price::PriceSeries;
use chrono::NaiveDate;

pub trait DataPort {
    /// Daily closes for `symbol` from `start` (inclusive) to the latest bar.
    ///
    /// An empty result is `NoData`, never an empty series.
    fn fetch_closes(&self, symbol: &str, start: NaiveDate) -> Result<PriceSeries, CompareError>;
}
