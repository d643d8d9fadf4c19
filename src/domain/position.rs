//! Open positions, fills and closed trades.

use chrono::NaiveDate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Buy,
    Sell,
}

/// A single simulated fill.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub index: usize,
    pub date: NaiveDate,
    pub side: Side,
    pub size: f64,
    pub price: f64,
    pub fees: f64,
}

/// Long position; size may be fractional.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub size: f64,
    pub entry_price: f64,
    pub entry_date: NaiveDate,
    pub entry_fees: f64,
}

impl Position {
    pub fn market_value(&self, price: f64) -> f64 {
        self.size * price
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        self.size * (price - self.entry_price) - self.entry_fees
    }

    /// Entry cost including fees.
    pub fn cost_basis(&self) -> f64 {
        self.size * self.entry_price + self.entry_fees
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClosedTrade {
    pub size: f64,
    pub entry_price: f64,
    pub exit_price: f64,
    pub entry_date: NaiveDate,
    pub exit_date: NaiveDate,
    pub fees: f64,
    pub pnl: f64,
}

impl ClosedTrade {
    /// PnL relative to the entry cost basis.
    pub fn return_pct(&self) -> f64 {
        let basis = self.size * self.entry_price;
        if basis > 0.0 { self.pnl / basis } else { 0.0 }
    }
}
