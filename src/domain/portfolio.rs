//! Portfolio simulation and equity tracking.
//!
//! Long-only, one position at a time. An entry invests all available cash at
//! the signal bar's close, an exit sells the whole position at the close.
//! Fees are `commission * traded value` on both sides.

use chrono::NaiveDate;

use super::backtest::BacktestConfig;
use super::error::CompareError;
use super::metrics::{self, Metric, PortfolioStats};
use super::position::{ClosedTrade, Order, Position, Side};
use super::price::PriceSeries;
use super::signal::SignalPair;

#[derive(Debug, Clone, PartialEq)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub equity: f64,
}

/// Mutable simulation state.
#[derive(Debug, Clone, PartialEq)]
pub struct Portfolio {
    pub cash: f64,
    pub initial_cash: f64,
    pub position: Option<Position>,
    pub orders: Vec<Order>,
    pub closed_trades: Vec<ClosedTrade>,
    pub equity_curve: Vec<EquityPoint>,
    pub total_fees: f64,
}

impl Portfolio {
    pub fn new(initial_cash: f64) -> Self {
        Portfolio {
            cash: initial_cash,
            initial_cash,
            position: None,
            orders: Vec::new(),
            closed_trades: Vec::new(),
            equity_curve: Vec::new(),
            total_fees: 0.0,
        }
    }

    pub fn has_position(&self) -> bool {
        self.position.is_some()
    }

    /// Spend all cash on a new long position. No-op when already long.
    pub fn buy(&mut self, index: usize, date: NaiveDate, price: f64, fee_rate: f64) {
        if self.position.is_some() || self.cash <= 0.0 {
            return;
        }
        let size = self.cash / (price * (1.0 + fee_rate));
        let fees = size * price * fee_rate;
        self.cash = 0.0;
        self.total_fees += fees;
        self.orders.push(Order {
            index,
            date,
            side: Side::Buy,
            size,
            price,
            fees,
        });
        self.position = Some(Position {
            size,
            entry_price: price,
            entry_date: date,
            entry_fees: fees,
        });
    }

    /// Close the open position. No-op when flat.
    pub fn sell(&mut self, index: usize, date: NaiveDate, price: f64, fee_rate: f64) {
        let Some(position) = self.position.take() else {
            return;
        };
        let gross = position.size * price;
        let fees = gross * fee_rate;
        self.cash += gross - fees;
        self.total_fees += fees;
        self.orders.push(Order {
            index,
            date,
            side: Side::Sell,
            size: position.size,
            price,
            fees,
        });
        self.closed_trades.push(ClosedTrade {
            size: position.size,
            entry_price: position.entry_price,
            exit_price: price,
            entry_date: position.entry_date,
            exit_date: date,
            fees: position.entry_fees + fees,
            pnl: gross - fees - position.cost_basis(),
        });
    }

    pub fn total_equity(&self, price: f64) -> f64 {
        self.cash
            + self
                .position
                .as_ref()
                .map(|p| p.market_value(price))
                .unwrap_or(0.0)
    }

    pub fn record_equity(&mut self, date: NaiveDate, price: f64) {
        let equity = self.total_equity(price);
        self.equity_curve.push(EquityPoint { date, equity });
    }
}

/// Read-only outcome of one simulated strategy.
#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioResult {
    config: BacktestConfig,
    equity_curve: Vec<EquityPoint>,
    orders: Vec<Order>,
    closed_trades: Vec<ClosedTrade>,
    open_position: Option<Position>,
    last_price: f64,
    total_fees: f64,
}

impl PortfolioResult {
    fn from_portfolio(portfolio: Portfolio, config: &BacktestConfig, last_price: f64) -> Self {
        PortfolioResult {
            config: config.clone(),
            equity_curve: portfolio.equity_curve,
            orders: portfolio.orders,
            closed_trades: portfolio.closed_trades,
            open_position: portfolio.position,
            last_price,
            total_fees: portfolio.total_fees,
        }
    }

    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    pub fn equity(&self) -> &[EquityPoint] {
        &self.equity_curve
    }

    /// `equity / running_peak - 1` at every bar; values are <= 0.
    pub fn drawdown(&self) -> Vec<EquityPoint> {
        metrics::drawdown_series(&self.equity_curve)
    }

    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    pub fn closed_trades(&self) -> &[ClosedTrade] {
        &self.closed_trades
    }

    pub fn open_position(&self) -> Option<&Position> {
        self.open_position.as_ref()
    }

    /// Unrealised PnL of the position still held at the last bar.
    pub fn open_pnl(&self) -> Option<f64> {
        self.open_position
            .as_ref()
            .map(|p| p.unrealized_pnl(self.last_price))
    }

    pub fn total_fees(&self) -> f64 {
        self.total_fees
    }

    pub fn initial_cash(&self) -> f64 {
        self.config.initial_cash
    }

    pub fn final_equity(&self) -> f64 {
        self.equity_curve
            .last()
            .map(|p| p.equity)
            .unwrap_or(self.config.initial_cash)
    }

    /// Scalar statistic by name, e.g. `"sharpe_ratio"`.
    pub fn metric(&self, name: &str) -> Result<f64, CompareError> {
        let metric: Metric = name.parse()?;
        Ok(metric.compute(self))
    }

    pub fn stats(&self) -> PortfolioStats {
        PortfolioStats::compute(self)
    }
}

fn check_inputs(prices: &PriceSeries, config: &BacktestConfig) -> Result<(), CompareError> {
    config.validate()?;
    if prices.is_empty() {
        return Err(CompareError::Simulation {
            reason: format!("empty price series for {}", prices.symbol()),
        });
    }
    Ok(())
}

/// Run entry/exit signals through the simulator.
///
/// An entry and an exit on the same bar cancel each other out.
pub fn simulate(
    prices: &PriceSeries,
    signals: &SignalPair,
    config: &BacktestConfig,
) -> Result<PortfolioResult, CompareError> {
    check_inputs(prices, config)?;
    if signals.entries.len() != prices.len() || signals.exits.len() != prices.len() {
        return Err(CompareError::Simulation {
            reason: format!(
                "signal length mismatch: {} prices, {} entries, {} exits",
                prices.len(),
                signals.entries.len(),
                signals.exits.len()
            ),
        });
    }

    let mut portfolio = Portfolio::new(config.initial_cash);
    for (i, point) in prices.points().iter().enumerate() {
        match (signals.entries[i], signals.exits[i]) {
            (true, false) => portfolio.buy(i, point.date, point.close, config.commission),
            (false, true) => portfolio.sell(i, point.date, point.close, config.commission),
            _ => {}
        }
        portfolio.record_equity(point.date, point.close);
    }

    let last_price = prices.points().last().map(|p| p.close).unwrap_or(0.0);
    Ok(PortfolioResult::from_portfolio(portfolio, config, last_price))
}

/// Buy at the first bar and hold to the end.
pub fn hold(prices: &PriceSeries, config: &BacktestConfig) -> Result<PortfolioResult, CompareError> {
    check_inputs(prices, config)?;
    let mut entries = vec![false; prices.len()];
    entries[0] = true;
    let signals = SignalPair {
        entries,
        exits: vec![false; prices.len()],
    };
    simulate(prices, &signals, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::price::PricePoint;

    fn make_prices(closes: &[f64]) -> PriceSeries {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let points = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| PricePoint {
                date: start + chrono::Duration::days(i as i64),
                close,
            })
            .collect();
        PriceSeries::new("TEST", points).unwrap()
    }

    fn flags(len: usize, on: &[usize]) -> Vec<bool> {
        (0..len).map(|i| on.contains(&i)).collect()
    }

    fn config(commission: f64) -> BacktestConfig {
        BacktestConfig {
            initial_cash: 1_000.0,
            commission,
            periods_per_year: 365.0,
        }
    }

    #[test]
    fn new_portfolio() {
        let portfolio = Portfolio::new(1_000.0);
        assert!((portfolio.cash - 1_000.0).abs() < f64::EPSILON);
        assert!(!portfolio.has_position());
        assert!(portfolio.orders.is_empty());
        assert!(portfolio.equity_curve.is_empty());
    }

    #[test]
    fn buy_spends_all_cash_including_fees() {
        let mut portfolio = Portfolio::new(1_000.0);
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        portfolio.buy(0, date, 100.0, 0.01);

        let pos = portfolio.position.as_ref().unwrap();
        assert!((pos.size - 1_000.0 / 101.0).abs() < 1e-9);
        assert!(portfolio.cash.abs() < f64::EPSILON);
        assert!((pos.cost_basis() - 1_000.0).abs() < 1e-9);
        assert_eq!(portfolio.orders.len(), 1);
    }

    #[test]
    fn buy_while_long_is_ignored() {
        let mut portfolio = Portfolio::new(1_000.0);
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        portfolio.buy(0, date, 100.0, 0.0);
        portfolio.buy(1, date.succ_opt().unwrap(), 50.0, 0.0);
        assert_eq!(portfolio.orders.len(), 1);
    }

    #[test]
    fn sell_while_flat_is_ignored() {
        let mut portfolio = Portfolio::new(1_000.0);
        portfolio.sell(0, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), 100.0, 0.0);
        assert!(portfolio.orders.is_empty());
        assert!(portfolio.closed_trades.is_empty());
    }

    #[test]
    fn round_trip_records_trade_pnl() {
        let prices = make_prices(&[100.0, 110.0, 120.0, 115.0]);
        let signals = SignalPair {
            entries: flags(4, &[0]),
            exits: flags(4, &[2]),
        };
        let result = simulate(&prices, &signals, &config(0.0)).unwrap();

        assert_eq!(result.closed_trades().len(), 1);
        let trade = &result.closed_trades()[0];
        assert!((trade.pnl - 200.0).abs() < 1e-9);
        assert!((result.final_equity() - 1_200.0).abs() < 1e-9);
        assert!(result.open_position().is_none());
    }

    #[test]
    fn fees_charged_on_both_sides() {
        let prices = make_prices(&[100.0, 100.0]);
        let signals = SignalPair {
            entries: flags(2, &[0]),
            exits: flags(2, &[1]),
        };
        let result = simulate(&prices, &signals, &config(0.01)).unwrap();

        let size = 1_000.0 / 101.0;
        let expected_final = size * 100.0 * 0.99;
        assert!((result.final_equity() - expected_final).abs() < 1e-9);
        assert!((result.total_fees() - (1_000.0 - expected_final)).abs() < 1e-9);
        assert!(result.closed_trades()[0].pnl < 0.0);
    }

    #[test]
    fn no_signals_keeps_initial_cash() {
        let prices = make_prices(&[100.0, 90.0, 120.0]);
        let signals = SignalPair {
            entries: vec![false; 3],
            exits: vec![false; 3],
        };
        let result = simulate(&prices, &signals, &config(0.002)).unwrap();
        for point in result.equity() {
            assert!((point.equity - 1_000.0).abs() < f64::EPSILON);
        }
        assert!(result.orders().is_empty());
    }

    #[test]
    fn conflicting_signals_cancel() {
        let prices = make_prices(&[100.0, 110.0]);
        let signals = SignalPair {
            entries: vec![true, false],
            exits: vec![true, false],
        };
        let result = simulate(&prices, &signals, &config(0.0)).unwrap();
        assert!(result.orders().is_empty());
    }

    #[test]
    fn exit_before_entry_is_ignored() {
        let prices = make_prices(&[100.0, 110.0, 120.0]);
        let signals = SignalPair {
            entries: flags(3, &[1]),
            exits: flags(3, &[0]),
        };
        let result = simulate(&prices, &signals, &config(0.0)).unwrap();
        assert_eq!(result.orders().len(), 1);
        assert_eq!(result.orders()[0].side, Side::Buy);
        assert!(result.open_position().is_some());
    }

    #[test]
    fn hold_matches_price_ratio_after_entry_fee() {
        let prices = make_prices(&[50.0, 60.0, 40.0, 75.0]);
        let result = hold(&prices, &config(0.002)).unwrap();

        let expected = 1_000.0 / 1.002 * 75.0 / 50.0;
        assert!((result.final_equity() - expected).abs() < 1e-9);
        assert!(result.open_position().is_some());
        assert!(result.closed_trades().is_empty());
    }

    #[test]
    fn drawdown_is_never_positive() {
        let prices = make_prices(&[50.0, 60.0, 40.0, 75.0, 70.0]);
        let result = hold(&prices, &config(0.0)).unwrap();
        let dd = result.drawdown();
        assert_eq!(dd.len(), 5);
        assert!(dd.iter().all(|p| p.equity <= 0.0));
        assert!((dd[2].equity - (40.0 / 60.0 - 1.0)).abs() < 1e-9);
    }

    #[test]
    fn open_pnl_marks_to_last_price() {
        let prices = make_prices(&[100.0, 120.0]);
        let result = hold(&prices, &config(0.0)).unwrap();
        assert!((result.open_pnl().unwrap() - 200.0).abs() < 1e-9);
    }

    #[test]
    fn empty_prices_fail() {
        let prices = make_prices(&[]);
        let err = hold(&prices, &config(0.0)).unwrap_err();
        assert!(matches!(err, CompareError::Simulation { .. }));
    }

    #[test]
    fn signal_length_mismatch_fails() {
        let prices = make_prices(&[100.0, 101.0, 102.0]);
        let signals = SignalPair {
            entries: vec![false; 2],
            exits: vec![false; 3],
        };
        let err = simulate(&prices, &signals, &config(0.0)).unwrap_err();
        assert!(matches!(err, CompareError::Simulation { .. }));
    }

    #[test]
    fn invalid_config_fails() {
        let prices = make_prices(&[100.0]);
        let err = hold(&prices, &config(1.5)).unwrap_err();
        assert!(matches!(err, CompareError::InvalidParameter { .. }));
    }

    #[test]
    fn metric_lookup_by_name() {
        let prices = make_prices(&[100.0, 110.0]);
        let result = hold(&prices, &config(0.0)).unwrap();
        assert!((result.metric("total_return").unwrap() - 10.0).abs() < 1e-9);
        assert!(matches!(
            result.metric("alpha"),
            Err(CompareError::UnknownMetric { name }) if name == "alpha"
        ));
    }
}
