//! Performance metrics and statistics.
//!
//! Returns are bar-to-bar equity changes, the first measured against initial
//! cash. Ratios are annualised with the config's `periods_per_year`.
//! Percent-valued metrics (`total_return`, `max_dd`) are reported x100.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;

use super::error::CompareError;
use super::portfolio::{EquityPoint, PortfolioResult};

/// Metrics compared across strategies, in table row order.
pub const COMPARISON_METRICS: [&str; 5] = [
    "total_return",
    "max_dd",
    "sharpe_ratio",
    "sortino_ratio",
    "calmar_ratio",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    StartValue,
    EndValue,
    TotalReturn,
    AnnualizedReturn,
    TotalFeesPaid,
    MaxDrawdown,
    MaxDrawdownDuration,
    TotalTrades,
    WinRate,
    SharpeRatio,
    SortinoRatio,
    CalmarRatio,
}

impl Metric {
    pub const ALL: [Metric; 12] = [
        Metric::StartValue,
        Metric::EndValue,
        Metric::TotalReturn,
        Metric::AnnualizedReturn,
        Metric::TotalFeesPaid,
        Metric::MaxDrawdown,
        Metric::MaxDrawdownDuration,
        Metric::TotalTrades,
        Metric::WinRate,
        Metric::SharpeRatio,
        Metric::SortinoRatio,
        Metric::CalmarRatio,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Metric::StartValue => "start_value",
            Metric::EndValue => "end_value",
            Metric::TotalReturn => "total_return",
            Metric::AnnualizedReturn => "annualized_return",
            Metric::TotalFeesPaid => "total_fees_paid",
            Metric::MaxDrawdown => "max_dd",
            Metric::MaxDrawdownDuration => "max_dd_duration",
            Metric::TotalTrades => "total_trades",
            Metric::WinRate => "win_rate",
            Metric::SharpeRatio => "sharpe_ratio",
            Metric::SortinoRatio => "sortino_ratio",
            Metric::CalmarRatio => "calmar_ratio",
        }
    }

    pub fn compute(&self, result: &PortfolioResult) -> f64 {
        let equity = result.equity();
        let initial = result.initial_cash();
        let periods = result.config().periods_per_year;
        match self {
            Metric::StartValue => initial,
            Metric::EndValue => result.final_equity(),
            Metric::TotalReturn => total_return(equity, initial) * 100.0,
            Metric::AnnualizedReturn => annualized_return(equity, initial, periods) * 100.0,
            Metric::TotalFeesPaid => result.total_fees(),
            Metric::MaxDrawdown => max_drawdown(equity) * 100.0,
            Metric::MaxDrawdownDuration => max_drawdown_duration(equity) as f64,
            Metric::TotalTrades => total_trades(result) as f64,
            Metric::WinRate => win_rate(result) * 100.0,
            Metric::SharpeRatio => sharpe_ratio(&returns(equity, initial), periods),
            Metric::SortinoRatio => sortino_ratio(&returns(equity, initial), periods),
            Metric::CalmarRatio => calmar_ratio(equity, initial, periods),
        }
    }
}

impl FromStr for Metric {
    type Err = CompareError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Metric::ALL
            .iter()
            .copied()
            .find(|m| m.name() == s)
            .ok_or_else(|| CompareError::UnknownMetric {
                name: s.to_string(),
            })
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub fn returns(equity_curve: &[EquityPoint], initial_cash: f64) -> Vec<f64> {
    let mut prev = initial_cash;
    equity_curve
        .iter()
        .map(|p| {
            let r = if prev > 0.0 { p.equity / prev - 1.0 } else { 0.0 };
            prev = p.equity;
            r
        })
        .collect()
}

pub fn total_return(equity_curve: &[EquityPoint], initial_cash: f64) -> f64 {
    match equity_curve.last() {
        Some(last) if initial_cash > 0.0 => last.equity / initial_cash - 1.0,
        _ => 0.0,
    }
}

/// Compounded return scaled to one year; 0 when the extrapolation overflows.
pub fn annualized_return(equity_curve: &[EquityPoint], initial_cash: f64, periods_per_year: f64) -> f64 {
    if equity_curve.is_empty() {
        return 0.0;
    }
    let total = total_return(equity_curve, initial_cash);
    let years_inv = periods_per_year / equity_curve.len() as f64;
    if total.is_finite() && total > -1.0 {
        // short series can overflow (1 + r)^(A/n)
        let annualized = (1.0 + total).powf(years_inv) - 1.0;
        finite_or_zero(annualized * 100.0) / 100.0
    } else {
        -1.0
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}

pub fn drawdown_series(equity_curve: &[EquityPoint]) -> Vec<EquityPoint> {
    let mut peak = f64::NEG_INFINITY;
    equity_curve
        .iter()
        .map(|p| {
            peak = peak.max(p.equity);
            let dd = if peak > 0.0 { p.equity / peak - 1.0 } else { 0.0 };
            EquityPoint {
                date: p.date,
                equity: dd,
            }
        })
        .collect()
}

/// Largest peak-to-trough decline as a positive fraction.
pub fn max_drawdown(equity_curve: &[EquityPoint]) -> f64 {
    drawdown_series(equity_curve)
        .iter()
        .map(|p| -p.equity)
        .fold(0.0, f64::max)
}

/// Longest run of bars spent below a previous peak.
pub fn max_drawdown_duration(equity_curve: &[EquityPoint]) -> usize {
    let mut longest = 0;
    let mut current = 0;
    for point in drawdown_series(equity_curve) {
        if point.equity < 0.0 {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

pub fn sharpe_ratio(returns: &[f64], periods_per_year: f64) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }
    let m = mean(returns);
    let variance =
        returns.iter().map(|r| (r - m).powi(2)).sum::<f64>() / (returns.len() - 1) as f64;
    let stddev = variance.sqrt();
    if stddev > 0.0 {
        m / stddev * periods_per_year.sqrt()
    } else {
        0.0
    }
}

pub fn sortino_ratio(returns: &[f64], periods_per_year: f64) -> f64 {
    if returns.is_empty() {
        return 0.0;
    }
    let downside = returns.iter().map(|r| r.min(0.0).powi(2)).sum::<f64>() / returns.len() as f64;
    let downside_dev = downside.sqrt();
    if downside_dev > 0.0 {
        mean(returns) / downside_dev * periods_per_year.sqrt()
    } else {
        0.0
    }
}

pub fn calmar_ratio(equity_curve: &[EquityPoint], initial_cash: f64, periods_per_year: f64) -> f64 {
    let max_dd = max_drawdown(equity_curve);
    if max_dd > 0.0 {
        finite_or_zero(annualized_return(equity_curve, initial_cash, periods_per_year) / max_dd)
    } else {
        0.0
    }
}

/// Closed trades plus the position still open at the end, if any.
pub fn total_trades(result: &PortfolioResult) -> usize {
    result.closed_trades().len() + usize::from(result.open_position().is_some())
}

/// Fraction of closed trades with positive PnL.
pub fn win_rate(result: &PortfolioResult) -> f64 {
    let trades = result.closed_trades();
    if trades.is_empty() {
        return 0.0;
    }
    trades.iter().filter(|t| t.pnl > 0.0).count() as f64 / trades.len() as f64
}

/// Full statistics block for one strategy.
#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioStats {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub period: usize,
    pub start_value: f64,
    pub end_value: f64,
    pub total_return: f64,
    pub annualized_return: f64,
    pub total_fees_paid: f64,
    pub max_drawdown: f64,
    pub max_drawdown_duration: usize,
    pub total_trades: usize,
    pub total_closed_trades: usize,
    pub open_trade_pnl: Option<f64>,
    pub win_rate: f64,
    pub best_trade: Option<f64>,
    pub worst_trade: Option<f64>,
    pub avg_winning_trade: Option<f64>,
    pub avg_losing_trade: Option<f64>,
    pub profit_factor: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub calmar_ratio: f64,
}

impl PortfolioStats {
    pub fn compute(result: &PortfolioResult) -> Self {
        let equity = result.equity();
        let initial = result.initial_cash();
        let periods = result.config().periods_per_year;
        let rets = returns(equity, initial);
        let trades = result.closed_trades();

        let trade_returns: Vec<f64> = trades.iter().map(|t| t.return_pct()).collect();
        let wins: Vec<f64> = trade_returns.iter().copied().filter(|&r| r > 0.0).collect();
        let losses: Vec<f64> = trade_returns.iter().copied().filter(|&r| r < 0.0).collect();

        let gross_profit: f64 = trades.iter().filter(|t| t.pnl > 0.0).map(|t| t.pnl).sum();
        let gross_loss: f64 = trades
            .iter()
            .filter(|t| t.pnl < 0.0)
            .map(|t| t.pnl.abs())
            .sum();
        let profit_factor = if gross_loss > 0.0 {
            gross_profit / gross_loss
        } else if gross_profit > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };

        PortfolioStats {
            start: equity.first().map(|p| p.date),
            end: equity.last().map(|p| p.date),
            period: equity.len(),
            start_value: initial,
            end_value: result.final_equity(),
            total_return: total_return(equity, initial),
            annualized_return: annualized_return(equity, initial, periods),
            total_fees_paid: result.total_fees(),
            max_drawdown: max_drawdown(equity),
            max_drawdown_duration: max_drawdown_duration(equity),
            total_trades: total_trades(result),
            total_closed_trades: trades.len(),
            open_trade_pnl: result.open_pnl(),
            win_rate: win_rate(result),
            best_trade: trade_returns.iter().copied().reduce(f64::max),
            worst_trade: trade_returns.iter().copied().reduce(f64::min),
            avg_winning_trade: (!wins.is_empty()).then(|| mean(&wins)),
            avg_losing_trade: (!losses.is_empty()).then(|| mean(&losses)),
            profit_factor,
            sharpe_ratio: sharpe_ratio(&rets, periods),
            sortino_ratio: sortino_ratio(&rets, periods),
            calmar_ratio: calmar_ratio(equity, initial, periods),
        }
    }
}

fn fmt_pct(value: Option<f64>) -> String {
    value
        .map(|v| format!("{:.2}", v * 100.0))
        .unwrap_or_else(|| "-".to_string())
}

impl fmt::Display for PortfolioStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let date = |d: Option<NaiveDate>| d.map(|d| d.to_string()).unwrap_or_else(|| "-".into());
        writeln!(f, "{:<28}{}", "Start", date(self.start))?;
        writeln!(f, "{:<28}{}", "End", date(self.end))?;
        writeln!(f, "{:<28}{} bars", "Period", self.period)?;
        writeln!(f, "{:<28}{:.2}", "Start Value", self.start_value)?;
        writeln!(f, "{:<28}{:.2}", "End Value", self.end_value)?;
        writeln!(f, "{:<28}{}", "Total Return [%]", fmt_pct(Some(self.total_return)))?;
        writeln!(
            f,
            "{:<28}{}",
            "Annualized Return [%]",
            fmt_pct(Some(self.annualized_return))
        )?;
        writeln!(f, "{:<28}{:.2}", "Total Fees Paid", self.total_fees_paid)?;
        writeln!(f, "{:<28}{}", "Max Drawdown [%]", fmt_pct(Some(self.max_drawdown)))?;
        writeln!(
            f,
            "{:<28}{} bars",
            "Max Drawdown Duration", self.max_drawdown_duration
        )?;
        writeln!(f, "{:<28}{}", "Total Trades", self.total_trades)?;
        writeln!(f, "{:<28}{}", "Total Closed Trades", self.total_closed_trades)?;
        match self.open_trade_pnl {
            Some(pnl) => writeln!(f, "{:<28}{:.2}", "Open Trade PnL", pnl)?,
            None => writeln!(f, "{:<28}-", "Open Trade PnL")?,
        }
        writeln!(f, "{:<28}{}", "Win Rate [%]", fmt_pct(Some(self.win_rate)))?;
        writeln!(f, "{:<28}{}", "Best Trade [%]", fmt_pct(self.best_trade))?;
        writeln!(f, "{:<28}{}", "Worst Trade [%]", fmt_pct(self.worst_trade))?;
        writeln!(
            f,
            "{:<28}{}",
            "Avg Winning Trade [%]",
            fmt_pct(self.avg_winning_trade)
        )?;
        writeln!(
            f,
            "{:<28}{}",
            "Avg Losing Trade [%]",
            fmt_pct(self.avg_losing_trade)
        )?;
        writeln!(f, "{:<28}{:.2}", "Profit Factor", self.profit_factor)?;
        writeln!(f, "{:<28}{:.4}", "Sharpe Ratio", self.sharpe_ratio)?;
        writeln!(f, "{:<28}{:.4}", "Sortino Ratio", self.sortino_ratio)?;
        write!(f, "{:<28}{:.4}", "Calmar Ratio", self.calmar_ratio)
    }
}
