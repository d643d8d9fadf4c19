//! Entry/exit signal generation.
//!
//! # Crossing semantics
//!
//! - `crossed_above` fires at `i` when `left[i] > right[i]` (strict) and the
//!   previous point was `left <= right`
//! - `crossed_below` is symmetric with `<` / `>=`
//! - No signal while either side is still warming up at `i`
//! - A previous point that is still warming up (or absent at index 0) is
//!   handled per [`PriorWarmup`]: the EMA crossover treats it as off the
//!   triggering side, so a crossing can fire on the first valid index; the RSI
//!   threshold needs an observed previous value

use std::fmt;

use super::error::CompareError;
use super::indicator::ema::calculate_ema;
use super::indicator::rsi::calculate_rsi;
use super::indicator::IndicatorSeries;
use super::price::PriceSeries;

/// Entry and exit flags aligned index-for-index with a price series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalPair {
    pub entries: Vec<bool>,
    pub exits: Vec<bool>,
}

impl SignalPair {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry_count(&self) -> usize {
        self.entries.iter().filter(|&&e| e).count()
    }

    pub fn exit_count(&self) -> usize {
        self.exits.iter().filter(|&&e| e).count()
    }
}

pub trait SignalGenerator {
    /// Short human-readable description including parameters.
    fn describe(&self) -> String;

    fn generate(&self, prices: &PriceSeries) -> Result<SignalPair, CompareError>;
}

fn line(series: &IndicatorSeries) -> Vec<Option<f64>> {
    (0..series.len()).map(|i| series.value_at(i)).collect()
}

/// How a crossing treats a previous point that has no value yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriorWarmup {
    /// Counts as off the triggering side.
    OffSide,
    /// Never starts a crossing.
    Unobserved,
}

fn crossed<F>(
    left: &[Option<f64>],
    right: &[Option<f64>],
    prior: PriorWarmup,
    on_side: F,
) -> Vec<bool>
where
    F: Fn(f64, f64) -> bool,
{
    left.iter()
        .zip(right)
        .enumerate()
        .map(|(i, (&l, &r))| match (l, r) {
            (Some(l), Some(r)) if on_side(l, r) => {
                let prev = i
                    .checked_sub(1)
                    .and_then(|j| Some((left[j]?, right[j]?)));
                match prev {
                    Some((pl, pr)) => !on_side(pl, pr),
                    None => prior == PriorWarmup::OffSide,
                }
            }
            _ => false,
        })
        .collect()
}

pub fn crossed_above(
    left: &[Option<f64>],
    right: &[Option<f64>],
    prior: PriorWarmup,
) -> Vec<bool> {
    crossed(left, right, prior, |l, r| l > r)
}

pub fn crossed_below(
    left: &[Option<f64>],
    right: &[Option<f64>],
    prior: PriorWarmup,
) -> Vec<bool> {
    crossed(left, right, prior, |l, r| l < r)
}

/// Fast EMA crossing the slow EMA.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmaCrossover {
    pub fast: usize,
    pub slow: usize,
}

impl Default for EmaCrossover {
    fn default() -> Self {
        EmaCrossover { fast: 50, slow: 200 }
    }
}

impl EmaCrossover {
    pub fn new(fast: usize, slow: usize) -> Result<Self, CompareError> {
        if fast == 0 {
            return Err(CompareError::invalid_parameter(
                "ema.fast",
                "window must be at least 1",
            ));
        }
        if fast >= slow {
            return Err(CompareError::invalid_parameter(
                "ema.fast",
                format!("fast window {} must be below slow window {}", fast, slow),
            ));
        }
        Ok(EmaCrossover { fast, slow })
    }

    pub fn indicators(&self, prices: &PriceSeries) -> (IndicatorSeries, IndicatorSeries) {
        (
            calculate_ema(prices, self.fast),
            calculate_ema(prices, self.slow),
        )
    }
}

impl SignalGenerator for EmaCrossover {
    fn describe(&self) -> String {
        format!("EMA crossover ({}/{})", self.fast, self.slow)
    }

    fn generate(&self, prices: &PriceSeries) -> Result<SignalPair, CompareError> {
        let (fast, slow) = self.indicators(prices);
        let fast = line(&fast);
        let slow = line(&slow);
        Ok(SignalPair {
            entries: crossed_above(&fast, &slow, PriorWarmup::OffSide),
            exits: crossed_below(&fast, &slow, PriorWarmup::OffSide),
        })
    }
}

/// RSI leaving the oversold zone (entry) and falling back from overbought (exit).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RsiThreshold {
    pub period: usize,
    pub lower: f64,
    pub upper: f64,
}

impl Default for RsiThreshold {
    fn default() -> Self {
        RsiThreshold {
            period: 14,
            lower: 30.0,
            upper: 70.0,
        }
    }
}

impl RsiThreshold {
    pub fn new(period: usize, lower: f64, upper: f64) -> Result<Self, CompareError> {
        if period == 0 {
            return Err(CompareError::invalid_parameter(
                "rsi.period",
                "window must be at least 1",
            ));
        }
        if !(0.0..=100.0).contains(&lower) || !(0.0..=100.0).contains(&upper) {
            return Err(CompareError::invalid_parameter(
                "rsi.lower",
                "thresholds must lie within 0..=100",
            ));
        }
        if lower >= upper {
            return Err(CompareError::invalid_parameter(
                "rsi.lower",
                format!("lower threshold {} must be below upper {}", lower, upper),
            ));
        }
        Ok(RsiThreshold {
            period,
            lower,
            upper,
        })
    }
}

impl SignalGenerator for RsiThreshold {
    fn describe(&self) -> String {
        format!(
            "RSI({}) crossing {}/{}",
            self.period, self.lower, self.upper
        )
    }

    fn generate(&self, prices: &PriceSeries) -> Result<SignalPair, CompareError> {
        let rsi = line(&calculate_rsi(prices, self.period));
        let lower = vec![Some(self.lower); rsi.len()];
        let upper = vec![Some(self.upper); rsi.len()];
        Ok(SignalPair {
            entries: crossed_above(&rsi, &lower, PriorWarmup::Unobserved),
            exits: crossed_below(&rsi, &upper, PriorWarmup::Unobserved),
        })
    }
}

impl fmt::Display for EmaCrossover {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.describe())
    }
}

impl fmt::Display for RsiThreshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.describe())
    }
}
