//! Named strategies and their simulated results.

use super::backtest::BacktestConfig;
use super::error::CompareError;
use super::portfolio::{self, PortfolioResult};
use super::price::PriceSeries;
use super::signal::{SignalGenerator, SignalPair};

pub const EMA_STRATEGY_NAME: &str = "EMA Crossover";
pub const RSI_STRATEGY_NAME: &str = "RSI Strategy";
pub const BASELINE_NAME: &str = "Buy & Hold";

/// A strategy to run: display name plus its signal rule.
pub struct StrategySpec {
    pub name: String,
    pub generator: Box<dyn SignalGenerator>,
}

impl StrategySpec {
    pub fn new(name: impl Into<String>, generator: impl SignalGenerator + 'static) -> Self {
        StrategySpec {
            name: name.into(),
            generator: Box::new(generator),
        }
    }
}

/// One registry entry. `signals` is `None` for the buy-and-hold baseline.
#[derive(Debug, Clone)]
pub struct StrategyRun {
    pub name: String,
    pub description: String,
    pub signals: Option<SignalPair>,
    pub result: PortfolioResult,
}

/// Strategies in insertion order with unique names.
#[derive(Debug, Clone, Default)]
pub struct StrategyRegistry {
    runs: Vec<StrategyRun>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, run: StrategyRun) -> Result<(), CompareError> {
        if self.contains(&run.name) {
            return Err(CompareError::DuplicateStrategy { name: run.name });
        }
        self.runs.push(run);
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.runs.iter().any(|r| r.name == name)
    }

    pub fn get(&self, name: &str) -> Option<&StrategyRun> {
        self.runs.iter().find(|r| r.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &StrategyRun> {
        self.runs.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.runs.iter().map(|r| r.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }
}

/// Simulate every strategy against `prices`, then the optional buy-and-hold
/// baseline, all under the same `config`.
///
/// The first failure aborts the whole build.
pub fn build_registry(
    prices: &PriceSeries,
    strategies: Vec<StrategySpec>,
    baseline: Option<&str>,
    config: &BacktestConfig,
) -> Result<StrategyRegistry, CompareError> {
    config.validate()?;
    let mut registry = StrategyRegistry::new();

    for spec in strategies {
        let description = spec.generator.describe();
        log::info!("Simulating {} [{}]", spec.name, description);
        let signals = spec.generator.generate(prices)?;
        log::debug!(
            "{}: {} entries, {} exits",
            spec.name,
            signals.entry_count(),
            signals.exit_count()
        );
        let result = portfolio::simulate(prices, &signals, config)?;
        log::debug!(
            "{}: {} orders, final equity {:.2}",
            spec.name,
            result.orders().len(),
            result.final_equity()
        );
        registry.insert(StrategyRun {
            name: spec.name,
            description,
            signals: Some(signals),
            result,
        })?;
    }

    if let Some(name) = baseline {
        log::info!("Simulating {} baseline", name);
        let result = portfolio::hold(prices, config)?;
        registry.insert(StrategyRun {
            name: name.to_string(),
            description: "buy at the first bar and hold".to_string(),
            signals: None,
            result,
        })?;
    }

    Ok(registry)
}
