//! Metric-by-strategy comparison table.

use std::collections::HashSet;
use std::fmt;

use super::error::CompareError;
use super::metrics::{Metric, COMPARISON_METRICS};
use super::registry::StrategyRegistry;

/// Rows are metric names, columns are strategy names.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonTable {
    metrics: Vec<String>,
    strategies: Vec<String>,
    /// `values[row][column]`
    values: Vec<Vec<f64>>,
}

impl ComparisonTable {
    /// Look up every metric for every strategy in registry order.
    pub fn build(registry: &StrategyRegistry, metric_names: &[&str]) -> Result<Self, CompareError> {
        let mut seen = HashSet::new();
        let mut metrics = Vec::with_capacity(metric_names.len());
        for &name in metric_names {
            if !seen.insert(name) {
                return Err(CompareError::invalid_parameter(
                    "metrics",
                    format!("metric {} listed more than once", name),
                ));
            }
            metrics.push(name.parse::<Metric>()?);
        }

        let values = metrics
            .iter()
            .map(|metric| {
                registry
                    .iter()
                    .map(|run| metric.compute(&run.result))
                    .collect()
            })
            .collect();

        Ok(ComparisonTable {
            metrics: metric_names.iter().map(|m| m.to_string()).collect(),
            strategies: registry.names().into_iter().map(String::from).collect(),
            values,
        })
    }

    /// The fixed five-row comparison.
    pub fn build_default(registry: &StrategyRegistry) -> Result<Self, CompareError> {
        Self::build(registry, &COMPARISON_METRICS)
    }

    /// Assemble a table from raw parts, e.g. when reading one back from disk.
    pub fn from_parts(
        metrics: Vec<String>,
        strategies: Vec<String>,
        values: Vec<Vec<f64>>,
    ) -> Result<Self, CompareError> {
        if values.len() != metrics.len() {
            return Err(CompareError::invalid_parameter(
                "values",
                format!("{} rows for {} metrics", values.len(), metrics.len()),
            ));
        }
        if let Some(row) = values.iter().find(|row| row.len() != strategies.len()) {
            return Err(CompareError::invalid_parameter(
                "values",
                format!("{} cells for {} strategies", row.len(), strategies.len()),
            ));
        }
        Ok(ComparisonTable {
            metrics,
            strategies,
            values,
        })
    }

    pub fn metrics(&self) -> &[String] {
        &self.metrics
    }

    pub fn strategies(&self) -> &[String] {
        &self.strategies
    }

    pub fn rows(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.metrics
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().map(Vec::as_slice))
    }

    pub fn get(&self, metric: &str, strategy: &str) -> Option<f64> {
        let row = self.metrics.iter().position(|m| m == metric)?;
        let col = self.strategies.iter().position(|s| s == strategy)?;
        Some(self.values[row][col])
    }

    pub fn column(&self, strategy: &str) -> Option<Vec<f64>> {
        let col = self.strategies.iter().position(|s| s == strategy)?;
        Some(self.values.iter().map(|row| row[col]).collect())
    }
}

impl fmt::Display for ComparisonTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label_width = self.metrics.iter().map(String::len).max().unwrap_or(0);
        let cells: Vec<Vec<String>> = self
            .values
            .iter()
            .map(|row| row.iter().map(|v| format!("{:.6}", v)).collect())
            .collect();
        let widths: Vec<usize> = self
            .strategies
            .iter()
            .enumerate()
            .map(|(col, name)| {
                cells
                    .iter()
                    .map(|row| row[col].len())
                    .chain(std::iter::once(name.len()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        write!(f, "{:<label_width$}", "")?;
        for (name, width) in self.strategies.iter().zip(&widths) {
            write!(f, "  {:>width$}", name, width = *width)?;
        }
        for (metric, row) in self.metrics.iter().zip(&cells) {
            writeln!(f)?;
            write!(f, "{:<label_width$}", metric)?;
            for (cell, width) in row.iter().zip(&widths) {
                write!(f, "  {:>width$}", cell, width = *width)?;
            }
        }
        Ok(())
    }
}
