#![allow(dead_code)]

use chrono::NaiveDate;
use std::collections::HashMap;
use std::path::Path;
use stratcompare::domain::config::{DataSource, RunConfig};
use stratcompare::domain::error::CompareError;
use stratcompare::domain::price::{PricePoint, PriceSeries};
use stratcompare::domain::signal::EmaCrossover;
use stratcompare::ports::data_port::DataPort;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<PricePoint>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_closes(mut self, symbol: &str, closes: &[f64]) -> Self {
        self.data.insert(symbol.to_string(), make_points(closes));
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_closes(&self, symbol: &str, start: NaiveDate) -> Result<PriceSeries, CompareError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(CompareError::DataFetch {
                symbol: symbol.to_string(),
                reason: reason.clone(),
            });
        }
        let points: Vec<PricePoint> = self
            .data
            .get(symbol)
            .map(|p| p.iter().copied().filter(|p| p.date >= start).collect())
            .unwrap_or_default();
        if points.is_empty() {
            return Err(CompareError::NoData {
                symbol: symbol.to_string(),
            });
        }
        PriceSeries::new(symbol, points)
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Daily points starting 2020-01-01.
pub fn make_points(closes: &[f64]) -> Vec<PricePoint> {
    let start = date(2020, 1, 1);
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| PricePoint {
            date: start + chrono::Duration::days(i as i64),
            close,
        })
        .collect()
}

pub fn make_series(closes: &[f64]) -> PriceSeries {
    PriceSeries::new("TEST", make_points(closes)).unwrap()
}

pub fn flat(n: usize) -> Vec<f64> {
    vec![100.0; n]
}

pub fn rising(n: usize) -> Vec<f64> {
    (0..n).map(|i| 100.0 + i as f64).collect()
}

/// Trending sine wave; crosses both EMA and RSI thresholds repeatedly.
pub fn oscillating(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| 100.0 + (i as f64 * 0.12).sin() * 15.0 + i as f64 * 0.02)
        .collect()
}

/// Config writing every output under `dir`, with short EMA windows.
pub fn test_run_config(dir: &Path) -> RunConfig {
    RunConfig {
        symbol: "TEST".to_string(),
        start_date: date(2020, 1, 1),
        source: DataSource::Csv {
            dir: dir.to_path_buf(),
        },
        ema: EmaCrossover::new(10, 30).unwrap(),
        summary_path: dir.join("out/strategy_summary.csv"),
        chart_dir: dir.join("charts"),
        ..RunConfig::default()
    }
}
