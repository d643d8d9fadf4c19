//! End-to-end comparison runs against in-memory prices.
//!
//! Tests cover:
//! - Full pipeline with mock data port, HTML charts and CSV summary
//! - Output toggles (per-strategy charts, persistence)
//! - Data errors aborting the run before anything is written
//! - Known-answer scenarios on flat and rising series

mod common;

use approx::assert_relative_eq;
use common::*;
use std::cell::RefCell;
use std::fs;
use stratcompare::adapters::csv_adapter::load_table;
use stratcompare::cli::{default_strategies, run_pipeline, run_pipeline_with_report};
use stratcompare::domain::error::CompareError;
use stratcompare::domain::metrics::COMPARISON_METRICS;
use stratcompare::domain::position::Side;
use stratcompare::domain::price::PriceSeries;
use stratcompare::domain::registry::{
    build_registry, StrategyRegistry, StrategyRun, BASELINE_NAME, EMA_STRATEGY_NAME,
    RSI_STRATEGY_NAME,
};
use stratcompare::ports::report_port::ReportPort;
use std::path::PathBuf;
use tempfile::TempDir;

/// Records what the pipeline asked to chart instead of writing files.
struct MockReportPort {
    comparisons: RefCell<Vec<(String, Vec<String>)>>,
    strategies: RefCell<Vec<String>>,
}

impl MockReportPort {
    fn new() -> Self {
        Self {
            comparisons: RefCell::new(Vec::new()),
            strategies: RefCell::new(Vec::new()),
        }
    }
}

impl ReportPort for MockReportPort {
    fn write_comparison(
        &self,
        symbol: &str,
        registry: &StrategyRegistry,
    ) -> Result<Vec<PathBuf>, CompareError> {
        let names: Vec<String> = registry.names().into_iter().map(String::from).collect();
        self.comparisons.borrow_mut().push((symbol.to_string(), names));
        Ok(Vec::new())
    }

    fn write_strategy(
        &self,
        _prices: &PriceSeries,
        run: &StrategyRun,
    ) -> Result<PathBuf, CompareError> {
        self.strategies.borrow_mut().push(run.name.clone());
        Ok(PathBuf::from(format!("{}.html", run.name)))
    }
}

mod full_pipeline {
    use super::*;

    #[test]
    fn writes_charts_and_summary() {
        let dir = TempDir::new().unwrap();
        let config = test_run_config(dir.path());
        let port = MockDataPort::new().with_closes("TEST", &oscillating(300));

        let table = run_pipeline(&port, &config).unwrap();

        let charts = dir.path().join("charts");
        for page in [
            "equity_curves.html",
            "drawdowns.html",
            "ema_crossover.html",
            "rsi_strategy.html",
        ] {
            assert!(charts.join(page).exists(), "missing {page}");
        }
        assert!(!charts.join("buy_hold.html").exists());

        let equity = fs::read_to_string(charts.join("equity_curves.html")).unwrap();
        assert!(equity.contains("TEST Strategy Equity Curves"));
        assert!(equity.contains("<svg"));

        assert_eq!(
            table.strategies(),
            &[EMA_STRATEGY_NAME, RSI_STRATEGY_NAME, BASELINE_NAME]
        );
        assert_eq!(table.metrics(), &COMPARISON_METRICS);

        let loaded = load_table(&config.summary_path).unwrap();
        assert_eq!(loaded.metrics(), table.metrics());
        assert_eq!(loaded.strategies(), table.strategies());
        for metric in COMPARISON_METRICS {
            for strategy in table.strategies() {
                assert_relative_eq!(
                    loaded.get(metric, strategy).unwrap(),
                    table.get(metric, strategy).unwrap(),
                    max_relative = 1e-12
                );
            }
        }
    }

    #[test]
    fn rerun_overwrites_summary() {
        let dir = TempDir::new().unwrap();
        let config = test_run_config(dir.path());
        let port = MockDataPort::new().with_closes("TEST", &oscillating(300));

        let first = run_pipeline(&port, &config).unwrap();
        let second = run_pipeline(&port, &config).unwrap();
        assert_eq!(first, second);
        assert_eq!(load_table(&config.summary_path).unwrap().strategies().len(), 3);
    }

    #[test]
    fn strategy_plots_disabled() {
        let dir = TempDir::new().unwrap();
        let mut config = test_run_config(dir.path());
        config.strategy_plots = false;
        let port = MockDataPort::new().with_closes("TEST", &oscillating(120));
        let report = MockReportPort::new();

        run_pipeline_with_report(&port, &report, &config).unwrap();

        assert_eq!(report.comparisons.borrow().len(), 1);
        assert!(report.strategies.borrow().is_empty());
    }

    #[test]
    fn strategy_pages_skip_baseline() {
        let dir = TempDir::new().unwrap();
        let config = test_run_config(dir.path());
        let port = MockDataPort::new().with_closes("TEST", &oscillating(120));
        let report = MockReportPort::new();

        run_pipeline_with_report(&port, &report, &config).unwrap();

        let comparisons = report.comparisons.borrow();
        assert_eq!(comparisons[0].0, "TEST");
        assert_eq!(
            comparisons[0].1,
            vec![EMA_STRATEGY_NAME, RSI_STRATEGY_NAME, BASELINE_NAME]
        );
        assert_eq!(
            *report.strategies.borrow(),
            vec![EMA_STRATEGY_NAME.to_string(), RSI_STRATEGY_NAME.to_string()]
        );
    }

    #[test]
    fn save_results_disabled() {
        let dir = TempDir::new().unwrap();
        let mut config = test_run_config(dir.path());
        config.save_results = false;
        let port = MockDataPort::new().with_closes("TEST", &oscillating(120));

        run_pipeline_with_report(&port, &MockReportPort::new(), &config).unwrap();
        assert!(!config.summary_path.exists());
    }

    #[test]
    fn show_details_does_not_change_table() {
        let dir = TempDir::new().unwrap();
        let mut config = test_run_config(dir.path());
        config.save_results = false;
        let port = MockDataPort::new().with_closes("TEST", &oscillating(120));

        let quiet = run_pipeline_with_report(&port, &MockReportPort::new(), &config).unwrap();
        config.show_details = true;
        let verbose = run_pipeline_with_report(&port, &MockReportPort::new(), &config).unwrap();
        assert_eq!(quiet, verbose);
    }

    #[test]
    fn start_date_trims_history() {
        let dir = TempDir::new().unwrap();
        let mut config = test_run_config(dir.path());
        config.save_results = false;
        let port = MockDataPort::new().with_closes("TEST", &rising(100));

        config.start_date = date(2020, 3, 1);
        let trimmed = run_pipeline_with_report(&port, &MockReportPort::new(), &config).unwrap();
        config.start_date = date(2020, 1, 1);
        let full = run_pipeline_with_report(&port, &MockReportPort::new(), &config).unwrap();

        let hold_trimmed = trimmed.get("total_return", BASELINE_NAME).unwrap();
        let hold_full = full.get("total_return", BASELINE_NAME).unwrap();
        assert!(hold_trimmed < hold_full);
    }
}

mod data_errors {
    use super::*;

    #[test]
    fn fetch_failure_aborts_before_output() {
        let dir = TempDir::new().unwrap();
        let config = test_run_config(dir.path());
        let port = MockDataPort::new().with_error("TEST", "connection refused");

        let err = run_pipeline(&port, &config).unwrap_err();
        assert!(matches!(err, CompareError::DataFetch { reason, .. } if reason == "connection refused"));
        assert!(!dir.path().join("charts").exists());
        assert!(!config.summary_path.exists());
    }

    #[test]
    fn unknown_symbol_is_no_data() {
        let dir = TempDir::new().unwrap();
        let config = test_run_config(dir.path());
        let port = MockDataPort::new().with_closes("OTHER", &rising(50));

        let err = run_pipeline(&port, &config).unwrap_err();
        assert!(matches!(err, CompareError::NoData { symbol } if symbol == "TEST"));
    }

    #[test]
    fn start_after_history_is_no_data() {
        let dir = TempDir::new().unwrap();
        let mut config = test_run_config(dir.path());
        config.start_date = date(2030, 1, 1);
        let port = MockDataPort::new().with_closes("TEST", &rising(50));

        assert!(matches!(
            run_pipeline(&port, &config),
            Err(CompareError::NoData { .. })
        ));
    }

    #[test]
    fn invalid_backtest_config_rejected() {
        let dir = TempDir::new().unwrap();
        let mut config = test_run_config(dir.path());
        config.backtest.initial_cash = 0.0;
        let port = MockDataPort::new().with_closes("TEST", &rising(50));

        assert!(matches!(
            run_pipeline_with_report(&port, &MockReportPort::new(), &config),
            Err(CompareError::InvalidParameter { name, .. }) if name == "initial_cash"
        ));
        assert!(!config.summary_path.exists());
    }
}

mod scenarios {
    use super::*;
    use stratcompare::domain::backtest::BacktestConfig;
    use stratcompare::domain::registry::StrategySpec;
    use stratcompare::domain::signal::EmaCrossover;

    fn ema_run(prices: &PriceSeries, ema: EmaCrossover) -> StrategyRegistry {
        build_registry(
            prices,
            vec![StrategySpec::new(EMA_STRATEGY_NAME, ema)],
            Some(BASELINE_NAME),
            &BacktestConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn flat_prices_never_cross() {
        let prices = make_series(&flat(300));
        let registry = ema_run(&prices, EmaCrossover::default());

        let run = registry.get(EMA_STRATEGY_NAME).unwrap();
        assert!(run.result.orders().is_empty());
        assert!((run.result.final_equity() - 10_000.0).abs() < f64::EPSILON);
        assert!(run.result.metric("total_return").unwrap().abs() < f64::EPSILON);
        assert!(run.result.metric("max_dd").unwrap().abs() < f64::EPSILON);
    }

    #[test]
    fn rising_prices_enter_once_when_slow_is_ready() {
        let prices = make_series(&rising(300));
        let registry = ema_run(&prices, EmaCrossover::default());

        let orders = registry.get(EMA_STRATEGY_NAME).unwrap().result.orders();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].index, 199);
        assert_eq!(orders[0].side, Side::Buy);
        assert!((orders[0].price - 299.0).abs() < f64::EPSILON);
    }

    #[test]
    fn short_windows_enter_earlier() {
        let prices = make_series(&rising(100));
        let registry = ema_run(&prices, EmaCrossover::new(10, 30).unwrap());

        let orders = registry.get(EMA_STRATEGY_NAME).unwrap().result.orders();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].index, 29);
    }

    #[test]
    fn buy_and_hold_pays_entry_commission() {
        let closes = rising(300);
        let prices = make_series(&closes);
        let registry = ema_run(&prices, EmaCrossover::default());

        let fee = BacktestConfig::default().commission;
        let expected = (closes[299] / (closes[0] * (1.0 + fee)) - 1.0) * 100.0;
        let hold = &registry.get(BASELINE_NAME).unwrap().result;
        assert_relative_eq!(hold.metric("total_return").unwrap(), expected, epsilon = 1e-9);
        assert!(hold.metric("max_dd").unwrap().abs() < f64::EPSILON);
    }

    #[test]
    fn rising_market_favors_buy_and_hold() {
        let prices = make_series(&rising(300));
        let registry = build_registry(
            &prices,
            default_strategies(&test_run_config(std::path::Path::new("."))),
            Some(BASELINE_NAME),
            &BacktestConfig::default(),
        )
        .unwrap();

        let hold = registry.get(BASELINE_NAME).unwrap().result.metric("total_return").unwrap();
        let ema = registry.get(EMA_STRATEGY_NAME).unwrap().result.metric("total_return").unwrap();
        assert!(hold > ema);
        assert!(ema > 0.0);
    }
}
