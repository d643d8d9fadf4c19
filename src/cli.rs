//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::chart_html::HtmlChartAdapter;
use crate::adapters::csv_adapter::{persist_table, CsvAdapter};
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::comparison::ComparisonTable;
use crate::domain::config::{build_run_config, DataSource, RunConfig};
use crate::domain::error::CompareError;
use crate::domain::metrics::COMPARISON_METRICS;
use crate::domain::registry::{
    build_registry, StrategyRegistry, StrategySpec, BASELINE_NAME, EMA_STRATEGY_NAME,
    RSI_STRATEGY_NAME,
};
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(
    name = "stratcompare",
    about = "Compare EMA crossover, RSI and buy-and-hold strategies on one symbol"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the strategy comparison
    Run {
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Override the configured symbol
        #[arg(long)]
        symbol: Option<String>,
        /// Read `<SYMBOL>.csv` from this directory instead of downloading
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
    /// Validate a configuration file and print the resolved settings
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let outcome = match cli.command {
        Command::Run {
            config,
            symbol,
            data_dir,
        } => run_compare(config.as_deref(), symbol.as_deref(), data_dir),
        Command::Validate { config } => run_validate(&config),
    };
    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, CompareError> {
    FileConfigAdapter::from_file(path).map_err(|e| CompareError::ConfigParse {
        file: path.display().to_string(),
        reason: e.to_string(),
    })
}

/// Config file (or defaults) with command-line overrides applied.
pub fn resolve_config(
    config_path: Option<&Path>,
    symbol: Option<&str>,
    data_dir: Option<PathBuf>,
) -> Result<RunConfig, CompareError> {
    let mut config = match config_path {
        Some(path) => {
            log::info!("Loading config from {}", path.display());
            build_run_config(&load_config(path)?)?
        }
        None => RunConfig::default(),
    };
    if let Some(symbol) = symbol {
        let symbol = symbol.trim();
        if symbol.is_empty() {
            return Err(CompareError::invalid_parameter("symbol", "symbol must not be empty"));
        }
        config.symbol = symbol.to_uppercase();
    }
    if let Some(dir) = data_dir {
        config.source = DataSource::Csv { dir };
    }
    Ok(config)
}

/// The two signal strategies compared against the baseline.
pub fn default_strategies(config: &RunConfig) -> Vec<StrategySpec> {
    vec![
        StrategySpec::new(EMA_STRATEGY_NAME, config.ema),
        StrategySpec::new(RSI_STRATEGY_NAME, config.rsi),
    ]
}

fn run_compare(
    config_path: Option<&Path>,
    symbol: Option<&str>,
    data_dir: Option<PathBuf>,
) -> Result<(), CompareError> {
    let config = resolve_config(config_path, symbol, data_dir)?;
    match &config.source {
        DataSource::Csv { dir } => run_pipeline(&CsvAdapter::new(dir.clone()), &config)?,
        DataSource::Yahoo => run_with_yahoo(&config)?,
    };
    Ok(())
}

#[cfg(feature = "yahoo")]
fn run_with_yahoo(config: &RunConfig) -> Result<ComparisonTable, CompareError> {
    use crate::adapters::yahoo_adapter::YahooAdapter;

    let adapter = YahooAdapter::new()?;
    run_pipeline(&adapter, config)
}

#[cfg(not(feature = "yahoo"))]
fn run_with_yahoo(config: &RunConfig) -> Result<ComparisonTable, CompareError> {
    Err(CompareError::DataFetch {
        symbol: config.symbol.clone(),
        reason: "built without the yahoo feature; set [data] source = csv".into(),
    })
}

fn run_validate(path: &Path) -> Result<(), CompareError> {
    log::info!("Validating config {}", path.display());
    let config = build_run_config(&load_config(path)?)?;
    println!("{config}");
    log::info!("Config is valid");
    Ok(())
}

/// Fetch, simulate, compare, chart and persist, writing charts as HTML
/// under the configured chart directory.
pub fn run_pipeline(
    data_port: &dyn DataPort,
    config: &RunConfig,
) -> Result<ComparisonTable, CompareError> {
    let charts = HtmlChartAdapter::new(config.chart_dir.clone());
    run_pipeline_with_report(data_port, &charts, config)
}

pub fn run_pipeline_with_report(
    data_port: &dyn DataPort,
    report_port: &dyn ReportPort,
    config: &RunConfig,
) -> Result<ComparisonTable, CompareError> {
    // Stage 1: prices
    log::info!(
        "Fetching {} from {} via {}",
        config.symbol,
        config.start_date,
        config.source
    );
    let prices = data_port.fetch_closes(&config.symbol, config.start_date)?;
    if let (Some(first), Some(last)) = (prices.first_date(), prices.last_date()) {
        log::info!("Loaded {} bars ({} to {})", prices.len(), first, last);
    }

    // Stage 2: simulate every strategy and the baseline
    let registry = build_registry(
        &prices,
        default_strategies(config),
        Some(BASELINE_NAME),
        &config.backtest,
    )?;

    if config.show_details {
        print_details(&registry)?;
    }

    // Stage 3: comparison table
    let table = ComparisonTable::build(&registry, &COMPARISON_METRICS)?;
    println!("\nStrategy Comparison Summary:\n");
    println!("{table}");

    // Stage 4: charts
    for path in report_port.write_comparison(prices.symbol(), &registry)? {
        log::info!("Chart written to {}", path.display());
    }
    if config.strategy_plots {
        for run in registry.iter().filter(|r| r.signals.is_some()) {
            let path = report_port.write_strategy(&prices, run)?;
            log::info!("Chart written to {}", path.display());
        }
    }

    // Stage 5: persist
    if config.save_results {
        persist_table(&table, &config.summary_path)?;
        println!("\nStrategy summary saved to {}", config.summary_path.display());
    }

    Ok(table)
}

/// Full stats for signal strategies; the baseline shows only the compared metrics.
fn print_details(registry: &StrategyRegistry) -> Result<(), CompareError> {
    for run in registry.iter() {
        println!("\n{} Stats ({}):\n", run.name, run.description);
        if run.signals.is_some() {
            println!("{}", run.result.stats());
        } else {
            for metric in COMPARISON_METRICS {
                println!("{:<28}{:.6}", metric, run.result.metric(metric)?);
            }
        }
    }
    Ok(())
}
