//! CSV price data adapter and comparison table persistence.

use crate::domain::comparison::ComparisonTable;
use crate::domain::error::CompareError;
use crate::domain::price::{PricePoint, PriceSeries};
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};

/// Reads `<SYMBOL>.csv` files with a `date` column and a `close` (or
/// `adj close`) column; other columns are ignored.
pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", symbol))
    }
}

fn column_index(headers: &csv::StringRecord, names: &[&str]) -> Option<usize> {
    names.iter().find_map(|name| {
        headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name))
    })
}

impl DataPort for CsvAdapter {
    fn fetch_closes(&self, symbol: &str, start: NaiveDate) -> Result<PriceSeries, CompareError> {
        let path = self.csv_path(symbol);
        let fetch_error = |reason: String| CompareError::DataFetch {
            symbol: symbol.to_string(),
            reason,
        };

        let content = fs::read_to_string(&path)
            .map_err(|e| fetch_error(format!("failed to read {}: {}", path.display(), e)))?;
        let mut rdr = csv::Reader::from_reader(content.as_bytes());

        let headers = rdr.headers()?.clone();
        let date_col = column_index(&headers, &["date"])
            .ok_or_else(|| fetch_error("missing date column".into()))?;
        let close_col = column_index(&headers, &["adj close", "adj_close", "close"])
            .ok_or_else(|| fetch_error("missing close column".into()))?;

        let mut points = Vec::new();
        for result in rdr.records() {
            let record = result?;
            let date_str = record.get(date_col).unwrap_or_default().trim();
            let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
                .map_err(|e| fetch_error(format!("invalid date {:?}: {}", date_str, e)))?;
            if date < start {
                continue;
            }
            let close_str = record.get(close_col).unwrap_or_default().trim();
            let close: f64 = close_str
                .parse()
                .map_err(|e| fetch_error(format!("invalid close {:?} on {}: {}", close_str, date, e)))?;
            points.push(PricePoint { date, close });
        }

        if points.is_empty() {
            return Err(CompareError::NoData {
                symbol: symbol.to_string(),
            });
        }
        points.sort_by_key(|p| p.date);
        log::debug!("Read {} rows for {} from {}", points.len(), symbol, path.display());
        PriceSeries::new(symbol, points)
    }
}

/// Write `table` as CSV, replacing any existing file.
///
/// Header is an empty corner cell followed by strategy names; each row is a
/// metric name followed by its values.
pub fn persist_table(table: &ComparisonTable, destination: &Path) -> Result<(), CompareError> {
    let persist_error = |source: std::io::Error| CompareError::Persist {
        path: destination.to_path_buf(),
        source,
    };

    if let Some(parent) = destination.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(persist_error)?;
        }
    }
    let file = fs::File::create(destination).map_err(persist_error)?;
    let mut writer = csv::Writer::from_writer(file);

    let mut header = vec![String::new()];
    header.extend(table.strategies().iter().cloned());
    writer.write_record(&header)?;

    for (metric, values) in table.rows() {
        let mut record = vec![metric.to_string()];
        record.extend(values.iter().map(|v| v.to_string()));
        writer.write_record(&record)?;
    }
    writer.flush().map_err(persist_error)?;
    Ok(())
}

/// Read back a table written by [`persist_table`].
pub fn load_table(path: &Path) -> Result<ComparisonTable, CompareError> {
    let mut rdr = csv::Reader::from_path(path)?;
    let strategies: Vec<String> = rdr.headers()?.iter().skip(1).map(String::from).collect();

    let mut metrics = Vec::new();
    let mut values = Vec::new();
    for result in rdr.records() {
        let record = result?;
        let mut fields = record.iter();
        let metric = fields.next().unwrap_or_default().to_string();
        let row = fields
            .map(|field| {
                field.trim().parse::<f64>().map_err(|_| {
                    CompareError::invalid_parameter(
                        &metric,
                        format!("non-numeric value {:?} in {}", field, path.display()),
                    )
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        metrics.push(metric);
        values.push(row);
    }

    ComparisonTable::from_parts(metrics, strategies, values)
}
