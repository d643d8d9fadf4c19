//! Yahoo Finance daily close adapter.
//!
//! Uses the v8 chart API. One request per fetch; a failed request fails the
//! run. Adjusted closes are used when the response carries them.

use crate::domain::error::CompareError;
use crate::domain::price::{PricePoint, PriceSeries};
use crate::ports::data_port::DataPort;
use chrono::{NaiveDate, Utc};
use serde::Deserialize;

const BASE_URL: &str = "https://query2.finance.yahoo.com/v8/finance/chart";
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) stratcompare";

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
    adjclose: Option<Vec<AdjCloseData>>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    close: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct AdjCloseData {
    adjclose: Vec<Option<f64>>,
}

pub struct YahooAdapter {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl YahooAdapter {
    pub fn new() -> Result<Self, CompareError> {
        Self::with_base_url(BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, CompareError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| CompareError::DataFetch {
                symbol: String::new(),
                reason: format!("failed to build HTTP client: {}", e),
            })?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    fn chart_url(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> String {
        let start_ts = start.and_time(chrono::NaiveTime::MIN).and_utc().timestamp();
        let end_ts = end
            .succ_opt()
            .unwrap_or(end)
            .and_time(chrono::NaiveTime::MIN)
            .and_utc()
            .timestamp();
        format!(
            "{}/{symbol}?period1={start_ts}&period2={end_ts}&interval=1d&includeAdjustedClose=true",
            self.base_url
        )
    }
}

/// Turn a chart API body into close points, skipping bars with no close.
fn parse_chart(symbol: &str, body: &str) -> Result<Vec<PricePoint>, CompareError> {
    let fetch_error = |reason: String| CompareError::DataFetch {
        symbol: symbol.to_string(),
        reason,
    };

    let resp: ChartResponse =
        serde_json::from_str(body).map_err(|e| fetch_error(format!("malformed response: {}", e)))?;

    let results = match (resp.chart.result, resp.chart.error) {
        (_, Some(err)) if err.code == "Not Found" => {
            return Err(CompareError::NoData {
                symbol: symbol.to_string(),
            });
        }
        (_, Some(err)) => return Err(fetch_error(format!("{}: {}", err.code, err.description))),
        (Some(results), None) => results,
        (None, None) => return Err(fetch_error("empty result with no error".into())),
    };

    let Some(data) = results.into_iter().next() else {
        return Err(CompareError::NoData {
            symbol: symbol.to_string(),
        });
    };
    let timestamps = data.timestamp.unwrap_or_default();
    let closes = data
        .indicators
        .adjclose
        .and_then(|v| v.into_iter().next())
        .map(|a| a.adjclose)
        .or_else(|| data.indicators.quote.into_iter().next().map(|q| q.close))
        .ok_or_else(|| fetch_error("no close data".into()))?;

    let mut points: Vec<PricePoint> = Vec::with_capacity(timestamps.len());
    for (i, &ts) in timestamps.iter().enumerate() {
        let Some(close) = closes.get(i).copied().flatten() else {
            continue;
        };
        let date = chrono::DateTime::from_timestamp(ts, 0)
            .map(|dt| dt.date_naive())
            .ok_or_else(|| fetch_error(format!("invalid timestamp: {}", ts)))?;
        // intraday snapshot of the current session can share a date with the last bar
        if points.last().is_some_and(|p| p.date == date) {
            points.pop();
        }
        points.push(PricePoint { date, close });
    }
    Ok(points)
}

impl DataPort for YahooAdapter {
    fn fetch_closes(&self, symbol: &str, start: NaiveDate) -> Result<PriceSeries, CompareError> {
        let url = self.chart_url(symbol, start, Utc::now().date_naive());
        log::debug!("GET {}", url);

        let fetch_error = |reason: String| CompareError::DataFetch {
            symbol: symbol.to_string(),
            reason,
        };
        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| fetch_error(format!("request failed: {}", e)))?;
        let status = response.status();
        let body = response
            .text()
            .map_err(|e| fetch_error(format!("failed to read body: {}", e)))?;
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(CompareError::NoData {
                symbol: symbol.to_string(),
            });
        }
        if !status.is_success() {
            return Err(fetch_error(format!("HTTP {}", status)));
        }

        let points: Vec<PricePoint> = parse_chart(symbol, &body)?
            .into_iter()
            .filter(|p| p.date >= start)
            .collect();
        if points.is_empty() {
            return Err(CompareError::NoData {
                symbol: symbol.to_string(),
            });
        }
        PriceSeries::new(symbol, points)
    }
}
