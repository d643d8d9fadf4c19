//! SVG line charts written into standalone dark-themed HTML pages.

use std::fs;
use std::path::{Path, PathBuf};

use askama::Template;
use chrono::NaiveDate;

use crate::domain::error::CompareError;
use crate::domain::position::Side;
use crate::domain::price::PriceSeries;
use crate::domain::registry::{StrategyRegistry, StrategyRun};
use crate::ports::report_port::ReportPort;

const CHART_WIDTH: f64 = 960.0;
const CHART_HEIGHT: f64 = 420.0;
const MARGIN_LEFT: f64 = 80.0;
const MARGIN_RIGHT: f64 = 20.0;
const MARGIN_TOP: f64 = 50.0;
const MARGIN_BOTTOM: f64 = 50.0;

const BACKGROUND: &str = "#111111";
const TEXT_COLOR: &str = "#f2f5fa";
const AXIS_COLOR: &str = "#506784";
const ENTRY_COLOR: &str = "#00cc96";
const EXIT_COLOR: &str = "#ef553b";
const PALETTE: [&str; 6] = [
    "#636efa", "#ef553b", "#00cc96", "#ab63fa", "#ffa15a", "#19d3f3",
];

pub const EQUITY_PAGE: &str = "equity_curves.html";
pub const DRAWDOWN_PAGE: &str = "drawdowns.html";

#[derive(Debug, Clone, PartialEq)]
pub struct ChartSeries {
    pub name: String,
    pub points: Vec<(NaiveDate, f64)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerKind {
    Entry,
    Exit,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartMarker {
    pub date: NaiveDate,
    pub value: f64,
    pub kind: MarkerKind,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct LineChart {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub series: Vec<ChartSeries>,
    pub markers: Vec<ChartMarker>,
}

impl LineChart {
    pub fn new(title: impl Into<String>, x_label: impl Into<String>, y_label: impl Into<String>) -> Self {
        LineChart {
            title: title.into(),
            x_label: x_label.into(),
            y_label: y_label.into(),
            ..Default::default()
        }
    }

    pub fn with_series(mut self, name: impl Into<String>, points: Vec<(NaiveDate, f64)>) -> Self {
        self.series.push(ChartSeries {
            name: name.into(),
            points,
        });
        self
    }

    pub fn with_markers(mut self, markers: Vec<ChartMarker>) -> Self {
        self.markers.extend(markers);
        self
    }
}

fn fmt_tick(value: f64) -> String {
    if value.abs() >= 1_000.0 {
        format!("{:.0}", value)
    } else {
        format!("{:.2}", value)
    }
}

/// Shared axis extents over every finite point and marker.
struct Bounds {
    start: NaiveDate,
    end: NaiveDate,
    min: f64,
    max: f64,
}

fn bounds(chart: &LineChart) -> Option<Bounds> {
    let points = chart
        .series
        .iter()
        .flat_map(|s| s.points.iter().copied())
        .chain(chart.markers.iter().map(|m| (m.date, m.value)))
        .filter(|(_, v)| v.is_finite());

    let mut acc: Option<Bounds> = None;
    for (date, value) in points {
        acc = Some(match acc {
            None => Bounds {
                start: date,
                end: date,
                min: value,
                max: value,
            },
            Some(b) => Bounds {
                start: b.start.min(date),
                end: b.end.max(date),
                min: b.min.min(value),
                max: b.max.max(value),
            },
        });
    }
    acc
}

struct TickLabel {
    x: String,
    y: String,
    anchor: &'static str,
    text: String,
}

struct Stroke {
    d: String,
    color: &'static str,
}

struct MarkerShape {
    points: String,
    color: &'static str,
}

struct LegendEntry<'a> {
    line_y: f64,
    text_y: f64,
    color: &'static str,
    name: &'a str,
}

/// Plot geometry; absent when the chart has nothing finite to draw.
struct PlotArea<'a> {
    left: f64,
    top: f64,
    right: f64,
    bottom: f64,
    ticks: Vec<TickLabel>,
    x_label: &'a str,
    x_label_x: f64,
    x_label_y: f64,
    y_label: &'a str,
    y_label_y: f64,
    strokes: Vec<Stroke>,
    markers: Vec<MarkerShape>,
    legend: Vec<LegendEntry<'a>>,
    legend_x1: f64,
    legend_x2: f64,
    legend_text_x: f64,
}

#[derive(Template)]
#[template(path = "chart.svg", escape = "html")]
struct ChartSvgTemplate<'a> {
    width: f64,
    height: f64,
    center_x: f64,
    center_y: f64,
    background: &'static str,
    text_color: &'static str,
    axis_color: &'static str,
    title: &'a str,
    plot: Option<PlotArea<'a>>,
}

#[derive(Template)]
#[template(path = "chart_page.html")]
struct ChartPageTemplate<'a> {
    title: &'a str,
    background: &'static str,
    text_color: &'static str,
    charts: Vec<String>,
}

fn render_error(e: askama::Error) -> CompareError {
    CompareError::Io(std::io::Error::other(e.to_string()))
}

fn plot_area<'a>(chart: &'a LineChart, b: &Bounds) -> PlotArea<'a> {
    let plot_width = CHART_WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
    let plot_height = CHART_HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;
    let span_days = ((b.end - b.start).num_days() as f64).max(1.0);
    let (min, range) = if b.max > b.min {
        (b.min, b.max - b.min)
    } else {
        (b.min - 0.5, 1.0)
    };

    let x_scale =
        |d: NaiveDate| -> f64 { MARGIN_LEFT + ((d - b.start).num_days() as f64 / span_days) * plot_width };
    let y_scale = |v: f64| -> f64 { MARGIN_TOP + plot_height - ((v - min) / range) * plot_height };

    let mut ticks: Vec<TickLabel> = [b.max, b.min]
        .into_iter()
        .map(|value| TickLabel {
            x: (MARGIN_LEFT - 5.0).to_string(),
            y: format!("{:.1}", y_scale(value) + 3.0),
            anchor: "end",
            text: fmt_tick(value),
        })
        .collect();
    for (date, anchor) in [(b.start, "start"), (b.end, "end")] {
        ticks.push(TickLabel {
            x: format!("{:.1}", x_scale(date)),
            y: (CHART_HEIGHT - MARGIN_BOTTOM + 15.0).to_string(),
            anchor,
            text: date.to_string(),
        });
    }

    let strokes = chart
        .series
        .iter()
        .enumerate()
        .map(|(i, series)| {
            let mut d = String::new();
            let mut pen_down = false;
            for &(date, value) in &series.points {
                if !value.is_finite() {
                    pen_down = false;
                    continue;
                }
                let cmd = if pen_down { " L" } else { " M" };
                d.push_str(&format!("{} {:.1} {:.1}", cmd, x_scale(date), y_scale(value)));
                pen_down = true;
            }
            Stroke {
                d: d.trim_start().to_string(),
                color: PALETTE[i % PALETTE.len()],
            }
        })
        .collect();

    let markers = chart
        .markers
        .iter()
        .filter(|m| m.value.is_finite())
        .map(|marker| {
            let x = x_scale(marker.date);
            let y = y_scale(marker.value);
            // entries point up, exits point down
            let (tip, base, color) = match marker.kind {
                MarkerKind::Entry => (y - 6.0, y + 4.0, ENTRY_COLOR),
                MarkerKind::Exit => (y + 6.0, y - 4.0, EXIT_COLOR),
            };
            MarkerShape {
                points: format!(
                    "{:.1},{:.1} {:.1},{:.1} {:.1},{:.1}",
                    x,
                    tip,
                    x - 5.0,
                    base,
                    x + 5.0,
                    base
                ),
                color,
            }
        })
        .collect();

    let legend = chart
        .series
        .iter()
        .enumerate()
        .map(|(i, series)| {
            let y = MARGIN_TOP + 12.0 + i as f64 * 16.0;
            LegendEntry {
                line_y: y - 4.0,
                text_y: y,
                color: PALETTE[i % PALETTE.len()],
                name: &series.name,
            }
        })
        .collect();

    PlotArea {
        left: MARGIN_LEFT,
        top: MARGIN_TOP,
        right: CHART_WIDTH - MARGIN_RIGHT,
        bottom: CHART_HEIGHT - MARGIN_BOTTOM,
        ticks,
        x_label: &chart.x_label,
        x_label_x: MARGIN_LEFT + plot_width / 2.0,
        x_label_y: CHART_HEIGHT - 10.0,
        y_label: &chart.y_label,
        y_label_y: MARGIN_TOP + plot_height / 2.0,
        strokes,
        markers,
        legend,
        legend_x1: MARGIN_LEFT + 10.0,
        legend_x2: MARGIN_LEFT + 30.0,
        legend_text_x: MARGIN_LEFT + 36.0,
    }
}

/// Render every series of `chart` on one date axis and one value axis.
pub fn render_svg(chart: &LineChart) -> Result<String, CompareError> {
    let plot = bounds(chart).map(|b| plot_area(chart, &b));
    ChartSvgTemplate {
        width: CHART_WIDTH,
        height: CHART_HEIGHT,
        center_x: CHART_WIDTH / 2.0,
        center_y: CHART_HEIGHT / 2.0,
        background: BACKGROUND,
        text_color: TEXT_COLOR,
        axis_color: AXIS_COLOR,
        title: &chart.title,
        plot,
    }
    .render()
    .map_err(render_error)
}

/// Write `charts` into one standalone HTML page, creating parent directories.
pub fn write_chart_page(path: &Path, title: &str, charts: &[LineChart]) -> Result<(), CompareError> {
    let persist_error = |source: std::io::Error| CompareError::Persist {
        path: path.to_path_buf(),
        source,
    };

    let page = ChartPageTemplate {
        title,
        background: BACKGROUND,
        text_color: TEXT_COLOR,
        charts: charts.iter().map(render_svg).collect::<Result<_, _>>()?,
    };
    let html = page.render().map_err(render_error)?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(persist_error)?;
        }
    }
    fs::write(path, html).map_err(persist_error)?;
    Ok(())
}

/// File-name-safe form of a strategy name, e.g. `"Buy & Hold"` -> `"buy_hold"`.
pub fn slug(name: &str) -> String {
    let mut out = String::new();
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.is_empty() && !out.ends_with('_') {
            out.push('_');
        }
    }
    while out.ends_with('_') {
        out.pop();
    }
    if out.is_empty() {
        out.push_str("strategy");
    }
    out
}

/// Writes chart pages under a single output directory.
pub struct HtmlChartAdapter {
    out_dir: PathBuf,
}

impl HtmlChartAdapter {
    pub fn new(out_dir: PathBuf) -> Self {
        Self { out_dir }
    }
}

impl ReportPort for HtmlChartAdapter {
    fn write_comparison(
        &self,
        symbol: &str,
        registry: &StrategyRegistry,
    ) -> Result<Vec<PathBuf>, CompareError> {
        let mut equity = LineChart::new(
            format!("{} Strategy Equity Curves", symbol),
            "Date",
            "Portfolio Value ($)",
        );
        let mut drawdown = LineChart::new(
            format!("{} Strategy Drawdowns", symbol),
            "Date",
            "Drawdown (%)",
        );
        for run in registry.iter() {
            equity = equity.with_series(
                run.name.clone(),
                run.result.equity().iter().map(|p| (p.date, p.equity)).collect(),
            );
            drawdown = drawdown.with_series(
                run.name.clone(),
                run.result
                    .drawdown()
                    .iter()
                    .map(|p| (p.date, p.equity * 100.0))
                    .collect(),
            );
        }

        let equity_path = self.out_dir.join(EQUITY_PAGE);
        let title = equity.title.clone();
        write_chart_page(&equity_path, &title, &[equity])?;
        let drawdown_path = self.out_dir.join(DRAWDOWN_PAGE);
        let title = drawdown.title.clone();
        write_chart_page(&drawdown_path, &title, &[drawdown])?;
        Ok(vec![equity_path, drawdown_path])
    }

    fn write_strategy(&self, prices: &PriceSeries, run: &StrategyRun) -> Result<PathBuf, CompareError> {
        let markers = run
            .result
            .orders()
            .iter()
            .map(|o| ChartMarker {
                date: o.date,
                value: o.price,
                kind: match o.side {
                    Side::Buy => MarkerKind::Entry,
                    Side::Sell => MarkerKind::Exit,
                },
            })
            .collect();
        let price_chart = LineChart::new(format!("{}: Orders", run.name), "Date", "Price")
            .with_series(
                prices.symbol(),
                prices.points().iter().map(|p| (p.date, p.close)).collect(),
            )
            .with_markers(markers);
        let equity_chart = LineChart::new(format!("{}: Value", run.name), "Date", "Portfolio Value ($)")
            .with_series(
                run.name.clone(),
                run.result.equity().iter().map(|p| (p.date, p.equity)).collect(),
            );

        let path = self.out_dir.join(format!("{}.html", slug(&run.name)));
        let title = format!("{} {}", prices.symbol(), run.name);
        write_chart_page(&path, &title, &[price_chart, equity_chart])?;
        Ok(path)
    }
}
