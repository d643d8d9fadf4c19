//! RSI (Relative Strength Index) indicator.
//!
//! Uses Wilder's smoothing for average gain/loss calculation:
//! - First average: simple mean of gains/losses over first n changes
//! - Subsequent: avg = (prev_avg * (n-1) + current) / n
//!
//! Formula: RSI = 100 - (100 / (1 + avg_gain / avg_loss))
//! If avg_loss == 0: RSI = 100, or 50 when avg_gain is also 0 (flat prices).
//!
//! Warmup: first n points are invalid (need n price changes to compute initial average).

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};
use crate::domain::price::{PricePoint, PriceSeries};

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        if avg_gain == 0.0 { 50.0 } else { 100.0 }
    } else {
        100.0 - (100.0 / (1.0 + avg_gain / avg_loss))
    }
}

pub fn calculate_rsi(prices: &PriceSeries, period: usize) -> IndicatorSeries {
    let points = prices.points();
    let invalid = |p: &PricePoint| IndicatorPoint {
        date: p.date,
        valid: false,
        value: 0.0,
    };

    if period == 0 || points.len() < 2 {
        return IndicatorSeries {
            indicator_type: IndicatorType::Rsi(period),
            values: points.iter().map(invalid).collect(),
        };
    }

    let mut values = Vec::with_capacity(points.len());
    values.push(invalid(&points[0]));

    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;
    let mut gain_sum = 0.0;
    let mut loss_sum = 0.0;

    for (i, point) in points.iter().enumerate().skip(1) {
        let change = point.close - points[i - 1].close;
        let gain = if change > 0.0 { change } else { 0.0 };
        let loss = if change < 0.0 { -change } else { 0.0 };
        let change_idx = i - 1;

        if change_idx < period - 1 {
            gain_sum += gain;
            loss_sum += loss;
            values.push(invalid(point));
        } else if change_idx == period - 1 {
            avg_gain = (gain_sum + gain) / period as f64;
            avg_loss = (loss_sum + loss) / period as f64;
            values.push(IndicatorPoint {
                date: point.date,
                valid: true,
                value: rsi_value(avg_gain, avg_loss),
            });
        } else {
            avg_gain = (avg_gain * (period - 1) as f64 + gain) / period as f64;
            avg_loss = (avg_loss * (period - 1) as f64 + loss) / period as f64;
            values.push(IndicatorPoint {
                date: point.date,
                valid: true,
                value: rsi_value(avg_gain, avg_loss),
            });
        }
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Rsi(period),
        values,
    }
}
