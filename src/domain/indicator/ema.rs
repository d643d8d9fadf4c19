//! Exponential Moving Average indicator.
//!
//! k = 2/(n+1), seeded with the first close, then EMA[i] = EMA[i-1] + k*(C[i] - EMA[i-1]).
//! Warmup: first (n-1) points are invalid.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};
use crate::domain::price::PriceSeries;

pub fn calculate_ema(prices: &PriceSeries, period: usize) -> IndicatorSeries {
    if period == 0 {
        return IndicatorSeries {
            indicator_type: IndicatorType::Ema(period),
            values: prices
                .points()
                .iter()
                .map(|p| IndicatorPoint {
                    date: p.date,
                    valid: false,
                    value: 0.0,
                })
                .collect(),
        };
    }

    let mut values = Vec::with_capacity(prices.len());
    let k = 2.0 / (period as f64 + 1.0);
    let mut ema = 0.0;

    for (i, point) in prices.points().iter().enumerate() {
        // Incremental form keeps a constant series exactly constant.
        if i == 0 {
            ema = point.close;
        } else {
            ema += k * (point.close - ema);
        }
        values.push(IndicatorPoint {
            date: point.date,
            valid: i + 1 >= period,
            value: ema,
        });
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Ema(period),
        values,
    }
}
