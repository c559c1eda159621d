//! Aggregate month-ahead demand and price extrapolation.
//!
//! Blends per-calendar-month seasonal averages with a short-term trend slope
//! taken from the most recent months. Aggregate only: per-destination
//! forecasting lives in the parent module.

use std::collections::BTreeMap;

use chrono::Datelike;
use serde::Serialize;

use crate::data::{DataProvider, MonthlyStats};
use crate::error::{AnalyticsError, Result};
use crate::stats::month_name;
use crate::utils::stats::mean;

/// Months of history used to build the seasonality table.
const HISTORY_MONTHS: u32 = 12;
/// Months feeding the short-term trend slope.
const TREND_WINDOW: usize = 3;
/// Demand trend decays by this factor per forecast step.
const TREND_DECAY: f64 = 0.8;
/// Price responds to the demand slope with this multiplier per step.
const PRICE_TREND_FACTOR: f64 = 50.0;
/// Floors applied to the extrapolation.
const MIN_DEMAND: u32 = 1;
const MIN_PRICE: f64 = 1_000.0;
/// Longest supported forecast horizon.
const MAX_HORIZON_MONTHS: u32 = 36;

/// One forecast month of aggregate demand and price.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeasonalPoint {
    pub year: i32,
    /// Calendar month, 1..=12.
    pub month: u32,
    pub month_name: &'static str,
    pub predicted_demand: u32,
    pub predicted_price: f64,
    /// `true` for extrapolated entries (vs. historical records).
    pub forecast: bool,
}

/// Aggregate seasonal trend forecaster.
pub struct SeasonalForecaster<P> {
    provider: P,
}

impl<P: DataProvider> SeasonalForecaster<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Extrapolate `horizon_months` months past the end of history.
    ///
    /// Returns an empty list when there is no monthly history at all.
    pub fn forecast(&self, horizon_months: u32) -> Result<Vec<SeasonalPoint>> {
        if !(1..=MAX_HORIZON_MONTHS).contains(&horizon_months) {
            return Err(AnalyticsError::InvalidParameter(format!(
                "horizon_months must be in 1..={MAX_HORIZON_MONTHS}, got {horizon_months}"
            )));
        }

        let history = self.provider.monthly_stats(HISTORY_MONTHS)?;
        if history.is_empty() {
            return Ok(Vec::new());
        }

        let slope = trend_slope(&history);
        let seasonal = seasonal_table(&history);

        let demands: Vec<f64> = history.iter().map(|m| m.request_count as f64).collect();
        let prices: Vec<f64> = history.iter().map(|m| m.avg_price).collect();
        let overall_demand = mean(&demands);
        let overall_price = mean(&prices);

        let last = history[history.len() - 1].month;
        let mut points = Vec::with_capacity(horizon_months as usize);

        for step in 1..=horizon_months {
            let (year, month) = add_months(last.year(), last.month(), step);
            let (base_demand, base_price) = seasonal
                .get(&month)
                .copied()
                .unwrap_or((overall_demand, overall_price));

            // The demand trend decays with distance; price moves more slowly
            // but accumulates the slope at a fixed per-step rate.
            let demand = base_demand + slope * step as f64 * TREND_DECAY;
            let price = base_price + slope * PRICE_TREND_FACTOR * step as f64;

            points.push(SeasonalPoint {
                year,
                month,
                month_name: month_name(month),
                predicted_demand: (demand.max(MIN_DEMAND as f64)) as u32,
                predicted_price: price.max(MIN_PRICE),
                forecast: true,
            });
        }

        Ok(points)
    }
}

/// Slope over the last up-to-three months: (last − first) / window length.
fn trend_slope(history: &[MonthlyStats]) -> f64 {
    let window = history.len().min(TREND_WINDOW);
    if window < 2 {
        return 0.0;
    }
    let tail = &history[history.len() - window..];
    let first = tail[0].request_count as f64;
    let last = tail[window - 1].request_count as f64;
    (last - first) / window as f64
}

/// Per-calendar-month averages of demand and price.
fn seasonal_table(history: &[MonthlyStats]) -> BTreeMap<u32, (f64, f64)> {
    let mut sums: BTreeMap<u32, (f64, f64, usize)> = BTreeMap::new();
    for record in history {
        let entry = sums.entry(record.month.month()).or_insert((0.0, 0.0, 0));
        entry.0 += record.request_count as f64;
        entry.1 += record.avg_price;
        entry.2 += 1;
    }
    sums.into_iter()
        .map(|(m, (d, p, n))| (m, (d / n as f64, p / n as f64)))
        .collect()
}

/// Calendar month arithmetic without day-of-month pitfalls.
fn add_months(year: i32, month: u32, steps: u32) -> (i32, u32) {
    let zero_based = (month - 1) + steps;
    (year + (zero_based / 12) as i32, zero_based % 12 + 1)
}
