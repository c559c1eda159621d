//! Per-destination demand and revenue forecasting.
//!
//! Bookings over a one-year lookback are bucketed per destination by calendar
//! period. Long series get a blended three-regressor ensemble; short series a
//! single cached linear fit. The linear model is the only persisted artifact:
//! ensembles are cheap to retrain and are rebuilt on every call.

pub mod seasonal;

use std::collections::BTreeMap;

use chrono::Datelike;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cache::ModelStore;
use crate::config::AnalyticsConfig;
use crate::data::{BookingRequest, DataProvider, RequestStatus};
use crate::error::Result;
use crate::models::{LinearRegression, Model, TreeConfig};
use crate::utils::stats::clamp;

/// Lookback window for demand history.
const LOOKBACK_DAYS: u32 = 365;
/// Minimum bookings a destination needs to be forecast at all.
const MIN_REQUESTS: usize = 4;
/// Minimum aggregated periods a destination needs.
const MIN_BUCKETS: usize = 3;
/// Periods required before the ensemble path is used.
const ENSEMBLE_MIN_BUCKETS: usize = 6;
/// Slope thresholds classifying the trend.
const TREND_SLOPE: f64 = 0.5;
/// Confidence clamp bounds.
const CONFIDENCE_MIN: f64 = 0.30;
const CONFIDENCE_MAX: f64 = 0.95;
/// Price assumed when neither bookings nor the catalog give one.
const DEFAULT_AVG_PRICE: f64 = 75_000.0;
/// Conversion and cancellation levels worth calling out.
const HIGH_CONVERSION: f64 = 0.6;
const HIGH_CANCELLATION: f64 = 0.3;

/// Calendar bucketing for demand aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    /// ISO week buckets.
    Weekly,
    /// Calendar month buckets.
    Monthly,
}

/// Direction of a fitted demand slope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Rising,
    Falling,
    Stable,
}

impl Trend {
    fn from_slope(slope: f64) -> Self {
        if slope > TREND_SLOPE {
            Trend::Rising
        } else if slope < -TREND_SLOPE {
            Trend::Falling
        } else {
            Trend::Stable
        }
    }
}

impl std::fmt::Display for Trend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Trend::Rising => "rising",
            Trend::Falling => "falling",
            Trend::Stable => "stable",
        };
        f.write_str(s)
    }
}

/// Demand and revenue outlook for one destination.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DestinationForecast {
    pub destination: String,
    pub current_demand: u32,
    pub predicted_demand: u32,
    pub current_revenue: f64,
    pub predicted_revenue: f64,
    /// Always within `[0.30, 0.95]`.
    pub confidence: f64,
    pub trend: Trend,
    pub recommendation: String,
}

/// Per-destination demand forecaster.
pub struct DemandForecaster<P> {
    provider: P,
    store: ModelStore,
    tree_config: TreeConfig,
}

impl<P: DataProvider> DemandForecaster<P> {
    /// Create a forecaster; previously persisted models load eagerly.
    pub fn new(provider: P, config: &AnalyticsConfig) -> Self {
        Self {
            provider,
            store: ModelStore::open(&config.model_dir),
            tree_config: TreeConfig::default(),
        }
    }

    /// Forecast every qualifying destination (or just `destination` when
    /// given), sorted by predicted demand descending.
    pub fn forecast(
        &self,
        destination: Option<&str>,
        granularity: Granularity,
    ) -> Result<Vec<DestinationForecast>> {
        let requests = self.provider.requests(LOOKBACK_DAYS)?;
        let tours = self.provider.tours(false)?;

        let mut by_destination: BTreeMap<&str, Vec<&BookingRequest>> = BTreeMap::new();
        for request in &requests {
            if destination.map_or(true, |d| d == request.destination) {
                by_destination
                    .entry(request.destination.as_str())
                    .or_default()
                    .push(request);
            }
        }

        let global_conversion = conversion_rate(&requests);

        let mut forecasts = Vec::new();
        for (dest, dest_requests) in by_destination {
            if dest_requests.len() < MIN_REQUESTS {
                debug!(destination = dest, count = dest_requests.len(), "skipping: too few bookings");
                continue;
            }

            let counts = bucket_counts(&dest_requests, granularity);
            if counts.len() < MIN_BUCKETS {
                debug!(destination = dest, buckets = counts.len(), "skipping: too few periods");
                continue;
            }

            let (predicted, slope, confidence) = self.fit_destination(dest, &counts)?;
            let current = counts[counts.len() - 1] as u32;
            let trend = Trend::from_slope(slope);

            let rate = destination_conversion(&dest_requests).unwrap_or(global_conversion);
            let price = destination_price(&dest_requests, &tours, dest);

            let recommendation = build_recommendation(dest, trend, &dest_requests);

            forecasts.push(DestinationForecast {
                destination: dest.to_string(),
                current_demand: current,
                predicted_demand: predicted,
                current_revenue: current as f64 * rate * price,
                predicted_revenue: predicted as f64 * rate * price,
                confidence,
                trend,
                recommendation,
            });
        }

        forecasts.sort_by(|a, b| {
            b.predicted_demand
                .cmp(&a.predicted_demand)
                .then_with(|| a.destination.cmp(&b.destination))
        });
        Ok(forecasts)
    }

    /// Fit the appropriate model for one destination's period counts and
    /// predict the next period. Returns (prediction, slope, confidence).
    fn fit_destination(&self, dest: &str, counts: &[f64]) -> Result<(u32, f64, f64)> {
        let next = counts.len() as f64;

        if counts.len() >= ENSEMBLE_MIN_BUCKETS {
            let blend = Model::fit_blended(counts, &self.tree_config)?;
            let linear = LinearRegression::fit_ordinal(counts)?;
            // First sighting seeds the persistent cache; the ensemble itself
            // is never persisted.
            if self.store.get(dest).is_none() {
                self.store.insert(dest, linear.clone());
            }

            let metrics = blend.score_ordinal(counts)?;
            let confidence = clamp(metrics.r_squared, CONFIDENCE_MIN, CONFIDENCE_MAX);
            let predicted = blend.predict(next).max(0.0) as u32;
            Ok((predicted, linear.slope, confidence))
        } else {
            let model = match self.store.get(dest) {
                Some(cached) => cached,
                None => {
                    let fitted = LinearRegression::fit_ordinal(counts)?;
                    self.store.insert(dest, fitted.clone());
                    fitted
                }
            };

            let metrics = model.score_ordinal(counts)?;
            let confidence = clamp(metrics.r_squared, CONFIDENCE_MIN, CONFIDENCE_MAX);
            let predicted = model.predict(next).max(0.0) as u32;
            Ok((predicted, model.slope, confidence))
        }
    }

    /// The persistent model cache backing this forecaster.
    pub fn model_store(&self) -> &ModelStore {
        &self.store
    }
}

/// Counts per observed calendar bucket, in chronological order.
fn bucket_counts(requests: &[&BookingRequest], granularity: Granularity) -> Vec<f64> {
    let mut buckets: BTreeMap<(i32, u32), u64> = BTreeMap::new();
    for request in requests {
        let key = match granularity {
            Granularity::Weekly => {
                let week = request.created_at.iso_week();
                (week.year(), week.week())
            }
            Granularity::Monthly => (request.created_at.year(), request.created_at.month()),
        };
        *buckets.entry(key).or_insert(0) += 1;
    }
    buckets.into_values().map(|c| c as f64).collect()
}

/// Completed / total over a request set. 0 when empty.
fn conversion_rate(requests: &[BookingRequest]) -> f64 {
    if requests.is_empty() {
        return 0.0;
    }
    let completed = requests
        .iter()
        .filter(|r| r.status == RequestStatus::Completed)
        .count();
    completed as f64 / requests.len() as f64
}

/// Destination conversion, or `None` when it has no completed bookings.
fn destination_conversion(requests: &[&BookingRequest]) -> Option<f64> {
    let completed = requests
        .iter()
        .filter(|r| r.status == RequestStatus::Completed)
        .count();
    if completed == 0 {
        None
    } else {
        Some(completed as f64 / requests.len() as f64)
    }
}

/// Average price for a destination: completed bookings first, then the tour
/// catalog, then a fixed default.
fn destination_price(
    requests: &[&BookingRequest],
    tours: &[crate::data::Tour],
    dest: &str,
) -> f64 {
    let completed_prices: Vec<f64> = requests
        .iter()
        .filter(|r| r.status == RequestStatus::Completed)
        .map(|r| r.price)
        .collect();
    if !completed_prices.is_empty() {
        return completed_prices.iter().sum::<f64>() / completed_prices.len() as f64;
    }

    let catalog_prices: Vec<f64> = tours
        .iter()
        .filter(|t| t.destination == dest)
        .map(|t| t.price)
        .collect();
    if !catalog_prices.is_empty() {
        return catalog_prices.iter().sum::<f64>() / catalog_prices.len() as f64;
    }

    DEFAULT_AVG_PRICE
}

/// Assemble at most three distinct signals into the manager-facing text.
fn build_recommendation(dest: &str, trend: Trend, requests: &[&BookingRequest]) -> String {
    let mut signals: Vec<String> = Vec::new();

    let completed = requests
        .iter()
        .filter(|r| r.status == RequestStatus::Completed)
        .count();
    let cancelled = requests
        .iter()
        .filter(|r| r.status == RequestStatus::Cancelled)
        .count();
    let total = requests.len() as f64;

    if completed as f64 / total > HIGH_CONVERSION {
        signals.push(format!(
            "High conversion in {dest}; consider expanding capacity"
        ));
    }
    if cancelled as f64 / total > HIGH_CANCELLATION {
        signals.push(format!(
            "High cancellation rate in {dest}; review the offer quality"
        ));
    }

    signals.push(match trend {
        Trend::Rising => format!("Increase the tour supply for {dest}"),
        Trend::Falling => format!("Consider discounts or promotions for {dest}"),
        Trend::Stable => format!("Maintain the current supply level for {dest}"),
    });

    signals.retain(|s| !s.is_empty());
    signals.dedup();
    signals.truncate(3);
    signals.join("; ")
}
