//! Rule-based price adjustment suggestions.
//!
//! Tours with enough recent bookings are judged on their own conversion
//! rate; thinly booked tours fall back to a comparison against the average
//! price of their destination's catalog.

use std::collections::HashMap;

use serde::Serialize;

use crate::data::{BookingRequest, DataProvider, RequestStatus, Tour};
use crate::error::Result;

/// Booking window for conversion measurement.
const WINDOW_DAYS: u32 = 90;
/// Bookings needed before conversion is trusted over the market comparison.
const MIN_BOOKINGS: u64 = 5;
const HIGH_CONVERSION: f64 = 0.7;
const LOW_CONVERSION: f64 = 0.3;
/// Market-comparison bands for thinly booked tours.
const OVERPRICED_RATIO: f64 = 1.2;
const UNDERPRICED_RATIO: f64 = 0.8;
/// Adjustments below this absolute amount are noise, not advice.
const MIN_PRICE_DELTA: f64 = 100.0;

/// A single pricing suggestion for one tour.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceAdvice {
    pub tour_id: i64,
    pub name: String,
    pub current_price: f64,
    pub recommended_price: f64,
    /// Expected relative change in demand at the recommended price,
    /// e.g. `0.2` for +20%.
    pub expected_demand_change: f64,
    pub reason: String,
}

/// Conversion- and market-driven price optimizer.
pub struct PriceOptimizer<P> {
    provider: P,
}

impl<P: DataProvider> PriceOptimizer<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Produce price advice for the given tours, or the whole active catalog
    /// when `tour_ids` is `None`.
    pub fn recommendations(&self, tour_ids: Option<&[i64]>) -> Result<Vec<PriceAdvice>> {
        let tours = self.provider.tours(true)?;
        let requests = self.provider.requests(WINDOW_DAYS)?;

        let mut totals: HashMap<i64, u64> = HashMap::new();
        let mut completed: HashMap<i64, u64> = HashMap::new();
        for request in &requests {
            *totals.entry(request.tour_id).or_insert(0) += 1;
            if request.status == RequestStatus::Completed {
                *completed.entry(request.tour_id).or_insert(0) += 1;
            }
        }

        let market = destination_averages(&requests);

        let mut advice = Vec::new();
        for tour in &tours {
            if let Some(ids) = tour_ids {
                if !ids.contains(&tour.id) {
                    continue;
                }
            }

            let total = totals.get(&tour.id).copied().unwrap_or(0);
            let entry = if total >= MIN_BOOKINGS {
                let done = completed.get(&tour.id).copied().unwrap_or(0);
                self.advise_from_conversion(tour, done as f64 / total as f64)
            } else {
                advise_from_market(tour, market.get(tour.destination.as_str()).copied())
            };

            if let Some(entry) = entry {
                advice.push(entry);
            }
        }

        advice.sort_by(|a, b| a.tour_id.cmp(&b.tour_id));
        Ok(advice)
    }

    fn advise_from_conversion(&self, tour: &Tour, conversion: f64) -> Option<PriceAdvice> {
        if conversion > HIGH_CONVERSION {
            let recommended = tour.price * 1.10;
            significant(tour, recommended).then(|| PriceAdvice {
                tour_id: tour.id,
                name: tour.name.clone(),
                current_price: tour.price,
                recommended_price: recommended,
                expected_demand_change: -0.15,
                reason: "High conversion rate supports a price increase".to_string(),
            })
        } else if conversion < LOW_CONVERSION {
            let recommended = tour.price * 0.90;
            significant(tour, recommended).then(|| PriceAdvice {
                tour_id: tour.id,
                name: tour.name.clone(),
                current_price: tour.price,
                recommended_price: recommended,
                expected_demand_change: 0.20,
                reason: "Low conversion rate suggests a price cut".to_string(),
            })
        } else {
            // Mid-range conversion keeps the current price, and a zero delta
            // never clears the significance floor.
            None
        }
    }
}

/// Average booked price per destination over the window, from the requests'
/// price snapshots. Destinations with no recent bookings are absent.
fn destination_averages(requests: &[BookingRequest]) -> HashMap<&str, f64> {
    let mut sums: HashMap<&str, (f64, u64)> = HashMap::new();
    for request in requests {
        let entry = sums
            .entry(request.destination.as_str())
            .or_insert((0.0, 0));
        entry.0 += request.price;
        entry.1 += 1;
    }
    sums.into_iter()
        .map(|(dest, (sum, n))| (dest, sum / n as f64))
        .collect()
}

/// Market comparison for tours without enough bookings of their own. A
/// destination with no booked baseline yields no advice.
fn advise_from_market(tour: &Tour, market_avg: Option<f64>) -> Option<PriceAdvice> {
    let avg = market_avg?;
    if avg <= 0.0 {
        return None;
    }
    if tour.price > avg * OVERPRICED_RATIO {
        let recommended = avg * 1.10;
        significant(tour, recommended).then(|| PriceAdvice {
            tour_id: tour.id,
            name: tour.name.clone(),
            current_price: tour.price,
            recommended_price: recommended,
            expected_demand_change: 0.10,
            reason: format!(
                "Priced well above the {} market average",
                tour.destination
            ),
        })
    } else if tour.price < avg * UNDERPRICED_RATIO {
        let recommended = avg * 0.90;
        significant(tour, recommended).then(|| PriceAdvice {
            tour_id: tour.id,
            name: tour.name.clone(),
            current_price: tour.price,
            recommended_price: recommended,
            expected_demand_change: -0.05,
            reason: format!(
                "Priced well below the {} market average",
                tour.destination
            ),
        })
    } else {
        None
    }
}

fn significant(tour: &Tour, recommended: f64) -> bool {
    (recommended - tour.price).abs() > MIN_PRICE_DELTA
}
