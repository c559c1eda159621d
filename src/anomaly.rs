//! Detection of tours whose demand and price are inconsistent.
//!
//! Both scores normalize against catalog averages and saturate at twice the
//! average, so a runaway bestseller cannot push the rest of the catalog's
//! scores toward zero.

use std::collections::HashMap;

use serde::Serialize;

use crate::data::DataProvider;
use crate::error::Result;

/// Booking window for demand measurement.
const WINDOW_DAYS: u32 = 90;
/// Minimum bookings before a tour is scored at all.
const MIN_BOOKINGS: u64 = 3;
/// Score thresholds for the two anomaly classes.
const HIGH_DEMAND: f64 = 0.7;
const LOW_PRICE: f64 = 0.6;
const LOW_DEMAND: f64 = 0.4;
const HIGH_PRICE: f64 = 0.8;
/// Revenue impact factors.
const UNDERPRICED_UPLIFT: f64 = 0.15;
const OVERPRICED_DRAG: f64 = 0.10;

/// The direction of a price/demand inconsistency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    /// Strong demand at a below-market price: room to raise.
    HighDemandLowPrice,
    /// Weak demand at a premium price: trading volume away.
    LowDemandHighPrice,
}

/// A tour flagged as inconsistent, with its scores and suggested action.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnomalousTour {
    pub tour_id: i64,
    pub name: String,
    pub anomaly_type: AnomalyKind,
    /// In `[0, 1]`; 0.5 means exactly catalog-average demand.
    pub demand_score: f64,
    /// In `[0, 1]`; 0.5 means exactly catalog-average price.
    pub price_score: f64,
    pub expected_revenue_impact: f64,
    pub recommendation: String,
}

/// Score-based price/demand anomaly detector.
pub struct AnomalyDetector<P> {
    provider: P,
}

impl<P: DataProvider> AnomalyDetector<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Flag every sufficiently booked tour whose demand and price disagree.
    ///
    /// A tour matches at most one class: the two predicate pairs cannot both
    /// hold for the same scores.
    pub fn detect(&self) -> Result<Vec<AnomalousTour>> {
        let tours = self.provider.tours(true)?;
        let requests = self.provider.requests(WINDOW_DAYS)?;

        let mut popularity: HashMap<i64, u64> = HashMap::new();
        for request in &requests {
            *popularity.entry(request.tour_id).or_insert(0) += 1;
        }

        // Averages over tours that saw any demand; dormant tours would drag
        // the popularity baseline to zero.
        let booked: Vec<(&crate::data::Tour, u64)> = tours
            .iter()
            .filter_map(|t| popularity.get(&t.id).map(|p| (t, *p)))
            .collect();
        if booked.is_empty() {
            return Ok(Vec::new());
        }
        let avg_popularity =
            booked.iter().map(|(_, p)| *p as f64).sum::<f64>() / booked.len() as f64;
        let avg_price = booked.iter().map(|(t, _)| t.price).sum::<f64>() / booked.len() as f64;
        if avg_popularity <= 0.0 || avg_price <= 0.0 {
            return Ok(Vec::new());
        }

        let mut anomalies = Vec::new();
        for (tour, pop) in booked {
            if pop < MIN_BOOKINGS {
                continue;
            }

            let demand_score = (pop as f64 / avg_popularity).min(2.0) / 2.0;
            let price_score = (tour.price / avg_price).min(2.0) / 2.0;

            let flagged = if demand_score > HIGH_DEMAND && price_score < LOW_PRICE {
                Some((
                    AnomalyKind::HighDemandLowPrice,
                    UNDERPRICED_UPLIFT * tour.price * pop as f64,
                    format!(
                        "Demand for {} outruns its price; raise the price by 10-15%",
                        tour.name
                    ),
                ))
            } else if demand_score < LOW_DEMAND && price_score > HIGH_PRICE {
                Some((
                    AnomalyKind::LowDemandHighPrice,
                    -OVERPRICED_DRAG * tour.price * pop as f64,
                    format!(
                        "{} is priced above its demand; lower the price by 10-15% to recover volume",
                        tour.name
                    ),
                ))
            } else {
                None
            };

            if let Some((anomaly_type, expected_revenue_impact, recommendation)) = flagged {
                anomalies.push(AnomalousTour {
                    tour_id: tour.id,
                    name: tour.name.clone(),
                    anomaly_type,
                    demand_score,
                    price_score,
                    expected_revenue_impact,
                    recommendation,
                });
            }
        }

        anomalies.sort_by(|a, b| {
            b.expected_revenue_impact
                .abs()
                .partial_cmp(&a.expected_revenue_impact.abs())
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.tour_id.cmp(&b.tour_id))
        });
        Ok(anomalies)
    }
}
