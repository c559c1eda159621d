//! Deterministic price-tier clustering of the active catalog.
//!
//! Tiers are fixed price bands, not statistically derived: the partition must
//! be stable across calls and explainable to operators. A requested cluster
//! count is accepted for interface compatibility but not honored.

use std::collections::HashMap;

use serde::Serialize;

use crate::data::{DataProvider, RequestStatus, Tour};
use crate::error::Result;

/// Upper price bound of the budget tier (exclusive).
pub const BUDGET_MAX_PRICE: f64 = 60_000.0;
/// Upper price bound of the mid tier (inclusive).
pub const MID_MAX_PRICE: f64 = 100_000.0;

/// Booking window used for popularity and conversion numbers.
const POPULARITY_WINDOW_DAYS: u32 = 90;

/// Popularity boundaries for the tier label.
const LOW_POPULARITY_MAX: u64 = 20;
const MEDIUM_POPULARITY_MAX: u64 = 60;

/// Fixed price tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceTier {
    Budget,
    Mid,
    Premium,
}

impl PriceTier {
    /// Classify a price into its tier.
    pub fn of(price: f64) -> Self {
        if price < BUDGET_MAX_PRICE {
            PriceTier::Budget
        } else if price <= MID_MAX_PRICE {
            PriceTier::Mid
        } else {
            PriceTier::Premium
        }
    }

    /// Stable cluster id: budget 0, mid 1, premium 2.
    pub fn id(self) -> usize {
        match self {
            PriceTier::Budget => 0,
            PriceTier::Mid => 1,
            PriceTier::Premium => 2,
        }
    }

    /// Tier name.
    pub fn name(self) -> &'static str {
        match self {
            PriceTier::Budget => "budget",
            PriceTier::Mid => "mid",
            PriceTier::Premium => "premium",
        }
    }
}

/// One tour inside a cluster, with its booking count.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterMember {
    pub tour_id: i64,
    pub name: String,
    pub price: f64,
    pub duration_days: u32,
    pub popularity: u64,
}

/// Statistics for one non-empty price tier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TourCluster {
    pub cluster_id: usize,
    pub tier: PriceTier,
    /// Derived from duration and popularity categories.
    pub label: String,
    pub avg_price: f64,
    pub avg_duration: f64,
    pub total_popularity: u64,
    /// Completed / total bookings across the tier's tours, 0 when unbooked.
    pub avg_conversion: f64,
    /// Sorted by popularity descending.
    pub members: Vec<ClusterMember>,
}

/// Fixed-tier cluster engine.
pub struct ClusterEngine<P> {
    provider: P,
}

impl<P: DataProvider> ClusterEngine<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Partition the active catalog into the three price tiers.
    ///
    /// `_requested_clusters` exists for interface compatibility; the tier
    /// boundaries are fixed domain constants.
    pub fn clusters(&self, _requested_clusters: usize) -> Result<Vec<TourCluster>> {
        let tours = self.provider.tours(true)?;
        let requests = self.provider.requests(POPULARITY_WINDOW_DAYS)?;

        let mut popularity: HashMap<i64, u64> = HashMap::new();
        let mut completed: HashMap<i64, u64> = HashMap::new();
        for request in &requests {
            *popularity.entry(request.tour_id).or_insert(0) += 1;
            if request.status == RequestStatus::Completed {
                *completed.entry(request.tour_id).or_insert(0) += 1;
            }
        }

        let mut tiers: [Vec<&Tour>; 3] = [Vec::new(), Vec::new(), Vec::new()];
        for tour in &tours {
            tiers[PriceTier::of(tour.price).id()].push(tour);
        }

        let mut clusters = Vec::new();
        for (tier, members) in [PriceTier::Budget, PriceTier::Mid, PriceTier::Premium]
            .into_iter()
            .zip(tiers)
        {
            if members.is_empty() {
                continue;
            }

            let n = members.len() as f64;
            let avg_price = members.iter().map(|t| t.price).sum::<f64>() / n;
            let avg_duration = members.iter().map(|t| t.duration_days as f64).sum::<f64>() / n;

            let total_popularity: u64 = members
                .iter()
                .map(|t| popularity.get(&t.id).copied().unwrap_or(0))
                .sum();
            let total_completed: u64 = members
                .iter()
                .map(|t| completed.get(&t.id).copied().unwrap_or(0))
                .sum();
            let avg_conversion = if total_popularity > 0 {
                total_completed as f64 / total_popularity as f64
            } else {
                0.0
            };

            let mut ranked: Vec<ClusterMember> = members
                .iter()
                .map(|t| ClusterMember {
                    tour_id: t.id,
                    name: t.name.clone(),
                    price: t.price,
                    duration_days: t.duration_days,
                    popularity: popularity.get(&t.id).copied().unwrap_or(0),
                })
                .collect();
            ranked.sort_by(|a, b| {
                b.popularity
                    .cmp(&a.popularity)
                    .then_with(|| a.tour_id.cmp(&b.tour_id))
            });

            clusters.push(TourCluster {
                cluster_id: tier.id(),
                tier,
                label: cluster_label(avg_duration, total_popularity),
                avg_price,
                avg_duration,
                total_popularity,
                avg_conversion,
                members: ranked,
            });
        }

        Ok(clusters)
    }
}

/// Human-readable label from duration and popularity categories.
fn cluster_label(avg_duration: f64, total_popularity: u64) -> String {
    let duration = if avg_duration < 4.0 {
        "short"
    } else if avg_duration <= 7.0 {
        "medium"
    } else {
        "long"
    };
    let popularity = if total_popularity < LOW_POPULARITY_MAX {
        "low"
    } else if total_popularity < MEDIUM_POPULARITY_MAX {
        "medium"
    } else {
        "high"
    };
    format!("{duration}-stay, {popularity}-demand")
}
