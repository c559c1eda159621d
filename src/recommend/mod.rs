//! Content-based tour recommendations.
//!
//! Two entry points: [`RecommendationEngine::recommend`] scores the catalog
//! against a user's booking history, and [`RecommendationEngine::similar`]
//! ranks tours by cosine similarity over a cached feature matrix.

pub mod features;

use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use crate::cache::{catalog_hash, FeatureStore};
use crate::config::AnalyticsConfig;
use crate::data::{DataProvider, Tour, UserBooking};
use crate::error::Result;
use crate::utils::stats::clamp;
use features::FeatureSet;

/// Baseline score every candidate starts from.
const BASE_SCORE: f64 = 0.5;
/// Bonus for a destination in the user's top three.
const DESTINATION_BONUS: f64 = 0.2;
/// Maximum bonus for price proximity to the user's average spend.
const PRICE_BONUS: f64 = 0.15;
/// Maximum bonus for duration proximity to the user's average trip length.
const DURATION_BONUS: f64 = 0.1;
/// How many favourite destinations to keep from the history.
const TOP_DESTINATIONS: usize = 3;

/// Hard filters and sizing for a recommendation query.
#[derive(Debug, Clone, Default)]
pub struct RecommendationCriteria {
    pub user_id: Option<i64>,
    pub preferred_destinations: Vec<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub preferred_duration: Option<u32>,
    pub limit: usize,
}

/// A ranked tour with the signals that put it there.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TourRecommendation {
    pub tour_id: i64,
    pub name: String,
    pub destination: String,
    pub price: f64,
    pub duration_days: u32,
    /// In `[0, 1]`.
    pub score: f64,
    pub reason: String,
}

/// Preferences distilled from a user's booking history.
#[derive(Debug, Clone, Default)]
struct UserProfile {
    avg_spend: Option<f64>,
    top_destinations: Vec<String>,
}

impl UserProfile {
    fn from_history(history: &[UserBooking]) -> Self {
        if history.is_empty() {
            return Self::default();
        }

        let avg_spend = history.iter().map(|b| b.price).sum::<f64>() / history.len() as f64;

        let mut counts: HashMap<&str, u64> = HashMap::new();
        for booking in history {
            *counts.entry(booking.destination.as_str()).or_insert(0) += 1;
        }
        let mut ranked: Vec<(&str, u64)> = counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        let top_destinations = ranked
            .into_iter()
            .take(TOP_DESTINATIONS)
            .map(|(d, _)| d.to_string())
            .collect();

        Self {
            avg_spend: Some(avg_spend),
            top_destinations,
        }
    }
}

/// Catalog recommender with a persistent feature-matrix cache.
pub struct RecommendationEngine<P> {
    provider: P,
    store: FeatureStore,
}

impl<P: DataProvider> RecommendationEngine<P> {
    pub fn new(provider: P, config: &AnalyticsConfig) -> Self {
        Self {
            provider,
            store: FeatureStore::open(&config.feature_dir),
        }
    }

    /// Score the active catalog against the criteria and the user's history.
    ///
    /// When the hard filters leave nothing, the first `limit` tours of the
    /// unfiltered catalog are scored instead, in catalog order.
    pub fn recommend(&self, criteria: &RecommendationCriteria) -> Result<Vec<TourRecommendation>> {
        let tours = self.provider.tours(true)?;
        if tours.is_empty() {
            return Ok(Vec::new());
        }

        let profile = match criteria.user_id {
            Some(user_id) => UserProfile::from_history(&self.provider.user_history(user_id)?),
            None => UserProfile::default(),
        };

        let mut candidates = filter_catalog(&tours, criteria);
        if candidates.is_empty() {
            debug!("filters matched nothing, falling back to the top of the catalog");
            candidates = tours.iter().take(criteria.limit.max(1)).collect();
        }

        let mut ranked: Vec<TourRecommendation> = candidates
            .into_iter()
            .map(|tour| score_tour(tour, &profile, criteria))
            .collect();
        ranked.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.tour_id.cmp(&b.tour_id))
        });
        if criteria.limit > 0 {
            ranked.truncate(criteria.limit);
        }
        Ok(ranked)
    }

    /// Rank tours by feature-space similarity to `tour_id`.
    ///
    /// The feature matrix is rebuilt only when the active tour-ID set has
    /// changed since it was last cached.
    pub fn similar(&self, tour_id: i64, limit: usize) -> Result<Vec<TourRecommendation>> {
        let tours = self.provider.tours(true)?;
        let ids: Vec<i64> = tours.iter().map(|t| t.id).collect();
        let hash = catalog_hash(&ids);

        let set = match self.store.get_valid(hash) {
            Some(set) => set,
            None => {
                debug!(tours = tours.len(), "rebuilding the feature matrix");
                let set = FeatureSet::build(&tours, hash);
                self.store.store(set.clone());
                set
            }
        };

        let query_row = match set.row_of(tour_id) {
            Some(row) => row,
            None => return Ok(Vec::new()),
        };

        let by_id: HashMap<i64, &Tour> = tours.iter().map(|t| (t.id, t)).collect();
        let mut scored: Vec<(i64, f64)> = set
            .tour_ids
            .iter()
            .enumerate()
            .filter(|(_, id)| **id != tour_id)
            .map(|(row, id)| (*id, set.similarity(query_row, row)))
            .collect();
        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        scored.truncate(limit);

        let query_name = by_id
            .get(&tour_id)
            .map(|t| t.name.clone())
            .unwrap_or_default();
        Ok(scored
            .into_iter()
            .filter_map(|(id, score)| {
                by_id.get(&id).map(|tour| TourRecommendation {
                    tour_id: tour.id,
                    name: tour.name.clone(),
                    destination: tour.destination.clone(),
                    price: tour.price,
                    duration_days: tour.duration_days,
                    score,
                    reason: format!("Similar to {query_name}"),
                })
            })
            .collect())
    }

    /// Drop the cached feature matrix; the next `similar` call rebuilds it.
    pub fn invalidate(&self) {
        self.store.invalidate();
    }
}

/// Apply price bounds, then destinations. The destination filter is skipped
/// when it would empty the result so a narrow preference list cannot hide
/// the whole catalog.
fn filter_catalog<'a>(tours: &'a [Tour], criteria: &RecommendationCriteria) -> Vec<&'a Tour> {
    let priced: Vec<&Tour> = tours
        .iter()
        .filter(|t| criteria.min_price.map_or(true, |min| t.price >= min))
        .filter(|t| criteria.max_price.map_or(true, |max| t.price <= max))
        .collect();

    if criteria.preferred_destinations.is_empty() {
        return priced;
    }
    let by_destination: Vec<&Tour> = priced
        .iter()
        .copied()
        .filter(|t| criteria.preferred_destinations.contains(&t.destination))
        .collect();
    if by_destination.is_empty() {
        priced
    } else {
        by_destination
    }
}

fn score_tour(
    tour: &Tour,
    profile: &UserProfile,
    criteria: &RecommendationCriteria,
) -> TourRecommendation {
    let mut score = BASE_SCORE;
    let mut reasons: Vec<String> = Vec::new();

    if profile.top_destinations.contains(&tour.destination) {
        score += DESTINATION_BONUS;
        reasons.push(format!("You often travel to {}", tour.destination));
    }

    if let Some(avg) = profile.avg_spend {
        if avg > 0.0 {
            let proximity = 1.0 - clamp((tour.price - avg).abs() / avg, 0.0, 1.0);
            score += PRICE_BONUS * proximity;
            if proximity > 0.7 {
                reasons.push("Matches your usual budget".to_string());
            }
        }
    }

    // The duration bonus responds only to an explicitly requested duration.
    if let Some(preferred) = criteria.preferred_duration.map(f64::from) {
        if preferred > 0.0 {
            let proximity =
                1.0 - clamp((tour.duration_days as f64 - preferred).abs() / preferred, 0.0, 1.0);
            score += DURATION_BONUS * proximity;
            if proximity > 0.7 {
                reasons.push("Fits your preferred trip length".to_string());
            }
        }
    }

    let reason = if reasons.is_empty() {
        "Popular offering".to_string()
    } else {
        reasons.join(". ")
    };

    TourRecommendation {
        tour_id: tour.id,
        name: tour.name.clone(),
        destination: tour.destination.clone(),
        price: tour.price,
        duration_days: tour.duration_days,
        score: clamp(score, 0.0, 1.0),
        reason,
    }
}
