//! Tour feature vectors for similarity search.
//!
//! Each tour becomes `[scaled price, scaled duration]` concatenated with a
//! one-hot encoding of its destination. The fitted scaler and the matrix are
//! persisted through the feature cache and keyed to the catalog's identity.

use serde::{Deserialize, Serialize};

use crate::data::Tour;
use crate::utils::stats::{mean, variance};

/// Z-score scaling parameters fitted on one feature column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaleParams {
    pub center: f64,
    pub scale: f64,
}

impl ScaleParams {
    /// Fit center/scale on a column. A near-constant column scales by 1 so
    /// the transform stays defined.
    pub fn fit(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self {
                center: 0.0,
                scale: 1.0,
            };
        }
        let center = mean(values);
        let std = variance(values).sqrt();
        let scale = if std < 1e-10 { 1.0 } else { std };
        Self { center, scale }
    }

    /// Transform a single value.
    pub fn transform(&self, value: f64) -> f64 {
        (value - self.center) / self.scale
    }
}

/// A feature matrix over the active catalog, with everything needed to score
/// similarity and to check the cache's validity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSet {
    /// Hash of the sorted active tour-ID set this matrix was built from.
    pub catalog_hash: u64,
    /// Row order of the matrix.
    pub tour_ids: Vec<i64>,
    /// One-hot column order.
    pub destinations: Vec<String>,
    pub price_scale: ScaleParams,
    pub duration_scale: ScaleParams,
    /// `matrix[row] = [price_z, duration_z, onehot...]`.
    pub matrix: Vec<Vec<f64>>,
}

impl FeatureSet {
    /// Build the feature matrix for the given catalog snapshot.
    pub fn build(tours: &[Tour], catalog_hash: u64) -> Self {
        let prices: Vec<f64> = tours.iter().map(|t| t.price).collect();
        let durations: Vec<f64> = tours.iter().map(|t| t.duration_days as f64).collect();

        let price_scale = ScaleParams::fit(&prices);
        let duration_scale = ScaleParams::fit(&durations);

        let mut destinations: Vec<String> =
            tours.iter().map(|t| t.destination.clone()).collect();
        destinations.sort();
        destinations.dedup();

        let matrix = tours
            .iter()
            .map(|tour| {
                let mut row = Vec::with_capacity(2 + destinations.len());
                row.push(price_scale.transform(tour.price));
                row.push(duration_scale.transform(tour.duration_days as f64));
                for dest in &destinations {
                    row.push(if *dest == tour.destination { 1.0 } else { 0.0 });
                }
                row
            })
            .collect();

        Self {
            catalog_hash,
            tour_ids: tours.iter().map(|t| t.id).collect(),
            destinations,
            price_scale,
            duration_scale,
            matrix,
        }
    }

    /// Row index of a tour, if present.
    pub fn row_of(&self, tour_id: i64) -> Option<usize> {
        self.tour_ids.iter().position(|id| *id == tour_id)
    }

    /// Cosine similarity of two rows, clamped to `[0, 1]`.
    pub fn similarity(&self, a: usize, b: usize) -> f64 {
        cosine_similarity(&self.matrix[a], &self.matrix[b]).max(0.0)
    }

    /// Number of tours in the matrix.
    pub fn len(&self) -> usize {
        self.tour_ids.len()
    }

    /// Whether the matrix is empty.
    pub fn is_empty(&self) -> bool {
        self.tour_ids.is_empty()
    }
}

/// Cosine similarity between two equal-length vectors.
///
/// Returns 0 when either vector has zero magnitude.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let mag_a: f64 = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let mag_b: f64 = b.iter().map(|x| x * x).sum::<f64>().sqrt();
    if mag_a < 1e-12 || mag_b < 1e-12 {
        return 0.0;
    }
    dot / (mag_a * mag_b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{TimeZone, Utc};

    fn tour(id: i64, price: f64, duration: u32, dest: &str) -> Tour {
        Tour {
            id,
            name: format!("Tour {id}"),
            price,
            duration_days: duration,
            destination: dest.to_string(),
            active: true,
            created_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn scale_params_standardize() {
        let params = ScaleParams::fit(&[10.0, 20.0, 30.0]);
        assert_relative_eq!(params.center, 20.0, epsilon = 1e-10);
        assert_relative_eq!(params.transform(20.0), 0.0, epsilon = 1e-10);
        assert!(params.transform(30.0) > 0.0);
        assert!(params.transform(10.0) < 0.0);
    }

    #[test]
    fn constant_column_scales_by_one() {
        let params = ScaleParams::fit(&[7.0; 5]);
        assert_relative_eq!(params.scale, 1.0, epsilon = 1e-10);
        assert_relative_eq!(params.transform(7.0), 0.0, epsilon = 1e-10);
    }

    #[test]
    fn matrix_width_is_numeric_plus_onehot() {
        let tours = vec![
            tour(1, 50_000.0, 7, "Paris"),
            tour(2, 80_000.0, 10, "Rome"),
            tour(3, 120_000.0, 14, "Paris"),
        ];
        let set = FeatureSet::build(&tours, 99);

        assert_eq!(set.len(), 3);
        assert_eq!(set.destinations, vec!["Paris", "Rome"]);
        for row in &set.matrix {
            assert_eq!(row.len(), 4);
        }
        // One-hot columns sum to 1 per row.
        for row in &set.matrix {
            assert_relative_eq!(row[2] + row[3], 1.0, epsilon = 1e-10);
        }
    }

    #[test]
    fn identical_tours_have_similarity_one() {
        let tours = vec![
            tour(1, 60_000.0, 7, "Paris"),
            tour(2, 60_000.0, 7, "Paris"),
            tour(3, 150_000.0, 21, "Tokyo"),
        ];
        let set = FeatureSet::build(&tours, 1);
        assert_relative_eq!(set.similarity(0, 1), 1.0, epsilon = 1e-9);
        assert!(set.similarity(0, 2) < set.similarity(0, 1));
    }

    #[test]
    fn similarity_is_clamped_to_unit_interval() {
        // Opposite-signed numeric features yield negative cosine; the clamp
        // keeps the reported score at 0.
        let tours = vec![
            tour(1, 10_000.0, 3, "Oslo"),
            tour(2, 200_000.0, 30, "Lima"),
        ];
        let set = FeatureSet::build(&tours, 1);
        let s = set.similarity(0, 1);
        assert!((0.0..=1.0).contains(&s));
    }

    #[test]
    fn cosine_of_zero_vector_is_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
    }

    #[test]
    fn row_lookup() {
        let tours = vec![tour(5, 50_000.0, 7, "Paris"), tour(9, 90_000.0, 9, "Rome")];
        let set = FeatureSet::build(&tours, 1);
        assert_eq!(set.row_of(9), Some(1));
        assert_eq!(set.row_of(42), None);
    }

    #[test]
    fn feature_set_round_trips_through_json() {
        let tours = vec![tour(1, 55_000.0, 5, "Paris"), tour(2, 95_000.0, 8, "Rome")];
        let set = FeatureSet::build(&tours, 1234);
        let json = serde_json::to_string(&set).unwrap();
        let back: FeatureSet = serde_json::from_str(&json).unwrap();
        assert_eq!(set, back);
    }
}
