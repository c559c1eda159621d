//! Tagged model representation, including the blended ensemble.
//!
//! A `Model` is any of the three single regressors or a weighted ensemble of
//! models. Every variant exposes the same `predict`/`score_ordinal` surface,
//! so the ensemble is composable and testable in isolation.

use crate::error::Result;
use crate::models::{BaggedTrees, BoostedTrees, LinearRegression, TreeConfig};
use crate::utils::metrics::{fit_metrics, FitMetrics};

/// Fixed seed for the randomized ensemble members.
pub const DEFAULT_SEED: u64 = 42;

/// A fitted regression model over an ordinal time index.
#[derive(Debug, Clone)]
pub enum Model {
    /// Ordinary least-squares line.
    Linear(LinearRegression),
    /// Bootstrap-aggregated shallow trees.
    Bagged(BaggedTrees),
    /// Gradient-boosted shallow trees.
    Boosted(BoostedTrees),
    /// Blend of models with normalized weights.
    WeightedEnsemble {
        models: Vec<Model>,
        weights: Vec<f64>,
    },
}

impl Model {
    /// Fit the three-regressor blend on period counts `y` indexed 0..n.
    ///
    /// Component weights are proportional to each model's in-sample R²
    /// (negative scores clamp to zero); when no model beats the mean
    /// predictor the blend falls back to equal thirds.
    pub fn fit_blended(y: &[f64], config: &TreeConfig) -> Result<Model> {
        let x: Vec<f64> = (0..y.len()).map(|i| i as f64).collect();

        let models = vec![
            Model::Linear(LinearRegression::fit_ordinal(y)?),
            Model::Bagged(BaggedTrees::fit(&x, y, config)?),
            Model::Boosted(BoostedTrees::fit(&x, y, config)?),
        ];

        let mut weights: Vec<f64> = models
            .iter()
            .map(|m| {
                m.score_ordinal(y)
                    .map(|metrics| metrics.r_squared.max(0.0))
                    .unwrap_or(0.0)
            })
            .collect();

        let total: f64 = weights.iter().sum();
        if total <= 0.0 {
            weights = vec![1.0 / models.len() as f64; models.len()];
        } else {
            for w in &mut weights {
                *w /= total;
            }
        }

        Ok(Model::WeightedEnsemble { models, weights })
    }

    /// Predict the value at ordinal position `x`.
    pub fn predict(&self, x: f64) -> f64 {
        match self {
            Model::Linear(m) => m.predict(x),
            Model::Bagged(m) => m.predict(x),
            Model::Boosted(m) => m.predict(x),
            Model::WeightedEnsemble { models, weights } => models
                .iter()
                .zip(weights)
                .map(|(m, w)| w * m.predict(x))
                .sum(),
        }
    }

    /// In-sample fit metrics against the ordinal index.
    pub fn score_ordinal(&self, y: &[f64]) -> Result<FitMetrics> {
        let predicted: Vec<f64> = (0..y.len()).map(|i| self.predict(i as f64)).collect();
        fit_metrics(y, &predicted)
    }

    /// Ensemble weights, or `None` for single regressors.
    pub fn weights(&self) -> Option<&[f64]> {
        match self {
            Model::WeightedEnsemble { weights, .. } => Some(weights),
            _ => None,
        }
    }
}
