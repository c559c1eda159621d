//! Shallow regression trees with bagging and boosting.
//!
//! The demand series fitted here are short (weekly or monthly buckets over a
//! one-year window), so the trees are deliberately shallow and the ensembles
//! small. Randomized subsampling uses a fixed seed for reproducible forecasts.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{AnalyticsError, Result};

/// Configuration for tree ensembles.
#[derive(Debug, Clone, Copy)]
pub struct TreeConfig {
    /// Maximum tree depth.
    pub max_depth: usize,
    /// Number of trees in the ensemble.
    pub n_trees: usize,
    /// Shrinkage applied to each boosting stage.
    pub learning_rate: f64,
    /// Seed for bootstrap resampling.
    pub seed: u64,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_depth: 2,
            n_trees: 20,
            learning_rate: 0.1,
            seed: crate::models::DEFAULT_SEED,
        }
    }
}

#[derive(Debug, Clone)]
enum Node {
    Leaf(f64),
    Split {
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    fn predict(&self, x: f64) -> f64 {
        match self {
            Node::Leaf(value) => *value,
            Node::Split {
                threshold,
                left,
                right,
            } => {
                if x <= *threshold {
                    left.predict(x)
                } else {
                    right.predict(x)
                }
            }
        }
    }
}

/// A depth-limited regression tree over a single ordinal feature.
#[derive(Debug, Clone)]
pub struct RegressionTree {
    root: Node,
    max_depth: usize,
}

impl RegressionTree {
    /// Fit a tree of at most `max_depth` levels to `(x, y)` pairs.
    pub fn fit(x: &[f64], y: &[f64], max_depth: usize) -> Result<Self> {
        if x.len() != y.len() {
            return Err(AnalyticsError::Computation(format!(
                "length mismatch: {} x vs {} y",
                x.len(),
                y.len()
            )));
        }
        if x.is_empty() {
            return Err(AnalyticsError::Computation(
                "cannot fit a tree to an empty series".to_string(),
            ));
        }
        let pairs: Vec<(f64, f64)> = x.iter().copied().zip(y.iter().copied()).collect();
        Ok(Self {
            root: build_node(&pairs, max_depth),
            max_depth,
        })
    }

    /// Predict the value at `x`.
    pub fn predict(&self, x: f64) -> f64 {
        self.root.predict(x)
    }

    /// Maximum depth this tree was built with.
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }
}

fn leaf_mean(pairs: &[(f64, f64)]) -> f64 {
    pairs.iter().map(|(_, y)| y).sum::<f64>() / pairs.len() as f64
}

fn sse_around_mean(pairs: &[(f64, f64)]) -> f64 {
    let m = leaf_mean(pairs);
    pairs.iter().map(|(_, y)| (y - m).powi(2)).sum()
}

fn build_node(pairs: &[(f64, f64)], depth: usize) -> Node {
    if depth == 0 || pairs.len() < 2 {
        return Node::Leaf(leaf_mean(pairs));
    }

    let mut sorted = pairs.to_vec();
    sorted.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

    let parent_sse = sse_around_mean(&sorted);
    let mut best: Option<(f64, usize, f64)> = None; // (threshold, split index, total sse)

    for i in 1..sorted.len() {
        if sorted[i].0 <= sorted[i - 1].0 {
            continue; // no valid threshold between equal x values
        }
        let threshold = (sorted[i - 1].0 + sorted[i].0) / 2.0;
        let total = sse_around_mean(&sorted[..i]) + sse_around_mean(&sorted[i..]);
        if best.map_or(true, |(_, _, b)| total < b) {
            best = Some((threshold, i, total));
        }
    }

    match best {
        Some((threshold, split, total)) if total < parent_sse - 1e-12 => Node::Split {
            threshold,
            left: Box::new(build_node(&sorted[..split], depth - 1)),
            right: Box::new(build_node(&sorted[split..], depth - 1)),
        },
        _ => Node::Leaf(leaf_mean(&sorted)),
    }
}

/// Bootstrap-aggregated shallow trees.
#[derive(Debug, Clone)]
pub struct BaggedTrees {
    trees: Vec<RegressionTree>,
}

impl BaggedTrees {
    /// Fit `config.n_trees` trees, each on a bootstrap resample of the data.
    pub fn fit(x: &[f64], y: &[f64], config: &TreeConfig) -> Result<Self> {
        if x.len() != y.len() || x.is_empty() {
            return Err(AnalyticsError::Computation(
                "bagging needs a non-empty, aligned series".to_string(),
            ));
        }
        if config.n_trees == 0 {
            return Err(AnalyticsError::Computation(
                "ensemble needs at least one tree".to_string(),
            ));
        }

        let mut rng = StdRng::seed_from_u64(config.seed);
        let n = x.len();
        let mut trees = Vec::with_capacity(config.n_trees);
        for _ in 0..config.n_trees {
            let mut bx = Vec::with_capacity(n);
            let mut by = Vec::with_capacity(n);
            for _ in 0..n {
                let idx = rng.gen_range(0..n);
                bx.push(x[idx]);
                by.push(y[idx]);
            }
            trees.push(RegressionTree::fit(&bx, &by, config.max_depth)?);
        }
        Ok(Self { trees })
    }

    /// Predict as the mean over all trees.
    pub fn predict(&self, x: f64) -> f64 {
        self.trees.iter().map(|t| t.predict(x)).sum::<f64>() / self.trees.len() as f64
    }

    /// Number of trees in the bag.
    pub fn len(&self) -> usize {
        self.trees.len()
    }

    /// Whether the bag holds no trees.
    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }
}

/// Gradient-boosted shallow trees with a constant base prediction.
#[derive(Debug, Clone)]
pub struct BoostedTrees {
    base: f64,
    learning_rate: f64,
    trees: Vec<RegressionTree>,
}

impl BoostedTrees {
    /// Fit boosting stages against the running residual.
    pub fn fit(x: &[f64], y: &[f64], config: &TreeConfig) -> Result<Self> {
        if x.len() != y.len() || x.is_empty() {
            return Err(AnalyticsError::Computation(
                "boosting needs a non-empty, aligned series".to_string(),
            ));
        }
        if config.n_trees == 0 {
            return Err(AnalyticsError::Computation(
                "ensemble needs at least one tree".to_string(),
            ));
        }

        let base = y.iter().sum::<f64>() / y.len() as f64;
        let mut current: Vec<f64> = vec![base; y.len()];
        let mut trees = Vec::with_capacity(config.n_trees);

        for _ in 0..config.n_trees {
            let residuals: Vec<f64> = y.iter().zip(&current).map(|(yi, ci)| yi - ci).collect();
            let tree = RegressionTree::fit(x, &residuals, config.max_depth)?;
            for (ci, xi) in current.iter_mut().zip(x) {
                *ci += config.learning_rate * tree.predict(*xi);
            }
            trees.push(tree);
        }

        Ok(Self {
            base,
            learning_rate: config.learning_rate,
            trees,
        })
    }

    /// Predict as base + shrunk sum of stage predictions.
    pub fn predict(&self, x: f64) -> f64 {
        self.base
            + self.learning_rate
                * self
                    .trees
                    .iter()
                    .map(|t| t.predict(x))
                    .sum::<f64>()
    }

    /// Number of boosting stages.
    pub fn len(&self) -> usize {
        self.trees.len()
    }

    /// Whether boosting produced no stages.
    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }
}
