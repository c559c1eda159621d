//! Regression models for demand forecasting.

mod linear;
mod model;
mod tree;

pub use linear::LinearRegression;
pub use model::{Model, DEFAULT_SEED};
pub use tree::{BaggedTrees, BoostedTrees, RegressionTree, TreeConfig};
