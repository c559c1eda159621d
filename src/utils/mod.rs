//! Shared numeric helpers for the analytical engines.

pub mod metrics;
pub mod stats;

pub use metrics::{fit_metrics, FitMetrics};
pub use stats::{mean, variance};
