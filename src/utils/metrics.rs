//! Goodness-of-fit metrics for regression models.

use crate::error::{AnalyticsError, Result};
use crate::utils::stats::mean;

/// In-sample fit metrics for a single regressor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitMetrics {
    /// Coefficient of determination. Can be negative for a fit worse than
    /// the mean predictor.
    pub r_squared: f64,
    /// Mean absolute error.
    pub mae: f64,
    /// Root mean squared error.
    pub rmse: f64,
}

/// Calculate fit metrics between actual and predicted values.
pub fn fit_metrics(actual: &[f64], predicted: &[f64]) -> Result<FitMetrics> {
    if actual.is_empty() {
        return Err(AnalyticsError::Computation(
            "cannot score an empty series".to_string(),
        ));
    }
    if actual.len() != predicted.len() {
        return Err(AnalyticsError::Computation(format!(
            "length mismatch: {} actual vs {} predicted",
            actual.len(),
            predicted.len()
        )));
    }

    let n = actual.len() as f64;

    let mae = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).abs())
        .sum::<f64>()
        / n;

    let sse: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).powi(2))
        .sum();
    let rmse = (sse / n).sqrt();

    let y_mean = mean(actual);
    let sst: f64 = actual.iter().map(|a| (a - y_mean).powi(2)).sum();
    // A constant series fitted exactly gets R² = 1, otherwise 0.
    let r_squared = if sst < 1e-12 {
        if sse < 1e-12 {
            1.0
        } else {
            0.0
        }
    } else {
        1.0 - sse / sst
    };

    Ok(FitMetrics {
        r_squared,
        mae,
        rmse,
    })
}
