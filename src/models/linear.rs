//! Simple linear regression on an ordinal time index.

use serde::{Deserialize, Serialize};

use crate::error::{AnalyticsError, Result};
use crate::utils::metrics::{fit_metrics, FitMetrics};
use crate::utils::stats::mean;

/// Least-squares line fit `y = intercept + slope * x`.
///
/// The parameters serialize to JSON so a fitted model can be persisted per
/// destination and reloaded at process start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearRegression {
    pub slope: f64,
    pub intercept: f64,
}

impl LinearRegression {
    /// Fit a line to `(x, y)` pairs.
    ///
    /// Requires at least two points and non-constant `x`.
    pub fn fit(x: &[f64], y: &[f64]) -> Result<Self> {
        if x.len() != y.len() {
            return Err(AnalyticsError::Computation(format!(
                "length mismatch: {} x vs {} y",
                x.len(),
                y.len()
            )));
        }
        if x.len() < 2 {
            return Err(AnalyticsError::Computation(
                "linear fit needs at least two points".to_string(),
            ));
        }

        let x_mean = mean(x);
        let y_mean = mean(y);

        let sxx: f64 = x.iter().map(|xi| (xi - x_mean).powi(2)).sum();
        if sxx < 1e-12 {
            return Err(AnalyticsError::Computation(
                "degenerate regressor: x is constant".to_string(),
            ));
        }
        let sxy: f64 = x
            .iter()
            .zip(y)
            .map(|(xi, yi)| (xi - x_mean) * (yi - y_mean))
            .sum();

        let slope = sxy / sxx;
        let intercept = y_mean - slope * x_mean;
        Ok(Self { slope, intercept })
    }

    /// Fit against the ordinal index `x = [0, 1, .., n-1]`.
    pub fn fit_ordinal(y: &[f64]) -> Result<Self> {
        let x: Vec<f64> = (0..y.len()).map(|i| i as f64).collect();
        Self::fit(&x, y)
    }

    /// Predict the value at `x`.
    pub fn predict(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }

    /// In-sample fit metrics against the ordinal index.
    pub fn score_ordinal(&self, y: &[f64]) -> Result<FitMetrics> {
        let predicted: Vec<f64> = (0..y.len()).map(|i| self.predict(i as f64)).collect();
        fit_metrics(y, &predicted)
    }
}
