//! Configuration for cache locations and engine defaults.

use std::path::{Path, PathBuf};

/// Configuration shared by the analytical engines.
///
/// Only durable state locations live here; algorithm constants are fixed
/// domain parameters owned by the individual engines.
#[derive(Debug, Clone)]
pub struct AnalyticsConfig {
    /// Directory holding one serialized regression model per destination.
    pub model_dir: PathBuf,
    /// Directory holding the recommendation feature matrix, scaler and
    /// tour-set hash file.
    pub feature_dir: PathBuf,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("./models"),
            feature_dir: PathBuf::from("./models/features"),
        }
    }
}

impl AnalyticsConfig {
    /// Create a config with both cache directories under a common root.
    pub fn under(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            model_dir: root.join("models"),
            feature_dir: root.join("features"),
        }
    }

    /// Set the forecast model cache directory.
    pub fn with_model_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.model_dir = dir.into();
        self
    }

    /// Set the recommendation feature cache directory.
    pub fn with_feature_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.feature_dir = dir.into();
        self
    }
}
