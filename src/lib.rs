//! Tourcast: booking analytics for a tour catalog.
//!
//! The crate turns a feed of tours and booking requests into operational
//! signals: demand forecasts per destination, seasonal outlooks, price-tier
//! clusters, price/demand anomalies, pricing advice, and content-based tour
//! recommendations. Every engine pulls its data through the
//! [`data::DataProvider`] trait, so storage stays out of the analytics.
//!
//! # Example
//!
//! ```no_run
//! use tourcast::config::AnalyticsConfig;
//! use tourcast::forecast::{DemandForecaster, Granularity};
//! # use tourcast::data::{DataProvider, Tour, BookingRequest, DestinationStats,
//! #     MonthlyStats, UserBooking};
//! # use tourcast::error::Result;
//! # struct Db;
//! # impl DataProvider for Db {
//! #     fn tours(&self, _: bool) -> Result<Vec<Tour>> { Ok(vec![]) }
//! #     fn requests(&self, _: u32) -> Result<Vec<BookingRequest>> { Ok(vec![]) }
//! #     fn destination_stats(&self, _: u32) -> Result<Vec<DestinationStats>> { Ok(vec![]) }
//! #     fn monthly_stats(&self, _: u32) -> Result<Vec<MonthlyStats>> { Ok(vec![]) }
//! #     fn user_history(&self, _: i64) -> Result<Vec<UserBooking>> { Ok(vec![]) }
//! # }
//!
//! # fn main() -> Result<()> {
//! let config = AnalyticsConfig::default();
//! let forecaster = DemandForecaster::new(Db, &config);
//! for forecast in forecaster.forecast(None, Granularity::Weekly)? {
//!     println!("{}: {}", forecast.destination, forecast.predicted_demand);
//! }
//! # Ok(())
//! # }
//! ```

pub mod anomaly;
pub mod cache;
pub mod cluster;
pub mod config;
pub mod data;
pub mod error;
pub mod forecast;
pub mod models;
pub mod pricing;
pub mod recommend;
pub mod stats;
pub mod utils;

pub use anomaly::{AnomalousTour, AnomalyDetector, AnomalyKind};
pub use cluster::{ClusterEngine, PriceTier, TourCluster};
pub use config::AnalyticsConfig;
pub use data::DataProvider;
pub use error::{AnalyticsError, Result};
pub use forecast::seasonal::{SeasonalForecaster, SeasonalPoint};
pub use forecast::{DemandForecaster, DestinationForecast, Granularity, Trend};
pub use pricing::{PriceAdvice, PriceOptimizer};
pub use recommend::{RecommendationCriteria, RecommendationEngine, TourRecommendation};
pub use stats::{full_report, FullReport, StatsEngine, TimeRange};
