//! Data provider boundary: input row types and the `DataProvider` trait.
//!
//! The SQL access layer lives outside this crate. Engines receive a
//! `DataProvider` capability at construction and treat the returned rows as
//! immutable snapshots; lifecycle (open/close) is managed by the caller.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AnalyticsError, Result};

/// Upper bound for a daily lookback window.
pub const MAX_WINDOW_DAYS: u32 = 3650;
/// Upper bound for a monthly lookback window.
pub const MAX_WINDOW_MONTHS: u32 = 120;

/// A catalog tour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tour {
    pub id: i64,
    pub name: String,
    /// Price in the catalog currency, non-negative.
    pub price: f64,
    pub duration_days: u32,
    pub destination: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// Lifecycle status of a booking request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    New,
    InProgress,
    Completed,
    Cancelled,
}

/// A historical booking request. Append-only from the engines' perspective.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingRequest {
    pub id: i64,
    pub tour_id: i64,
    pub destination: String,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    /// Set when the request last changed state; used for processing-time
    /// statistics on completed requests.
    pub updated_at: Option<DateTime<Utc>>,
    /// Price snapshot at booking time.
    pub price: f64,
}

/// Pre-aggregated per-destination statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DestinationStats {
    pub destination: String,
    pub request_count: u64,
    pub total_revenue: f64,
    pub avg_price: f64,
    pub completed_count: u64,
}

/// Pre-aggregated per-calendar-month statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyStats {
    /// First day of the month.
    pub month: NaiveDate,
    pub request_count: u64,
    pub avg_price: f64,
    pub destinations: Vec<String>,
}

/// One row of a user's booking history, joined with tour attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserBooking {
    pub destination: String,
    pub price: f64,
    pub duration_days: u32,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
}

/// Tabular feed of booking and catalog data.
///
/// Implementations are expected to be cheap to query repeatedly; engines pull
/// bounded historical windows on demand and never hold rows across calls.
pub trait DataProvider {
    /// The tour catalog, optionally restricted to active tours.
    fn tours(&self, active_only: bool) -> Result<Vec<Tour>>;

    /// Booking requests created within the last `window_days` days.
    ///
    /// Callers must validate the window via [`validate_window_days`] before
    /// issuing the query.
    fn requests(&self, window_days: u32) -> Result<Vec<BookingRequest>>;

    /// Per-destination aggregates over the last `window_days` days.
    fn destination_stats(&self, window_days: u32) -> Result<Vec<DestinationStats>>;

    /// Per-month aggregates over the last `window_months` months, oldest first.
    fn monthly_stats(&self, window_months: u32) -> Result<Vec<MonthlyStats>>;

    /// Booking history for a single user, for recommendation personalization.
    fn user_history(&self, user_id: i64) -> Result<Vec<UserBooking>>;
}

impl<P: DataProvider + ?Sized> DataProvider for &P {
    fn tours(&self, active_only: bool) -> Result<Vec<Tour>> {
        (**self).tours(active_only)
    }

    fn requests(&self, window_days: u32) -> Result<Vec<BookingRequest>> {
        (**self).requests(window_days)
    }

    fn destination_stats(&self, window_days: u32) -> Result<Vec<DestinationStats>> {
        (**self).destination_stats(window_days)
    }

    fn monthly_stats(&self, window_months: u32) -> Result<Vec<MonthlyStats>> {
        (**self).monthly_stats(window_months)
    }

    fn user_history(&self, user_id: i64) -> Result<Vec<UserBooking>> {
        (**self).user_history(user_id)
    }
}

/// Validate a daily lookback window before querying the provider.
pub fn validate_window_days(window_days: u32) -> Result<u32> {
    if (1..=MAX_WINDOW_DAYS).contains(&window_days) {
        Ok(window_days)
    } else {
        Err(AnalyticsError::InvalidParameter(format!(
            "window_days must be in 1..={MAX_WINDOW_DAYS}, got {window_days}"
        )))
    }
}

/// Validate a monthly lookback window before querying the provider.
pub fn validate_window_months(window_months: u32) -> Result<u32> {
    if (1..=MAX_WINDOW_MONTHS).contains(&window_months) {
        Ok(window_months)
    } else {
        Err(AnalyticsError::InvalidParameter(format!(
            "window_months must be in 1..={MAX_WINDOW_MONTHS}, got {window_months}"
        )))
    }
}
