//! Descriptive booking statistics: status breakdown, popular destinations,
//! and historical seasonal trends.
//!
//! Unlike the forecasting engines these are pure aggregations, but they share
//! the provider seam and feed the same report surface.

use chrono::Datelike;
use serde::Serialize;

use crate::data::{
    validate_window_days, validate_window_months, DataProvider, RequestStatus, MAX_WINDOW_DAYS,
};
use crate::error::Result;
use crate::forecast::{DemandForecaster, DestinationForecast, Granularity};
use crate::pricing::{PriceAdvice, PriceOptimizer};

/// English month name for a 1-based calendar month.
pub fn month_name(month: u32) -> &'static str {
    match month {
        1 => "January",
        2 => "February",
        3 => "March",
        4 => "April",
        5 => "May",
        6 => "June",
        7 => "July",
        8 => "August",
        9 => "September",
        10 => "October",
        11 => "November",
        12 => "December",
        _ => "Unknown",
    }
}

/// Reporting period, mapped to a daily lookback window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeRange {
    Week,
    Month,
    Quarter,
    Year,
}

impl TimeRange {
    /// Lookback window in days.
    pub fn days(self) -> u32 {
        match self {
            TimeRange::Week => 7,
            TimeRange::Month => 30,
            TimeRange::Quarter => 90,
            TimeRange::Year => 365,
        }
    }

    /// Label used in report output.
    pub fn label(self) -> &'static str {
        match self {
            TimeRange::Week => "week",
            TimeRange::Month => "month",
            TimeRange::Quarter => "quarter",
            TimeRange::Year => "year",
        }
    }
}

/// Booking request counts by status, with conversion and processing time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestStatistics {
    pub total_requests: u64,
    pub new_requests: u64,
    pub in_progress: u64,
    pub completed: u64,
    pub cancelled: u64,
    /// Completed as a percentage of non-cancelled requests.
    pub conversion_rate: f64,
    /// Mean hours from creation to completion, when observable.
    pub avg_processing_time_hours: Option<f64>,
}

/// Demand and revenue for one destination, with period-over-period growth.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PopularDestination {
    pub destination: String,
    pub request_count: u64,
    pub revenue: f64,
    pub growth_percent: f64,
}

/// One historical month of aggregate booking activity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeasonalTrend {
    pub month: u32,
    pub month_name: &'static str,
    pub request_count: u64,
    pub avg_price: f64,
    pub top_destinations: Vec<String>,
    /// Always `false`: these are observed records, not extrapolations.
    pub forecast: bool,
}

/// Complete analytics report for one period.
#[derive(Debug, Clone, Serialize)]
pub struct FullReport {
    pub period: &'static str,
    pub statistics: RequestStatistics,
    pub popular_destinations: Vec<PopularDestination>,
    pub seasonal_trends: Vec<SeasonalTrend>,
    pub demand_forecasts: Vec<DestinationForecast>,
    pub price_recommendations: Vec<PriceAdvice>,
}

/// Descriptive statistics over the booking history.
pub struct StatsEngine<P> {
    provider: P,
}

impl<P: DataProvider> StatsEngine<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Status breakdown for requests created in the last `window_days` days.
    pub fn request_statistics(&self, window_days: u32) -> Result<RequestStatistics> {
        let window = validate_window_days(window_days)?;
        let requests = self.provider.requests(window)?;

        let total = requests.len() as u64;
        let count = |status: RequestStatus| {
            requests.iter().filter(|r| r.status == status).count() as u64
        };
        let new_requests = count(RequestStatus::New);
        let in_progress = count(RequestStatus::InProgress);
        let completed = count(RequestStatus::Completed);
        let cancelled = count(RequestStatus::Cancelled);

        let conversion_base = total - cancelled;
        let conversion_rate = if conversion_base > 0 {
            round2(completed as f64 / conversion_base as f64 * 100.0)
        } else {
            0.0
        };

        let processing_hours: Vec<f64> = requests
            .iter()
            .filter(|r| r.status == RequestStatus::Completed)
            .filter_map(|r| r.updated_at.map(|done| (done - r.created_at).num_seconds()))
            .map(|secs| secs as f64 / 3600.0)
            .collect();
        let avg_processing_time_hours = if processing_hours.is_empty() {
            None
        } else {
            Some(round2(
                processing_hours.iter().sum::<f64>() / processing_hours.len() as f64,
            ))
        };

        Ok(RequestStatistics {
            total_requests: total,
            new_requests,
            in_progress,
            completed,
            cancelled,
            conversion_rate,
            avg_processing_time_hours,
        })
    }

    /// Top destinations by request count, with growth against the preceding
    /// equal-length period.
    pub fn popular_destinations(
        &self,
        window_days: u32,
        limit: usize,
    ) -> Result<Vec<PopularDestination>> {
        let window = validate_window_days(window_days)?;
        let current = self.provider.destination_stats(window)?;
        let doubled = (window * 2).min(MAX_WINDOW_DAYS);
        let combined = self.provider.destination_stats(doubled)?;

        let mut destinations = Vec::new();
        for row in current.iter().take(limit) {
            // The doubled window includes the current one; the previous
            // period's count is the difference.
            let combined_count = combined
                .iter()
                .find(|c| c.destination == row.destination)
                .map_or(0, |c| c.request_count);
            let previous = combined_count.saturating_sub(row.request_count);

            let growth_percent = if previous > 0 {
                round2(
                    (row.request_count as f64 - previous as f64) / previous as f64 * 100.0,
                )
            } else if row.request_count > 0 {
                100.0
            } else {
                0.0
            };

            destinations.push(PopularDestination {
                destination: row.destination.clone(),
                request_count: row.request_count,
                revenue: row.total_revenue,
                growth_percent,
            });
        }

        Ok(destinations)
    }

    /// Observed monthly activity, oldest first.
    pub fn seasonal_history(&self, window_months: u32) -> Result<Vec<SeasonalTrend>> {
        let window = validate_window_months(window_months)?;
        let monthly = self.provider.monthly_stats(window)?;

        Ok(monthly
            .into_iter()
            .map(|record| {
                let month = record.month.month();
                SeasonalTrend {
                    month,
                    month_name: month_name(month),
                    request_count: record.request_count,
                    avg_price: record.avg_price,
                    top_destinations: record.destinations.into_iter().take(3).collect(),
                    forecast: false,
                }
            })
            .collect())
    }
}

/// Default destination count in the full report.
const REPORT_DESTINATION_LIMIT: usize = 10;

/// Assemble the complete analytics report for a period.
pub fn full_report<P, Q, R>(
    range: TimeRange,
    stats: &StatsEngine<P>,
    forecaster: &DemandForecaster<Q>,
    optimizer: &PriceOptimizer<R>,
) -> Result<FullReport>
where
    P: DataProvider,
    Q: DataProvider,
    R: DataProvider,
{
    let days = range.days();
    Ok(FullReport {
        period: range.label(),
        statistics: stats.request_statistics(days)?,
        popular_destinations: stats.popular_destinations(days, REPORT_DESTINATION_LIMIT)?,
        seasonal_trends: stats.seasonal_history(12)?,
        demand_forecasts: forecaster.forecast(None, Granularity::Weekly)?,
        price_recommendations: optimizer.recommendations(None)?,
    })
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
