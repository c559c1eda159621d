//! End-to-end scenarios over a shared in-memory data provider.

use chrono::{Datelike, Duration, NaiveDate, Utc};
use tempfile::TempDir;

use tourcast::cluster::{ClusterEngine, PriceTier};
use tourcast::config::AnalyticsConfig;
use tourcast::data::{
    BookingRequest, DataProvider, DestinationStats, MonthlyStats, RequestStatus, Tour, UserBooking,
};
use tourcast::error::Result;
use tourcast::forecast::{DemandForecaster, Granularity, Trend};
use tourcast::forecast::seasonal::SeasonalForecaster;
use tourcast::pricing::PriceOptimizer;
use tourcast::recommend::{RecommendationCriteria, RecommendationEngine};
use tourcast::stats::{full_report, StatsEngine, TimeRange};
use tourcast::{AnomalyDetector, AnomalyKind};

/// Booking and catalog fixture shared across the engines.
#[derive(Default, Clone)]
struct InMemoryProvider {
    tours: Vec<Tour>,
    requests: Vec<BookingRequest>,
    monthly: Vec<MonthlyStats>,
    history: Vec<UserBooking>,
}

impl DataProvider for InMemoryProvider {
    fn tours(&self, active_only: bool) -> Result<Vec<Tour>> {
        Ok(self
            .tours
            .iter()
            .filter(|t| !active_only || t.active)
            .cloned()
            .collect())
    }

    fn requests(&self, window_days: u32) -> Result<Vec<BookingRequest>> {
        let cutoff = Utc::now() - Duration::days(window_days as i64);
        Ok(self
            .requests
            .iter()
            .filter(|r| r.created_at >= cutoff)
            .cloned()
            .collect())
    }

    fn destination_stats(&self, window_days: u32) -> Result<Vec<DestinationStats>> {
        // Aggregate on the fly so doubled-window growth queries see more rows.
        let requests = self.requests(window_days)?;
        let mut stats: Vec<DestinationStats> = Vec::new();
        for request in &requests {
            match stats.iter_mut().find(|s| s.destination == request.destination) {
                Some(entry) => {
                    entry.request_count += 1;
                    entry.total_revenue += request.price;
                    if request.status == RequestStatus::Completed {
                        entry.completed_count += 1;
                    }
                }
                None => stats.push(DestinationStats {
                    destination: request.destination.clone(),
                    request_count: 1,
                    total_revenue: request.price,
                    avg_price: 0.0,
                    completed_count: u64::from(request.status == RequestStatus::Completed),
                }),
            }
        }
        for entry in &mut stats {
            entry.avg_price = entry.total_revenue / entry.request_count as f64;
        }
        Ok(stats)
    }

    fn monthly_stats(&self, window_months: u32) -> Result<Vec<MonthlyStats>> {
        let keep = window_months as usize;
        let skip = self.monthly.len().saturating_sub(keep);
        Ok(self.monthly[skip..].to_vec())
    }

    fn user_history(&self, _user_id: i64) -> Result<Vec<UserBooking>> {
        Ok(self.history.clone())
    }
}

fn tour(id: i64, destination: &str, price: f64, duration_days: u32) -> Tour {
    Tour {
        id,
        name: format!("Tour {id}"),
        price,
        duration_days,
        destination: destination.to_string(),
        active: true,
        created_at: Utc::now() - Duration::days(300),
    }
}

fn request(
    id: i64,
    tour_id: i64,
    destination: &str,
    days_ago: i64,
    status: RequestStatus,
    price: f64,
) -> BookingRequest {
    BookingRequest {
        id,
        tour_id,
        destination: destination.to_string(),
        status,
        created_at: Utc::now() - Duration::days(days_ago),
        updated_at: None,
        price,
    }
}

/// Weekly Paris counts [2, 3, 5, 8], newest week last.
fn rising_paris() -> Vec<BookingRequest> {
    let mut requests = Vec::new();
    let mut id = 0;
    for (weeks_ago, count) in [(3i64, 2), (2, 3), (1, 5), (0, 8)] {
        for _ in 0..count {
            id += 1;
            requests.push(request(
                id,
                1,
                "Paris",
                weeks_ago * 7,
                RequestStatus::Completed,
                70_000.0,
            ));
        }
    }
    requests
}

#[test]
fn rising_demand_is_forecast_and_priced() {
    let dir = TempDir::new().unwrap();
    let provider = InMemoryProvider {
        tours: vec![tour(1, "Paris", 70_000.0, 7)],
        requests: rising_paris(),
        ..Default::default()
    };

    let forecaster = DemandForecaster::new(provider, &AnalyticsConfig::under(dir.path()));
    let forecasts = forecaster.forecast(None, Granularity::Weekly).unwrap();

    assert_eq!(forecasts.len(), 1);
    let paris = &forecasts[0];
    assert_eq!(paris.trend, Trend::Rising);
    assert_eq!(paris.current_demand, 8);
    assert!(paris.predicted_demand > 8);
    assert!(paris.predicted_revenue > paris.current_revenue);
    assert!((0.30..=0.95).contains(&paris.confidence));
}

#[test]
fn clusters_partition_the_catalog_by_price_tier() {
    let provider = InMemoryProvider {
        tours: vec![
            tour(1, "Paris", 50_000.0, 5),
            tour(2, "Oslo", 80_000.0, 7),
            tour(3, "Tokyo", 120_000.0, 14),
            tour(4, "Rome", 59_999.0, 4),
        ],
        ..Default::default()
    };

    let clusters = ClusterEngine::new(provider.clone()).clusters(3).unwrap();
    let member_count: usize = clusters.iter().map(|c| c.members.len()).sum();
    assert_eq!(member_count, provider.tours.len());

    let tier_of = |id: i64| {
        clusters
            .iter()
            .find(|c| c.members.iter().any(|m| m.tour_id == id))
            .map(|c| c.tier)
    };
    assert_eq!(tier_of(1), Some(PriceTier::Budget));
    assert_eq!(tier_of(4), Some(PriceTier::Budget));
    assert_eq!(tier_of(2), Some(PriceTier::Mid));
    assert_eq!(tier_of(3), Some(PriceTier::Premium));
}

#[test]
fn anomaly_detector_separates_the_two_classes() {
    let mut requests = Vec::new();
    let mut id = 0;
    let mut add = |tour_id: i64, count: u64| {
        for _ in 0..count {
            id += 1;
            requests.push(request(id, tour_id, "Paris", 5, RequestStatus::New, 50_000.0));
        }
    };
    add(1, 20); // cheap and busy
    add(2, 5);
    add(3, 3); // expensive and slow

    let provider = InMemoryProvider {
        tours: vec![
            tour(1, "Paris", 30_000.0, 7),
            tour(2, "Oslo", 100_000.0, 7),
            tour(3, "Tokyo", 160_000.0, 7),
        ],
        requests,
        ..Default::default()
    };

    let anomalies = AnomalyDetector::new(provider).detect().unwrap();
    let kind_of = |id: i64| anomalies.iter().find(|a| a.tour_id == id).map(|a| a.anomaly_type);

    assert_eq!(kind_of(1), Some(AnomalyKind::HighDemandLowPrice));
    assert_eq!(kind_of(3), Some(AnomalyKind::LowDemandHighPrice));
    assert_eq!(kind_of(2), None);
    for a in &anomalies {
        assert!((0.0..=1.0).contains(&a.demand_score));
        assert!((0.0..=1.0).contains(&a.price_score));
    }
}

#[test]
fn thinly_booked_outlier_gets_market_advice() {
    // Recent Paris bookings average 90k; the barely booked 150k tour sits
    // well above the band and gets pulled toward the market.
    let provider = InMemoryProvider {
        tours: vec![
            tour(1, "Paris", 150_000.0, 7),
            tour(2, "Paris", 60_000.0, 7),
            tour(3, "Paris", 60_000.0, 7),
        ],
        requests: vec![
            request(1, 2, "Paris", 5, RequestStatus::New, 85_000.0),
            request(2, 2, "Paris", 8, RequestStatus::New, 95_000.0),
            request(3, 3, "Paris", 11, RequestStatus::New, 90_000.0),
            request(4, 3, "Paris", 14, RequestStatus::New, 90_000.0),
        ],
        ..Default::default()
    };

    let advice = PriceOptimizer::new(provider).recommendations(None).unwrap();
    let t1 = advice.iter().find(|a| a.tour_id == 1).expect("advice for tour 1");
    assert!((t1.recommended_price - 99_000.0).abs() < 1e-6);
    assert!(t1.recommended_price < t1.current_price);
}

#[test]
fn recommendations_favour_price_proximity_and_fall_back() {
    let dir = TempDir::new().unwrap();
    let provider = InMemoryProvider {
        tours: vec![tour(1, "Rome", 150_000.0, 7), tour(2, "Oslo", 82_000.0, 7)],
        history: vec![UserBooking {
            destination: "Paris".to_string(),
            price: 80_000.0,
            duration_days: 7,
            status: RequestStatus::Completed,
            created_at: Utc::now() - Duration::days(60),
        }],
        ..Default::default()
    };
    let engine = RecommendationEngine::new(provider, &AnalyticsConfig::under(dir.path()));

    // 82k sits nearer the 80k average spend than 150k does.
    let ranked = engine
        .recommend(&RecommendationCriteria {
            user_id: Some(7),
            limit: 10,
            ..Default::default()
        })
        .unwrap();
    assert_eq!(ranked[0].tour_id, 2);
    assert!(ranked.iter().all(|r| (0.0..=1.0).contains(&r.score)));

    // A filter matching nothing still yields the head of the catalog.
    let fallback = engine
        .recommend(&RecommendationCriteria {
            min_price: Some(1_000_000.0),
            limit: 1,
            ..Default::default()
        })
        .unwrap();
    assert_eq!(fallback.len(), 1);
    assert_eq!(fallback[0].tour_id, 1);
}

#[test]
fn similarity_cache_tracks_catalog_changes() {
    let dir = TempDir::new().unwrap();
    let config = AnalyticsConfig::under(dir.path());
    let catalog = vec![tour(1, "Paris", 80_000.0, 7), tour(2, "Paris", 82_000.0, 7)];

    let engine = RecommendationEngine::new(
        InMemoryProvider {
            tours: catalog.clone(),
            ..Default::default()
        },
        &config,
    );
    assert_eq!(engine.similar(1, 5).unwrap().len(), 1);

    // A new engine over a grown catalog must not serve the stale matrix.
    let mut grown = catalog;
    grown.push(tour(3, "Tokyo", 300_000.0, 14));
    let engine = RecommendationEngine::new(
        InMemoryProvider {
            tours: grown,
            ..Default::default()
        },
        &config,
    );
    assert_eq!(engine.similar(1, 5).unwrap().len(), 2);
}

#[test]
fn seasonal_forecast_extends_monthly_history() {
    let today = Utc::now().date_naive();
    let monthly: Vec<MonthlyStats> = (0..12)
        .map(|i| {
            let month = first_of_months_ago(today, 11 - i);
            MonthlyStats {
                month,
                request_count: 20 + i as u64,
                avg_price: 70_000.0 + 1_000.0 * i as f64,
                destinations: vec!["Paris".to_string()],
            }
        })
        .collect();
    let last = monthly[monthly.len() - 1].month;

    let provider = InMemoryProvider {
        monthly,
        ..Default::default()
    };
    let points = SeasonalForecaster::new(provider).forecast(6).unwrap();

    assert_eq!(points.len(), 6);
    let first = &points[0];
    let (expected_year, expected_month) = if last.month() == 12 {
        (last.year() + 1, 1)
    } else {
        (last.year(), last.month() + 1)
    };
    assert_eq!((first.year, first.month), (expected_year, expected_month));
    for p in &points {
        assert!(p.forecast);
        assert!(p.predicted_demand >= 1);
        assert!(p.predicted_price >= 1_000.0);
        assert!(!p.month_name.is_empty());
        assert!((1..=12).contains(&p.month));
    }
}

#[test]
fn full_report_assembles_every_section() {
    let dir = TempDir::new().unwrap();
    let config = AnalyticsConfig::under(dir.path());

    let today = Utc::now().date_naive();
    let mut requests = rising_paris();
    let next_id = requests.len() as i64 + 1;
    requests.push(request(
        next_id,
        1,
        "Paris",
        1,
        RequestStatus::Cancelled,
        70_000.0,
    ));

    let provider = InMemoryProvider {
        tours: vec![tour(1, "Paris", 70_000.0, 7)],
        requests,
        monthly: (0..6)
            .map(|i| MonthlyStats {
                month: first_of_months_ago(today, 5 - i),
                request_count: 10 + i as u64,
                avg_price: 70_000.0,
                destinations: vec!["Paris".to_string()],
            })
            .collect(),
        ..Default::default()
    };

    let stats = StatsEngine::new(provider.clone());
    let forecaster = DemandForecaster::new(provider.clone(), &config);
    let optimizer = PriceOptimizer::new(provider);

    let report = full_report(TimeRange::Quarter, &stats, &forecaster, &optimizer).unwrap();

    assert_eq!(report.period, "quarter");
    assert!(report.statistics.total_requests > 0);
    assert!(!report.popular_destinations.is_empty());
    assert!(!report.seasonal_trends.is_empty());
    assert!(!report.demand_forecasts.is_empty());
    assert!(!report.price_recommendations.is_empty());
}

fn first_of_months_ago(today: NaiveDate, months_ago: u32) -> NaiveDate {
    let total = today.year() * 12 + today.month() as i32 - 1 - months_ago as i32;
    let year = total.div_euclid(12);
    let month = total.rem_euclid(12) as u32 + 1;
    NaiveDate::from_ymd_opt(year, month, 1).expect("valid first-of-month")
}
