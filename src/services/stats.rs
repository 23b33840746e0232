use crate::db::repositories::{AlertsRepository, IncidentsRepository, SchedulesRepository};
use crate::error::Error;
use anyhow::Result;
use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use std::sync::Arc;

/// Aggregation window. Alerts and incidents filter on creation timestamp,
/// schedules on their date; both ranges are half-open.
#[derive(Debug, Clone, Copy)]
pub struct StatsWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl StatsWindow {
    /// One calendar month
    pub fn month(year: i32, month: u32) -> Result<Self, Error> {
        let start_date = NaiveDate::from_ymd_opt(year, month, 1)
            .ok_or_else(|| Error::Validation(format!("Invalid month: {}-{}", year, month)))?;
        let end_date = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)
        }
        .ok_or_else(|| Error::Validation(format!("Invalid month: {}-{}", year, month)))?;

        Ok(Self {
            start: start_date.and_time(NaiveTime::MIN).and_utc(),
            end: end_date.and_time(NaiveTime::MIN).and_utc(),
            start_date,
            end_date,
        })
    }

    /// The month containing the current instant
    pub fn current_month() -> Self {
        let now = Utc::now();
        Self::month(now.year(), now.month()).expect("current month is a valid month")
    }
}

/// Aggregate security metrics for one window
#[derive(Debug, Clone, Serialize)]
pub struct SecurityStats {
    pub total_alerts: i64,
    /// Mean minutes from creation to first response, over alerts that left
    /// `active`. Alerts still active are excluded, not counted as zero.
    /// 0.0 when no alert in the window has been responded to.
    pub avg_response_minutes: f64,
    /// Fraction of scheduled shifts that received at least one checkin,
    /// expressed 0-100
    pub coverage_percent: f64,
    pub total_incidents: i64,
}

/// Read-only aggregation over the ledgers, recomputed on every query.
/// No cache; expected data volumes are one neighborhood's worth.
pub struct StatsEngine {
    alerts: AlertsRepository,
    schedules: SchedulesRepository,
    incidents: IncidentsRepository,
}

impl StatsEngine {
    /// Create a new stats engine
    pub fn new(pool: Arc<SqlitePool>) -> Self {
        Self {
            alerts: AlertsRepository::new(pool.clone()),
            schedules: SchedulesRepository::new(pool.clone()),
            incidents: IncidentsRepository::new(pool),
        }
    }

    /// Compute the security metrics for a window
    pub async fn security_stats(&self, window: &StatsWindow) -> Result<SecurityStats> {
        let alerts = self.alerts.list_created_between(window.start, window.end).await?;
        let total_alerts = alerts.len() as i64;

        let response_minutes: Vec<f64> = alerts
            .iter()
            .filter_map(|alert| {
                alert
                    .responded_at
                    .map(|responded| (responded - alert.created_at).num_milliseconds() as f64 / 60_000.0)
            })
            .collect();

        let avg_response_minutes = if response_minutes.is_empty() {
            0.0
        } else {
            response_minutes.iter().sum::<f64>() / response_minutes.len() as f64
        };

        let scheduled = self
            .schedules
            .count_between(window.start_date, window.end_date)
            .await?;
        let covered = self
            .schedules
            .covered_count_between(window.start_date, window.end_date)
            .await?;
        let coverage_percent = if scheduled == 0 {
            0.0
        } else {
            covered as f64 * 100.0 / scheduled as f64
        };

        let total_incidents = self.incidents.count_between(window.start, window.end).await?;

        Ok(SecurityStats {
            total_alerts,
            avg_response_minutes,
            coverage_percent,
            total_incidents,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connect_test_pool;
    use crate::db::models::{Alert, AlertStatus, AlertType, Checkin, Schedule, Shift};
    use crate::db::repositories::CheckinsRepository;
    use chrono::Duration;
    use sqlx::types::Json;
    use uuid::Uuid;

    /// A window bracketing "now", so rows created by the test always land
    /// inside it regardless of when the test runs
    fn window_around_now() -> StatsWindow {
        let now = Utc::now();
        StatsWindow {
            start: now - Duration::days(1),
            end: now + Duration::days(1),
            start_date: now.date_naive() - Duration::days(1),
            end_date: now.date_naive() + Duration::days(1),
        }
    }

    fn alert_created_at(created_at: DateTime<Utc>) -> Alert {
        Alert {
            id: Uuid::new_v4(),
            reporter_id: Uuid::new_v4(),
            reporter_block: "A1".to_string(),
            alert_type: AlertType::Emergency,
            description: None,
            latitude: None,
            longitude: None,
            photo_url: None,
            status: AlertStatus::Active,
            responder_id: None,
            created_at,
            responded_at: None,
            resolved_at: None,
        }
    }

    fn schedule_on(date: NaiveDate, shift: Shift) -> Schedule {
        Schedule {
            id: Uuid::new_v4(),
            schedule_date: date,
            shift,
            assigned_blocks: Json(vec!["A1".to_string()]),
            notes: None,
            created_by: Uuid::new_v4(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_avg_response_excludes_still_active_alerts() -> Result<()> {
        let pool = connect_test_pool().await?;
        let alerts = AlertsRepository::new(pool.clone());
        let engine = StatsEngine::new(pool);

        // One alert responded to 10 minutes after creation
        let responded = alerts
            .create(&alert_created_at(Utc::now() - Duration::minutes(10)))
            .await?;
        alerts
            .mark_responding(&responded.id, &Uuid::new_v4(), Utc::now())
            .await?;

        // One alert still active: undefined response time, not zero
        alerts.create(&alert_created_at(Utc::now())).await?;

        let stats = engine.security_stats(&window_around_now()).await?;
        assert_eq!(stats.total_alerts, 2);
        assert!(
            (stats.avg_response_minutes - 10.0).abs() < 0.1,
            "avg was {}",
            stats.avg_response_minutes
        );

        Ok(())
    }

    #[tokio::test]
    async fn test_coverage_counts_schedules_with_any_checkin() -> Result<()> {
        let pool = connect_test_pool().await?;
        let schedules = SchedulesRepository::new(pool.clone());
        let checkins = CheckinsRepository::new(pool.clone());
        let engine = StatsEngine::new(pool);

        let today = Utc::now().date_naive();
        let covered = schedules.create(&schedule_on(today, Shift::Pagi)).await?;
        schedules.create(&schedule_on(today, Shift::Malam1)).await?;

        checkins
            .create(&Checkin {
                id: Uuid::new_v4(),
                schedule_id: covered.id,
                guard_id: Uuid::new_v4(),
                checkin_time: Utc::now(),
                checkout_time: None,
                latitude: None,
                longitude: None,
            })
            .await?;

        let stats = engine.security_stats(&window_around_now()).await?;
        assert!((stats.coverage_percent - 50.0).abs() < f64::EPSILON);

        Ok(())
    }

    #[tokio::test]
    async fn test_empty_window_is_all_zeroes() -> Result<()> {
        let pool = connect_test_pool().await?;
        let engine = StatsEngine::new(pool);

        let stats = engine.security_stats(&window_around_now()).await?;
        assert_eq!(stats.total_alerts, 0);
        assert_eq!(stats.total_incidents, 0);
        assert_eq!(stats.avg_response_minutes, 0.0);
        assert_eq!(stats.coverage_percent, 0.0);

        Ok(())
    }

    #[test]
    fn test_month_window_bounds() {
        let window = StatsWindow::month(2026, 12).unwrap();
        assert_eq!(window.start_date, NaiveDate::from_ymd_opt(2026, 12, 1).unwrap());
        assert_eq!(window.end_date, NaiveDate::from_ymd_opt(2027, 1, 1).unwrap());

        assert!(matches!(
            StatsWindow::month(2026, 13),
            Err(Error::Validation(_))
        ));
    }
}
