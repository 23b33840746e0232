use crate::db::models::Schedule;
use crate::error::Error;
use anyhow::Result;
use chrono::NaiveDate;
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

const SCHEDULE_COLUMNS: &str =
    "id, schedule_date, shift, assigned_blocks, notes, created_by, created_at";

/// Patrol schedules repository
#[derive(Clone)]
pub struct SchedulesRepository {
    pool: Arc<SqlitePool>,
}

impl SchedulesRepository {
    /// Create a new schedules repository
    pub fn new(pool: Arc<SqlitePool>) -> Self {
        Self { pool }
    }

    /// Insert a new patrol schedule. Overlapping shifts are tolerated; the
    /// schedule is informational, not authoritative.
    pub async fn create(&self, schedule: &Schedule) -> Result<Schedule> {
        info!(
            "Creating patrol schedule: {} {}",
            schedule.schedule_date, schedule.shift
        );

        let result = sqlx::query_as::<_, Schedule>(&format!(
            r#"
            INSERT INTO schedules (
                id, schedule_date, shift, assigned_blocks, notes, created_by, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {SCHEDULE_COLUMNS}
            "#
        ))
        .bind(schedule.id)
        .bind(schedule.schedule_date)
        .bind(schedule.shift)
        .bind(&schedule.assigned_blocks)
        .bind(&schedule.notes)
        .bind(schedule.created_by)
        .bind(schedule.created_at)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to create schedule: {}", e)))?;

        Ok(result)
    }

    /// Get schedule by ID
    pub async fn get_by_id(&self, id: &Uuid) -> Result<Option<Schedule>> {
        let result = sqlx::query_as::<_, Schedule>(&format!(
            "SELECT {SCHEDULE_COLUMNS} FROM schedules WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to get schedule by ID: {}", e)))?;

        Ok(result)
    }

    /// List schedules, optionally restricted to one date, newest first
    pub async fn list(&self, date: Option<NaiveDate>, limit: Option<i64>) -> Result<Vec<Schedule>> {
        let limit = limit.unwrap_or(100);

        let result = match date {
            Some(date) => {
                sqlx::query_as::<_, Schedule>(&format!(
                    r#"
                    SELECT {SCHEDULE_COLUMNS} FROM schedules
                    WHERE schedule_date = $1
                    ORDER BY created_at DESC
                    LIMIT $2
                    "#
                ))
                .bind(date)
                .bind(limit)
                .fetch_all(&*self.pool)
                .await
            }
            None => {
                sqlx::query_as::<_, Schedule>(&format!(
                    r#"
                    SELECT {SCHEDULE_COLUMNS} FROM schedules
                    ORDER BY schedule_date DESC, created_at DESC
                    LIMIT $1
                    "#
                ))
                .bind(limit)
                .fetch_all(&*self.pool)
                .await
            }
        }
        .map_err(|e| Error::Database(format!("Failed to list schedules: {}", e)))?;

        Ok(result)
    }

    /// Count schedules dated within a half-open date range
    pub async fn count_between(&self, start: NaiveDate, end: NaiveDate) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM schedules WHERE schedule_date >= $1 AND schedule_date < $2",
        )
        .bind(start)
        .bind(end)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to count schedules: {}", e)))?;

        Ok(count)
    }

    /// Count schedules in the range that received at least one checkin
    pub async fn covered_count_between(&self, start: NaiveDate, end: NaiveDate) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM schedules s
            WHERE s.schedule_date >= $1 AND s.schedule_date < $2
              AND EXISTS (SELECT 1 FROM checkins c WHERE c.schedule_id = s.id)
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to count covered schedules: {}", e)))?;

        Ok(count)
    }
}
