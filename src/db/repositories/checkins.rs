use crate::db::models::Checkin;
use crate::error::Error;
use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use uuid::Uuid;

const CHECKIN_COLUMNS: &str =
    "id, schedule_id, guard_id, checkin_time, checkout_time, latitude, longitude";

/// Checkins repository. The partial unique index on open checkins makes the
/// insert the serialization point for the one-patrol-at-a-time invariant:
/// of two racing check-ins for the same guard, exactly one insert succeeds.
#[derive(Clone)]
pub struct CheckinsRepository {
    pool: Arc<SqlitePool>,
}

impl CheckinsRepository {
    /// Create a new checkins repository
    pub fn new(pool: Arc<SqlitePool>) -> Self {
        Self { pool }
    }

    /// Insert a new open checkin. Fails with AlreadyCheckedIn when the guard
    /// already has an open checkin, regardless of schedule.
    pub async fn create(&self, checkin: &Checkin) -> Result<Checkin> {
        let result = sqlx::query_as::<_, Checkin>(&format!(
            r#"
            INSERT INTO checkins (
                id, schedule_id, guard_id, checkin_time, checkout_time, latitude, longitude
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {CHECKIN_COLUMNS}
            "#
        ))
        .bind(checkin.id)
        .bind(checkin.schedule_id)
        .bind(checkin.guard_id)
        .bind(checkin.checkin_time)
        .bind(checkin.checkout_time)
        .bind(checkin.latitude)
        .bind(checkin.longitude)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => Error::AlreadyCheckedIn(
                format!("Guard {} already has an open checkin", checkin.guard_id),
            ),
            _ => Error::Database(format!("Failed to create checkin: {}", e)),
        })?;

        Ok(result)
    }

    /// Get checkin by ID
    pub async fn get_by_id(&self, id: &Uuid) -> Result<Option<Checkin>> {
        let result = sqlx::query_as::<_, Checkin>(&format!(
            "SELECT {CHECKIN_COLUMNS} FROM checkins WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to get checkin by ID: {}", e)))?;

        Ok(result)
    }

    /// Get the guard's open checkin, if any
    pub async fn get_open_by_guard(&self, guard_id: &Uuid) -> Result<Option<Checkin>> {
        let result = sqlx::query_as::<_, Checkin>(&format!(
            r#"
            SELECT {CHECKIN_COLUMNS} FROM checkins
            WHERE guard_id = $1 AND checkout_time IS NULL
            "#
        ))
        .bind(guard_id)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to get open checkin: {}", e)))?;

        Ok(result)
    }

    /// CAS close: sets checkout_time only while the record is still open.
    /// Returns None when the checkin is missing or already closed.
    pub async fn close(&self, id: &Uuid, at: DateTime<Utc>) -> Result<Option<Checkin>> {
        let result = sqlx::query_as::<_, Checkin>(&format!(
            r#"
            UPDATE checkins
            SET checkout_time = $1
            WHERE id = $2 AND checkout_time IS NULL
            RETURNING {CHECKIN_COLUMNS}
            "#
        ))
        .bind(at)
        .bind(id)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to close checkin: {}", e)))?;

        Ok(result)
    }

    /// List a schedule's checkins, newest first
    pub async fn list_by_schedule(&self, schedule_id: &Uuid) -> Result<Vec<Checkin>> {
        let result = sqlx::query_as::<_, Checkin>(&format!(
            r#"
            SELECT {CHECKIN_COLUMNS} FROM checkins
            WHERE schedule_id = $1
            ORDER BY checkin_time DESC
            "#
        ))
        .bind(schedule_id)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to list checkins for schedule: {}", e)))?;

        Ok(result)
    }
}
