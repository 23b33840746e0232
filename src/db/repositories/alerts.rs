use crate::db::models::{Alert, AlertStatus};
use crate::error::Error;
use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use uuid::Uuid;

const ALERT_COLUMNS: &str = "id, reporter_id, reporter_block, alert_type, description, \
     latitude, longitude, photo_url, status, responder_id, created_at, responded_at, resolved_at";

/// Alerts repository. Status transitions are single-statement
/// compare-and-swap updates so per-alert serialization lives in the
/// database, not behind a global lock.
#[derive(Clone)]
pub struct AlertsRepository {
    pool: Arc<SqlitePool>,
}

impl AlertsRepository {
    /// Create a new alerts repository
    pub fn new(pool: Arc<SqlitePool>) -> Self {
        Self { pool }
    }

    /// Insert a new alert
    pub async fn create(&self, alert: &Alert) -> Result<Alert> {
        let result = sqlx::query_as::<_, Alert>(&format!(
            r#"
            INSERT INTO alerts (
                id, reporter_id, reporter_block, alert_type, description,
                latitude, longitude, photo_url, status, responder_id,
                created_at, responded_at, resolved_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING {ALERT_COLUMNS}
            "#
        ))
        .bind(alert.id)
        .bind(alert.reporter_id)
        .bind(&alert.reporter_block)
        .bind(alert.alert_type)
        .bind(&alert.description)
        .bind(alert.latitude)
        .bind(alert.longitude)
        .bind(&alert.photo_url)
        .bind(alert.status)
        .bind(alert.responder_id)
        .bind(alert.created_at)
        .bind(alert.responded_at)
        .bind(alert.resolved_at)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to create alert: {}", e)))?;

        Ok(result)
    }

    /// Get alert by ID
    pub async fn get_by_id(&self, id: &Uuid) -> Result<Option<Alert>> {
        let result = sqlx::query_as::<_, Alert>(&format!(
            "SELECT {ALERT_COLUMNS} FROM alerts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to get alert by ID: {}", e)))?;

        Ok(result)
    }

    /// List alerts newest first, optionally filtered by status
    pub async fn list(&self, status: Option<AlertStatus>, limit: Option<i64>) -> Result<Vec<Alert>> {
        let limit = limit.unwrap_or(100);

        let result = match status {
            Some(status) => {
                sqlx::query_as::<_, Alert>(&format!(
                    r#"
                    SELECT {ALERT_COLUMNS} FROM alerts
                    WHERE status = $1
                    ORDER BY created_at DESC
                    LIMIT $2
                    "#
                ))
                .bind(status)
                .bind(limit)
                .fetch_all(&*self.pool)
                .await
            }
            None => {
                sqlx::query_as::<_, Alert>(&format!(
                    r#"
                    SELECT {ALERT_COLUMNS} FROM alerts
                    ORDER BY created_at DESC
                    LIMIT $1
                    "#
                ))
                .bind(limit)
                .fetch_all(&*self.pool)
                .await
            }
        }
        .map_err(|e| Error::Database(format!("Failed to list alerts: {}", e)))?;

        Ok(result)
    }

    /// CAS transition active -> responding. Returns None when the alert is
    /// missing or no longer `active`; the first responder wins the race.
    pub async fn mark_responding(
        &self,
        id: &Uuid,
        responder_id: &Uuid,
        at: DateTime<Utc>,
    ) -> Result<Option<Alert>> {
        let result = sqlx::query_as::<_, Alert>(&format!(
            r#"
            UPDATE alerts
            SET status = $1, responder_id = $2, responded_at = $3
            WHERE id = $4 AND status = $5
            RETURNING {ALERT_COLUMNS}
            "#
        ))
        .bind(AlertStatus::Responding)
        .bind(responder_id)
        .bind(at)
        .bind(id)
        .bind(AlertStatus::Active)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to mark alert responding: {}", e)))?;

        Ok(result)
    }

    /// CAS transition responding -> resolved
    pub async fn mark_resolved(&self, id: &Uuid, at: DateTime<Utc>) -> Result<Option<Alert>> {
        let result = sqlx::query_as::<_, Alert>(&format!(
            r#"
            UPDATE alerts
            SET status = $1, resolved_at = $2
            WHERE id = $3 AND status = $4
            RETURNING {ALERT_COLUMNS}
            "#
        ))
        .bind(AlertStatus::Resolved)
        .bind(at)
        .bind(id)
        .bind(AlertStatus::Responding)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to mark alert resolved: {}", e)))?;

        Ok(result)
    }

    /// CAS transition active -> false_alarm
    pub async fn mark_false_alarm(&self, id: &Uuid) -> Result<Option<Alert>> {
        let result = sqlx::query_as::<_, Alert>(&format!(
            r#"
            UPDATE alerts
            SET status = $1
            WHERE id = $2 AND status = $3
            RETURNING {ALERT_COLUMNS}
            "#
        ))
        .bind(AlertStatus::FalseAlarm)
        .bind(id)
        .bind(AlertStatus::Active)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to mark alert false alarm: {}", e)))?;

        Ok(result)
    }

    /// Get alerts created in a half-open time range
    pub async fn list_created_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Alert>> {
        let result = sqlx::query_as::<_, Alert>(&format!(
            r#"
            SELECT {ALERT_COLUMNS} FROM alerts
            WHERE created_at >= $1 AND created_at < $2
            ORDER BY created_at DESC
            "#
        ))
        .bind(start)
        .bind(end)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to get alerts in time range: {}", e)))?;

        Ok(result)
    }
}
