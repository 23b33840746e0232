use crate::db::models::{Incident, IncidentStatus};
use crate::error::Error;
use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use uuid::Uuid;

const INCIDENT_COLUMNS: &str = "id, reporter_id, reporter_block, incident_type, title, \
     description, photo_url, latitude, longitude, status, reviewed_by, reviewed_at, created_at";

/// Incident reports repository
#[derive(Clone)]
pub struct IncidentsRepository {
    pool: Arc<SqlitePool>,
}

impl IncidentsRepository {
    /// Create a new incidents repository
    pub fn new(pool: Arc<SqlitePool>) -> Self {
        Self { pool }
    }

    /// Insert a new incident report
    pub async fn create(&self, incident: &Incident) -> Result<Incident> {
        let result = sqlx::query_as::<_, Incident>(&format!(
            r#"
            INSERT INTO incidents (
                id, reporter_id, reporter_block, incident_type, title, description,
                photo_url, latitude, longitude, status, reviewed_by, reviewed_at, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING {INCIDENT_COLUMNS}
            "#
        ))
        .bind(incident.id)
        .bind(incident.reporter_id)
        .bind(&incident.reporter_block)
        .bind(&incident.incident_type)
        .bind(&incident.title)
        .bind(&incident.description)
        .bind(&incident.photo_url)
        .bind(incident.latitude)
        .bind(incident.longitude)
        .bind(incident.status)
        .bind(incident.reviewed_by)
        .bind(incident.reviewed_at)
        .bind(incident.created_at)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to create incident: {}", e)))?;

        Ok(result)
    }

    /// Get incident by ID
    pub async fn get_by_id(&self, id: &Uuid) -> Result<Option<Incident>> {
        let result = sqlx::query_as::<_, Incident>(&format!(
            "SELECT {INCIDENT_COLUMNS} FROM incidents WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to get incident by ID: {}", e)))?;

        Ok(result)
    }

    /// List incidents newest first, optionally filtered by status
    pub async fn list(
        &self,
        status: Option<IncidentStatus>,
        limit: Option<i64>,
    ) -> Result<Vec<Incident>> {
        let limit = limit.unwrap_or(100);

        let result = match status {
            Some(status) => {
                sqlx::query_as::<_, Incident>(&format!(
                    r#"
                    SELECT {INCIDENT_COLUMNS} FROM incidents
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
                sqlx::query_as::<_, Incident>(&format!(
                    r#"
                    SELECT {INCIDENT_COLUMNS} FROM incidents
                    ORDER BY created_at DESC
                    LIMIT $1
                    "#
                ))
                .bind(limit)
                .fetch_all(&*self.pool)
                .await
            }
        }
        .map_err(|e| Error::Database(format!("Failed to list incidents: {}", e)))?;

        Ok(result)
    }

    /// CAS transition open -> reviewed. Returns None when the incident is
    /// missing or already reviewed.
    pub async fn mark_reviewed(
        &self,
        id: &Uuid,
        reviewer_id: &Uuid,
        at: DateTime<Utc>,
    ) -> Result<Option<Incident>> {
        let result = sqlx::query_as::<_, Incident>(&format!(
            r#"
            UPDATE incidents
            SET status = $1, reviewed_by = $2, reviewed_at = $3
            WHERE id = $4 AND status = $5
            RETURNING {INCIDENT_COLUMNS}
            "#
        ))
        .bind(IncidentStatus::Reviewed)
        .bind(reviewer_id)
        .bind(at)
        .bind(id)
        .bind(IncidentStatus::Open)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to mark incident reviewed: {}", e)))?;

        Ok(result)
    }

    /// Count incidents created in a half-open time range
    pub async fn count_between(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM incidents WHERE created_at >= $1 AND created_at < $2",
        )
        .bind(start)
        .bind(end)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to count incidents: {}", e)))?;

        Ok(count)
    }
}
