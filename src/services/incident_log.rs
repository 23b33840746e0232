use crate::capture::GeoPoint;
use crate::db::models::{Incident, IncidentStatus};
use crate::db::repositories::IncidentsRepository;
use crate::error::Error;
use crate::messaging::{EventMessage, EventType, NotificationBus};
use crate::security::{self, Actor};
use anyhow::Result;
use chrono::Utc;
use log::warn;
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Reporter input for a new incident report
pub struct NewIncident {
    pub reporter_id: Uuid,
    pub reporter_block: String,
    pub incident_type: String,
    pub title: String,
    pub description: String,
    pub location: Option<GeoPoint>,
    pub photo_url: Option<String>,
}

/// Owns incident reports: submission by residents and a single review step
/// by security coordinators.
pub struct IncidentLog {
    incidents: IncidentsRepository,
    bus: Arc<NotificationBus>,
}

impl IncidentLog {
    /// Create a new incident log
    pub fn new(pool: Arc<SqlitePool>, bus: Arc<NotificationBus>) -> Self {
        Self {
            incidents: IncidentsRepository::new(pool),
            bus,
        }
    }

    /// File a new incident report in state `open`
    pub async fn report_incident(&self, new: NewIncident) -> Result<Incident> {
        if new.reporter_block.trim().is_empty() {
            return Err(Error::Validation("reporter_block must not be empty".to_string()).into());
        }
        if new.title.trim().is_empty() {
            return Err(Error::Validation("title must not be empty".to_string()).into());
        }

        let incident = Incident {
            id: Uuid::new_v4(),
            reporter_id: new.reporter_id,
            reporter_block: new.reporter_block,
            incident_type: new.incident_type,
            title: new.title,
            description: new.description,
            photo_url: new.photo_url,
            latitude: new.location.map(|p| p.latitude),
            longitude: new.location.map(|p| p.longitude),
            status: IncidentStatus::Open,
            reviewed_by: None,
            reviewed_at: None,
            created_at: Utc::now(),
        };

        let created = self.incidents.create(&incident).await?;

        info!(
            "Incident reported: {} from block {}",
            created.id, created.reporter_block
        );

        self.publish(EventType::IncidentReported, &created);

        Ok(created)
    }

    /// Mark an open incident as reviewed
    pub async fn review_incident(&self, incident_id: &Uuid, actor: &Actor) -> Result<Incident> {
        security::require_responder(actor)?;

        match self
            .incidents
            .mark_reviewed(incident_id, &actor.id, Utc::now())
            .await?
        {
            Some(incident) => {
                info!("Incident {} reviewed by {}", incident.id, actor.id);
                self.publish(EventType::IncidentReviewed, &incident);
                Ok(incident)
            }
            None => match self.incidents.get_by_id(incident_id).await? {
                Some(_) => Err(Error::InvalidTransition(format!(
                    "Incident {} is already reviewed",
                    incident_id
                ))
                .into()),
                None => {
                    Err(Error::NotFound(format!("Incident not found: {}", incident_id)).into())
                }
            },
        }
    }

    /// List incidents newest first, optionally filtered by status
    pub async fn list(
        &self,
        status: Option<IncidentStatus>,
        limit: Option<i64>,
    ) -> Result<Vec<Incident>> {
        self.incidents.list(status, limit).await
    }

    fn publish(&self, event_type: EventType, incident: &Incident) {
        match EventMessage::new(event_type, Some(incident.id), incident) {
            Ok(event) => {
                self.bus.publish(event);
            }
            Err(e) => warn!("Failed to serialize incident event: {}", e),
        }
    }
}
