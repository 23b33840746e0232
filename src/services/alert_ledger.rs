use crate::capture::{self, EvidenceFolder, EvidenceStore, GeoCapture, GeoPoint};
use crate::config::CaptureConfig;
use crate::db::models::{Alert, AlertStatus, AlertType};
use crate::db::repositories::AlertsRepository;
use crate::error::Error;
use crate::messaging::{EventMessage, EventType, NotificationBus};
use crate::security::{self, Actor};
use anyhow::Result;
use chrono::Utc;
use log::warn;
use serde::Serialize;
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

/// A raw photo to be pushed to the evidence store during alert creation
pub struct EvidencePhoto {
    pub data: Vec<u8>,
    pub file_name: String,
}

/// Reporter input for a new alert
pub struct AlertSubmission {
    pub reporter_id: Uuid,
    pub reporter_block: String,
    pub alert_type: AlertType,
    pub description: Option<String>,
    pub location: Option<GeoPoint>,
    /// Raw evidence photo, uploaded best-effort during creation
    pub photo: Option<EvidencePhoto>,
    /// Pre-uploaded photo URL, used as-is when no raw photo is given
    pub photo_url: Option<String>,
}

/// Creation result. Warnings carry the degraded enrichments (geolocation or
/// evidence upload failures); the alert itself always exists once returned.
#[derive(Debug, Clone, Serialize)]
pub struct CreatedAlert {
    pub alert: Alert,
    pub warnings: Vec<String>,
}

/// Owns the alert lifecycle. All mutations go through the repository's
/// compare-and-swap transitions and every successful mutation is pushed to
/// the notification bus before returning.
pub struct AlertLedger {
    alerts: AlertsRepository,
    bus: Arc<NotificationBus>,
    capture_config: CaptureConfig,
    geo: Option<Arc<dyn GeoCapture>>,
    evidence: Option<Arc<dyn EvidenceStore>>,
}

impl AlertLedger {
    /// Create a new alert ledger
    pub fn new(pool: Arc<SqlitePool>, bus: Arc<NotificationBus>) -> Self {
        Self {
            alerts: AlertsRepository::new(pool),
            bus,
            capture_config: CaptureConfig::default(),
            geo: None,
            evidence: None,
        }
    }

    /// Attach collaborators used to enrich submissions
    pub fn with_capture(
        mut self,
        config: CaptureConfig,
        geo: Option<Arc<dyn GeoCapture>>,
        evidence: Option<Arc<dyn EvidenceStore>>,
    ) -> Self {
        self.capture_config = config;
        self.geo = geo;
        self.evidence = evidence;
        self
    }

    /// Create a new alert in state `active`. Fails only on invalid input;
    /// geolocation and evidence failures degrade to warnings.
    pub async fn create_alert(&self, submission: AlertSubmission) -> Result<CreatedAlert> {
        let AlertSubmission {
            reporter_id,
            reporter_block,
            alert_type,
            description,
            location,
            photo,
            photo_url,
        } = submission;

        if reporter_block.trim().is_empty() {
            return Err(Error::Validation("reporter_block must not be empty".to_string()).into());
        }

        let mut warnings = Vec::new();

        let location = match location {
            Some(point) => Some(point),
            None => self.capture_location(&mut warnings).await,
        };

        let photo_url = match photo {
            Some(photo) => self
                .upload_evidence(photo, &mut warnings)
                .await
                .or(photo_url),
            None => photo_url,
        };

        let alert = Alert {
            id: Uuid::new_v4(),
            reporter_id,
            reporter_block,
            alert_type,
            description,
            latitude: location.map(|p| p.latitude),
            longitude: location.map(|p| p.longitude),
            photo_url,
            status: AlertStatus::Active,
            responder_id: None,
            created_at: Utc::now(),
            responded_at: None,
            resolved_at: None,
        };

        let created = self.alerts.create(&alert).await?;

        info!(
            "Alert created: {} from block {}",
            created.id, created.reporter_block
        );

        self.publish(EventType::AlertCreated, &created);

        Ok(CreatedAlert {
            alert: created,
            warnings,
        })
    }

    /// Respond to an active alert. First caller wins; a second responder
    /// gets InvalidTransition and the original responder_id stands.
    pub async fn respond(&self, alert_id: &Uuid, responder: &Actor) -> Result<Alert> {
        security::require_responder(responder)?;

        match self
            .alerts
            .mark_responding(alert_id, &responder.id, Utc::now())
            .await?
        {
            Some(alert) => {
                info!("Alert {} responding, responder {}", alert.id, responder.id);
                self.publish(EventType::AlertResponding, &alert);
                Ok(alert)
            }
            None => Err(self.transition_conflict(alert_id, "respond to").await?),
        }
    }

    /// Resolve a responding alert
    pub async fn resolve(&self, alert_id: &Uuid, actor: &Actor) -> Result<Alert> {
        security::require_responder(actor)?;

        match self.alerts.mark_resolved(alert_id, Utc::now()).await? {
            Some(alert) => {
                info!("Alert {} resolved", alert.id);
                self.publish(EventType::AlertResolved, &alert);
                Ok(alert)
            }
            None => Err(self.transition_conflict(alert_id, "resolve").await?),
        }
    }

    /// Dismiss an active alert as a false alarm. Not legal once a responder
    /// has engaged; a responding alert must be resolved instead.
    pub async fn mark_false_alarm(&self, alert_id: &Uuid, actor: &Actor) -> Result<Alert> {
        security::require_responder(actor)?;

        match self.alerts.mark_false_alarm(alert_id).await? {
            Some(alert) => {
                info!("Alert {} dismissed as false alarm", alert.id);
                self.publish(EventType::AlertFalseAlarm, &alert);
                Ok(alert)
            }
            None => Err(self.transition_conflict(alert_id, "dismiss").await?),
        }
    }

    /// List alerts newest first, optionally filtered by status
    pub async fn list(&self, status: Option<AlertStatus>, limit: Option<i64>) -> Result<Vec<Alert>> {
        self.alerts.list(status, limit).await
    }

    async fn capture_location(&self, warnings: &mut Vec<String>) -> Option<GeoPoint> {
        let geo = self.geo.as_ref()?;
        let timeout = Duration::from_secs(self.capture_config.geo_timeout_secs);

        match capture::capture_position(geo.as_ref(), timeout).await {
            Ok(point) => Some(point),
            Err(e) => {
                warn!("Geolocation capture failed: {}", e);
                warnings.push(format!("Location unavailable: {}", e));
                None
            }
        }
    }

    async fn upload_evidence(
        &self,
        photo: EvidencePhoto,
        warnings: &mut Vec<String>,
    ) -> Option<String> {
        let Some(store) = self.evidence.as_ref() else {
            warnings.push("No evidence store configured, photo discarded".to_string());
            return None;
        };
        let timeout = Duration::from_secs(self.capture_config.upload_timeout_secs);

        match capture::store_evidence(
            store.as_ref(),
            photo.data,
            &photo.file_name,
            EvidenceFolder::PanicEvidence,
            timeout,
        )
        .await
        {
            Ok(url) => Some(url),
            Err(e) => {
                warn!("Evidence upload failed: {}", e);
                warnings.push(format!("Photo upload failed: {}", e));
                None
            }
        }
    }

    /// Distinguish a missing alert from an illegal transition after a CAS
    /// update matched no row
    async fn transition_conflict(&self, alert_id: &Uuid, action: &str) -> Result<anyhow::Error> {
        Ok(match self.alerts.get_by_id(alert_id).await? {
            Some(alert) => Error::InvalidTransition(format!(
                "Cannot {} alert {} in state {}",
                action, alert_id, alert.status
            ))
            .into(),
            None => Error::NotFound(format!("Alert not found: {}", alert_id)).into(),
        })
    }

    fn publish(&self, event_type: EventType, alert: &Alert) {
        match EventMessage::new(event_type, Some(alert.id), alert) {
            Ok(event) => {
                self.bus.publish(event);
            }
            Err(e) => warn!("Failed to serialize alert event: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::fakes::{
        FailingEvidenceStore, FixedGeoCapture, InMemoryEvidenceStore, UnavailableGeoCapture,
    };
    use crate::db::connect_test_pool;
    use crate::security::Role;

    async fn ledger() -> Result<(AlertLedger, Arc<NotificationBus>)> {
        let pool = connect_test_pool().await?;
        let bus = Arc::new(NotificationBus::new(16));
        Ok((AlertLedger::new(pool, bus.clone()), bus))
    }

    fn submission(block: &str) -> AlertSubmission {
        AlertSubmission {
            reporter_id: Uuid::new_v4(),
            reporter_block: block.to_string(),
            alert_type: AlertType::Emergency,
            description: None,
            location: None,
            photo: None,
            photo_url: None,
        }
    }

    fn responder() -> Actor {
        Actor::new(Uuid::new_v4(), Role::Security)
    }

    fn assert_invalid_transition(err: &anyhow::Error) {
        assert!(
            matches!(err.downcast_ref::<Error>(), Some(Error::InvalidTransition(_))),
            "expected InvalidTransition, got: {}",
            err
        );
    }

    #[tokio::test]
    async fn test_create_alert_starts_active_and_publishes() -> Result<()> {
        let (ledger, bus) = ledger().await?;
        let mut subscription = bus.subscribe();

        let created = ledger.create_alert(submission("A1")).await?;
        assert_eq!(created.alert.status, AlertStatus::Active);
        assert!(created.alert.responder_id.is_none());
        assert!(created.warnings.is_empty());

        let event = subscription.recv().await.expect("creation event");
        assert_eq!(event.event_type, EventType::AlertCreated);
        assert_eq!(event.source_id, Some(created.alert.id));
        assert_eq!(event.payload["status"], "active");

        Ok(())
    }

    #[tokio::test]
    async fn test_create_alert_rejects_empty_block() -> Result<()> {
        let (ledger, _bus) = ledger().await?;

        let err = ledger.create_alert(submission("  ")).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::Validation(_))
        ));

        Ok(())
    }

    #[tokio::test]
    async fn test_second_responder_loses_and_first_stands() -> Result<()> {
        let (ledger, _bus) = ledger().await?;
        let created = ledger.create_alert(submission("A1")).await?;

        let first = responder();
        let second = responder();

        let alert = ledger.respond(&created.alert.id, &first).await?;
        assert_eq!(alert.status, AlertStatus::Responding);
        assert_eq!(alert.responder_id, Some(first.id));

        let err = ledger.respond(&created.alert.id, &second).await.unwrap_err();
        assert_invalid_transition(&err);

        let listed = ledger.list(Some(AlertStatus::Responding), None).await?;
        assert_eq!(listed[0].responder_id, Some(first.id));

        Ok(())
    }

    #[tokio::test]
    async fn test_responding_alert_cannot_be_dismissed_only_resolved() -> Result<()> {
        let (ledger, _bus) = ledger().await?;
        let created = ledger.create_alert(submission("B2")).await?;
        let actor = responder();

        ledger.respond(&created.alert.id, &actor).await?;

        let err = ledger
            .mark_false_alarm(&created.alert.id, &actor)
            .await
            .unwrap_err();
        assert_invalid_transition(&err);

        let alert = ledger.resolve(&created.alert.id, &actor).await?;
        assert_eq!(alert.status, AlertStatus::Resolved);
        assert!(alert.resolved_at.is_some());

        Ok(())
    }

    #[tokio::test]
    async fn test_resolved_is_terminal() -> Result<()> {
        let (ledger, _bus) = ledger().await?;
        let created = ledger.create_alert(submission("A1")).await?;
        let actor = responder();

        ledger.respond(&created.alert.id, &actor).await?;
        ledger.resolve(&created.alert.id, &actor).await?;

        let err = ledger.resolve(&created.alert.id, &actor).await.unwrap_err();
        assert_invalid_transition(&err);

        let listed = ledger.list(None, None).await?;
        assert_eq!(listed[0].status, AlertStatus::Resolved);

        Ok(())
    }

    #[tokio::test]
    async fn test_false_alarm_from_active() -> Result<()> {
        let (ledger, _bus) = ledger().await?;
        let created = ledger.create_alert(submission("C3")).await?;

        let alert = ledger
            .mark_false_alarm(&created.alert.id, &responder())
            .await?;
        assert_eq!(alert.status, AlertStatus::FalseAlarm);

        Ok(())
    }

    #[tokio::test]
    async fn test_resident_cannot_respond() -> Result<()> {
        let (ledger, _bus) = ledger().await?;
        let created = ledger.create_alert(submission("A1")).await?;

        let resident = Actor::new(Uuid::new_v4(), Role::Warga);
        let err = ledger.respond(&created.alert.id, &resident).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::Authorization(_))
        ));

        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_alert_is_not_found() -> Result<()> {
        let (ledger, _bus) = ledger().await?;

        let err = ledger.respond(&Uuid::new_v4(), &responder()).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::NotFound(_))
        ));

        Ok(())
    }

    #[tokio::test]
    async fn test_degraded_enrichment_still_creates_alert() -> Result<()> {
        let pool = connect_test_pool().await?;
        let bus = Arc::new(NotificationBus::new(16));
        let ledger = AlertLedger::new(pool, bus).with_capture(
            CaptureConfig::default(),
            Some(Arc::new(UnavailableGeoCapture)),
            Some(Arc::new(FailingEvidenceStore)),
        );

        let mut input = submission("A1");
        input.photo = Some(EvidencePhoto {
            data: vec![0xFF, 0xD8],
            file_name: "panic.jpg".to_string(),
        });

        let created = ledger.create_alert(input).await?;
        assert_eq!(created.alert.status, AlertStatus::Active);
        assert!(created.alert.location().is_none());
        assert!(created.alert.photo_url.is_none());
        assert_eq!(created.warnings.len(), 2);

        Ok(())
    }

    #[tokio::test]
    async fn test_enrichment_fills_location_and_photo() -> Result<()> {
        let pool = connect_test_pool().await?;
        let bus = Arc::new(NotificationBus::new(16));
        let point = GeoPoint {
            latitude: -6.2,
            longitude: 106.8,
        };
        let ledger = AlertLedger::new(pool, bus).with_capture(
            CaptureConfig::default(),
            Some(Arc::new(FixedGeoCapture(point))),
            Some(Arc::new(InMemoryEvidenceStore)),
        );

        let mut input = submission("A1");
        input.photo = Some(EvidencePhoto {
            data: vec![0xFF, 0xD8],
            file_name: "panic.jpg".to_string(),
        });

        let created = ledger.create_alert(input).await?;
        assert_eq!(created.alert.location(), Some(point));
        assert_eq!(
            created.alert.photo_url.as_deref(),
            Some("https://evidence.local/panic-evidence/panic.jpg")
        );
        assert!(created.warnings.is_empty());

        Ok(())
    }
}
