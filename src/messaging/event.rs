use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Event types published by the ledgers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum EventType {
    // Alert lifecycle events
    AlertCreated,
    AlertResponding,
    AlertResolved,
    AlertFalseAlarm,

    // Patrol events
    ScheduleCreated,
    GuardCheckedIn,
    GuardCheckedOut,

    // Incident events
    IncidentReported,
    IncidentReviewed,

    // System events
    SystemStartup,
    SystemShutdown,
}

impl Display for EventType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AlertCreated => write!(f, "alert.created"),
            Self::AlertResponding => write!(f, "alert.responding"),
            Self::AlertResolved => write!(f, "alert.resolved"),
            Self::AlertFalseAlarm => write!(f, "alert.false_alarm"),
            Self::ScheduleCreated => write!(f, "patrol.schedule_created"),
            Self::GuardCheckedIn => write!(f, "patrol.checked_in"),
            Self::GuardCheckedOut => write!(f, "patrol.checked_out"),
            Self::IncidentReported => write!(f, "incident.reported"),
            Self::IncidentReviewed => write!(f, "incident.reviewed"),
            Self::SystemStartup => write!(f, "system.startup"),
            Self::SystemShutdown => write!(f, "system.shutdown"),
        }
    }
}

/// Event message structure. The payload is a full snapshot of the changed
/// record, so dashboards can apply events idempotently by id + status
/// without any merge logic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMessage {
    /// Unique event ID
    pub id: Uuid,
    /// Event type
    pub event_type: EventType,
    /// Event source ID (e.g. alert ID)
    pub source_id: Option<Uuid>,
    /// Event timestamp
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// Record snapshot
    pub payload: serde_json::Value,
}

impl EventMessage {
    /// Create a new event message
    pub fn new<T: Serialize>(
        event_type: EventType,
        source_id: Option<Uuid>,
        payload: T,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            id: Uuid::new_v4(),
            event_type,
            source_id,
            timestamp: chrono::Utc::now(),
            payload: serde_json::to_value(payload)?,
        })
    }

    /// Create a new event message with empty payload
    pub fn new_empty(event_type: EventType, source_id: Option<Uuid>) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_type,
            source_id,
            timestamp: chrono::Utc::now(),
            payload: serde_json::Value::Null,
        }
    }

    /// Get the routing key for the event
    pub fn routing_key(&self) -> String {
        match &self.source_id {
            Some(id) => format!("{}.{}", self.event_type, id),
            None => self.event_type.to_string(),
        }
    }
}
