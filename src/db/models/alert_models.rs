use crate::capture::GeoPoint;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Category of a panic alert
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    Emergency,
    Medical,
    Fire,
    Theft,
    Suspicious,
    Other,
}

/// Alert lifecycle status.
///
/// `active --respond--> responding --resolve--> resolved`
/// `active --false alarm--> false_alarm`
///
/// `resolved` and `false_alarm` are terminal. Once a responder has engaged,
/// the alert must be resolved, not dismissed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AlertStatus {
    Active,
    Responding,
    Resolved,
    FalseAlarm,
}

impl Display for AlertStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Responding => write!(f, "responding"),
            Self::Resolved => write!(f, "resolved"),
            Self::FalseAlarm => write!(f, "false_alarm"),
        }
    }
}

/// A reported emergency event and its lifecycle record. Alerts are never
/// deleted, only transitioned, so the table doubles as an audit trail.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Alert {
    pub id: Uuid,
    pub reporter_id: Uuid,
    pub reporter_block: String,
    pub alert_type: AlertType,
    pub description: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub photo_url: Option<String>,
    pub status: AlertStatus,
    /// Set once, on the first transition out of `active`; immutable after
    pub responder_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    /// First `responding` timestamp, feeds the response-latency statistic
    pub responded_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Alert {
    pub fn location(&self) -> Option<GeoPoint> {
        match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => Some(GeoPoint {
                latitude,
                longitude,
            }),
            _ => None,
        }
    }
}
