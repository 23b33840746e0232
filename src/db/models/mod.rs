pub mod alert_models;
pub mod incident_models;
pub mod patrol_models;

pub use alert_models::{Alert, AlertStatus, AlertType};
pub use incident_models::{Incident, IncidentStatus};
pub use patrol_models::{Checkin, Schedule, ScheduleStatus, Shift};
