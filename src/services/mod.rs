pub mod alert_ledger;
pub mod incident_log;
pub mod patrol_ledger;
pub mod stats;

pub use alert_ledger::{AlertLedger, AlertSubmission, CreatedAlert, EvidencePhoto};
pub use incident_log::{IncidentLog, NewIncident};
pub use patrol_ledger::{CheckinRequest, NewSchedule, PatrolLedger};
pub use stats::{SecurityStats, StatsEngine, StatsWindow};
