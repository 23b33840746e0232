use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Patrol shift. Each shift covers a fixed local window of the schedule date.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
pub enum Shift {
    #[sqlx(rename = "pagi")]
    #[serde(rename = "pagi")]
    Pagi,
    #[sqlx(rename = "siang")]
    #[serde(rename = "siang")]
    Siang,
    #[sqlx(rename = "sore")]
    #[serde(rename = "sore")]
    Sore,
    #[sqlx(rename = "malam_1")]
    #[serde(rename = "malam_1")]
    Malam1,
    #[sqlx(rename = "malam_2")]
    #[serde(rename = "malam_2")]
    Malam2,
}

impl Display for Shift {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pagi => write!(f, "pagi"),
            Self::Siang => write!(f, "siang"),
            Self::Sore => write!(f, "sore"),
            Self::Malam1 => write!(f, "malam_1"),
            Self::Malam2 => write!(f, "malam_2"),
        }
    }
}

impl Shift {
    /// Shift window on the given date. malam_1 runs to midnight; malam_2 is
    /// the small hours of the schedule date itself.
    pub fn window(&self, date: NaiveDate) -> (NaiveDateTime, NaiveDateTime) {
        let at = |d: NaiveDate, h: u32| d.and_time(NaiveTime::from_hms_opt(h, 0, 0).expect("static shift hour"));
        match self {
            Self::Pagi => (at(date, 6), at(date, 12)),
            Self::Siang => (at(date, 12), at(date, 15)),
            Self::Sore => (at(date, 15), at(date, 18)),
            Self::Malam1 => (
                at(date, 18),
                at(date.succ_opt().unwrap_or(date), 0),
            ),
            Self::Malam2 => (at(date, 0), at(date, 6)),
        }
    }
}

/// Derived schedule status; never stored, recomputed from the shift window
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleStatus {
    Scheduled,
    Completed,
}

/// A patrol shift assignment, created by an admin and immutable once past.
/// assigned_blocks is informational and not enforced against check-ins.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Schedule {
    pub id: Uuid,
    pub schedule_date: NaiveDate,
    pub shift: Shift,
    pub assigned_blocks: Json<Vec<String>>,
    pub notes: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Schedule {
    pub fn status_at(&self, now: NaiveDateTime) -> ScheduleStatus {
        let (_, end) = self.shift.window(self.schedule_date);
        if now >= end {
            ScheduleStatus::Completed
        } else {
            ScheduleStatus::Scheduled
        }
    }

    pub fn status_now(&self) -> ScheduleStatus {
        self.status_at(Utc::now().naive_utc())
    }
}

/// The open/close bracket of a guard's patrol session. A closed checkin is
/// never reopened.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Checkin {
    pub id: Uuid,
    pub schedule_id: Uuid,
    pub guard_id: Uuid,
    pub checkin_time: DateTime<Utc>,
    pub checkout_time: Option<DateTime<Utc>>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl Checkin {
    pub fn is_open(&self) -> bool {
        self.checkout_time.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schedule_status_derives_from_shift_window() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        let schedule = Schedule {
            id: Uuid::new_v4(),
            schedule_date: date,
            shift: Shift::Pagi,
            assigned_blocks: Json(vec!["A1".to_string()]),
            notes: None,
            created_by: Uuid::new_v4(),
            created_at: Utc::now(),
        };

        let during = date.and_hms_opt(9, 0, 0).unwrap();
        let after = date.and_hms_opt(13, 0, 0).unwrap();
        assert_eq!(schedule.status_at(during), ScheduleStatus::Scheduled);
        assert_eq!(schedule.status_at(after), ScheduleStatus::Completed);
    }

    #[test]
    fn malam_1_window_runs_to_midnight() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        let (start, end) = Shift::Malam1.window(date);
        assert_eq!(start, date.and_hms_opt(18, 0, 0).unwrap());
        assert_eq!(
            end,
            NaiveDate::from_ymd_opt(2026, 3, 11).unwrap().and_hms_opt(0, 0, 0).unwrap()
        );
    }
}
