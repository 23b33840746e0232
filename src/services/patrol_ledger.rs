use crate::capture::GeoPoint;
use crate::db::models::{Checkin, Schedule, Shift};
use crate::db::repositories::{CheckinsRepository, SchedulesRepository};
use crate::error::Error;
use crate::messaging::{EventMessage, EventType, NotificationBus};
use crate::security::{self, Actor};
use anyhow::Result;
use chrono::{NaiveDate, Utc};
use log::warn;
use serde::Serialize;
use sqlx::types::Json;
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Admin input for a new patrol schedule
pub struct NewSchedule {
    pub schedule_date: NaiveDate,
    pub shift: Shift,
    pub assigned_blocks: Vec<String>,
    pub notes: Option<String>,
}

/// Guard input for a patrol check-in
pub struct CheckinRequest {
    pub schedule_id: Uuid,
    pub guard_id: Uuid,
    pub location: Option<GeoPoint>,
}

/// Owns schedules and check-ins. A guard can be on at most one patrol at a
/// time; the storage layer's unique index makes that hold under races.
pub struct PatrolLedger {
    schedules: SchedulesRepository,
    checkins: CheckinsRepository,
    bus: Arc<NotificationBus>,
}

impl PatrolLedger {
    /// Create a new patrol ledger
    pub fn new(pool: Arc<SqlitePool>, bus: Arc<NotificationBus>) -> Self {
        Self {
            schedules: SchedulesRepository::new(pool.clone()),
            checkins: CheckinsRepository::new(pool),
            bus,
        }
    }

    /// Create a patrol schedule. Admin capability required; overlapping
    /// shifts are not rejected.
    pub async fn create_schedule(&self, actor: &Actor, new: NewSchedule) -> Result<Schedule> {
        security::require_schedule_admin(actor)?;

        let schedule = Schedule {
            id: Uuid::new_v4(),
            schedule_date: new.schedule_date,
            shift: new.shift,
            assigned_blocks: Json(new.assigned_blocks),
            notes: new.notes,
            created_by: actor.id,
            created_at: Utc::now(),
        };

        let created = self.schedules.create(&schedule).await?;
        self.publish(EventType::ScheduleCreated, created.id, &created);

        Ok(created)
    }

    /// Open a patrol session for a guard. Fails with AlreadyCheckedIn if
    /// the guard has any open checkin, regardless of schedule.
    pub async fn checkin(&self, request: CheckinRequest) -> Result<Checkin> {
        self.schedules
            .get_by_id(&request.schedule_id)
            .await?
            .ok_or_else(|| {
                Error::NotFound(format!("Schedule not found: {}", request.schedule_id))
            })?;

        let checkin = Checkin {
            id: Uuid::new_v4(),
            schedule_id: request.schedule_id,
            guard_id: request.guard_id,
            checkin_time: Utc::now(),
            checkout_time: None,
            latitude: request.location.map(|p| p.latitude),
            longitude: request.location.map(|p| p.longitude),
        };

        let created = self.checkins.create(&checkin).await?;

        info!(
            "Guard {} checked in to schedule {}",
            created.guard_id, created.schedule_id
        );

        self.publish(EventType::GuardCheckedIn, created.id, &created);

        Ok(created)
    }

    /// Close a patrol session permanently. A closed checkin is never
    /// reopened.
    pub async fn checkout(&self, checkin_id: &Uuid) -> Result<Checkin> {
        match self.checkins.close(checkin_id, Utc::now()).await? {
            Some(checkin) => {
                info!("Guard {} checked out", checkin.guard_id);
                self.publish(EventType::GuardCheckedOut, checkin.id, &checkin);
                Ok(checkin)
            }
            None => match self.checkins.get_by_id(checkin_id).await? {
                Some(_) => Err(Error::AlreadyClosed(format!(
                    "Checkin {} is already closed",
                    checkin_id
                ))
                .into()),
                None => {
                    Err(Error::NotFound(format!("Checkin not found: {}", checkin_id)).into())
                }
            },
        }
    }

    /// The guard's open checkin, if any. Read path for "resume session" UI.
    pub async fn get_active_checkin(&self, guard_id: &Uuid) -> Result<Option<Checkin>> {
        self.checkins.get_open_by_guard(guard_id).await
    }

    /// List schedules, optionally restricted to one date
    pub async fn list_schedules(
        &self,
        date: Option<NaiveDate>,
        limit: Option<i64>,
    ) -> Result<Vec<Schedule>> {
        self.schedules.list(date, limit).await
    }

    fn publish<T: Serialize>(&self, event_type: EventType, source_id: Uuid, payload: &T) {
        match EventMessage::new(event_type, Some(source_id), payload) {
            Ok(event) => {
                self.bus.publish(event);
            }
            Err(e) => warn!("Failed to serialize patrol event: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connect_test_pool;
    use crate::security::Role;

    async fn ledger() -> Result<PatrolLedger> {
        let pool = connect_test_pool().await?;
        let bus = Arc::new(NotificationBus::new(16));
        Ok(PatrolLedger::new(pool, bus))
    }

    fn admin() -> Actor {
        Actor::new(Uuid::new_v4(), Role::Admin)
    }

    fn new_schedule(shift: Shift) -> NewSchedule {
        NewSchedule {
            schedule_date: NaiveDate::from_ymd_opt(2026, 3, 10).unwrap(),
            shift,
            assigned_blocks: vec!["A1".to_string(), "A2".to_string()],
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_schedule_creation_is_admin_only() -> Result<()> {
        let ledger = ledger().await?;

        let guard = Actor::new(Uuid::new_v4(), Role::Security);
        let err = ledger
            .create_schedule(&guard, new_schedule(Shift::Pagi))
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::Authorization(_))
        ));

        let schedule = ledger
            .create_schedule(&admin(), new_schedule(Shift::Pagi))
            .await?;
        assert_eq!(schedule.assigned_blocks.0, vec!["A1", "A2"]);

        Ok(())
    }

    #[tokio::test]
    async fn test_one_open_checkin_per_guard() -> Result<()> {
        let ledger = ledger().await?;
        let s1 = ledger
            .create_schedule(&admin(), new_schedule(Shift::Pagi))
            .await?;
        let s2 = ledger
            .create_schedule(&admin(), new_schedule(Shift::Siang))
            .await?;
        let guard_id = Uuid::new_v4();

        let first = ledger
            .checkin(CheckinRequest {
                schedule_id: s1.id,
                guard_id,
                location: None,
            })
            .await?;
        assert!(first.is_open());

        // Same guard, different schedule: still blocked
        let err = ledger
            .checkin(CheckinRequest {
                schedule_id: s2.id,
                guard_id,
                location: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::AlreadyCheckedIn(_))
        ));

        ledger.checkout(&first.id).await?;

        // Closed bracket frees the guard for the next patrol
        let second = ledger
            .checkin(CheckinRequest {
                schedule_id: s2.id,
                guard_id,
                location: None,
            })
            .await?;
        assert_eq!(second.schedule_id, s2.id);

        Ok(())
    }

    #[tokio::test]
    async fn test_racing_checkins_produce_one_winner() -> Result<()> {
        let ledger = ledger().await?;
        let schedule = ledger
            .create_schedule(&admin(), new_schedule(Shift::Malam1))
            .await?;
        let guard_id = Uuid::new_v4();

        let request = || CheckinRequest {
            schedule_id: schedule.id,
            guard_id,
            location: None,
        };

        let (a, b) = tokio::join!(ledger.checkin(request()), ledger.checkin(request()));

        let successes = [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count();
        assert_eq!(successes, 1);

        let loser = if a.is_err() { a } else { b };
        assert!(matches!(
            loser.unwrap_err().downcast_ref::<Error>(),
            Some(Error::AlreadyCheckedIn(_))
        ));

        Ok(())
    }

    #[tokio::test]
    async fn test_checkout_is_permanent() -> Result<()> {
        let ledger = ledger().await?;
        let schedule = ledger
            .create_schedule(&admin(), new_schedule(Shift::Sore))
            .await?;
        let guard_id = Uuid::new_v4();

        let checkin = ledger
            .checkin(CheckinRequest {
                schedule_id: schedule.id,
                guard_id,
                location: None,
            })
            .await?;

        let closed = ledger.checkout(&checkin.id).await?;
        assert!(closed.checkout_time.is_some());

        // Idempotently rejected, no double-closing side effects
        let err = ledger.checkout(&checkin.id).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::AlreadyClosed(_))
        ));

        let err = ledger.checkout(&Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::NotFound(_))
        ));

        Ok(())
    }

    #[tokio::test]
    async fn test_active_checkin_read_path() -> Result<()> {
        let ledger = ledger().await?;
        let schedule = ledger
            .create_schedule(&admin(), new_schedule(Shift::Pagi))
            .await?;
        let guard_id = Uuid::new_v4();

        assert!(ledger.get_active_checkin(&guard_id).await?.is_none());

        let checkin = ledger
            .checkin(CheckinRequest {
                schedule_id: schedule.id,
                guard_id,
                location: Some(GeoPoint {
                    latitude: -6.2,
                    longitude: 106.8,
                }),
            })
            .await?;

        let active = ledger.get_active_checkin(&guard_id).await?.expect("open");
        assert_eq!(active.id, checkin.id);

        ledger.checkout(&checkin.id).await?;
        assert!(ledger.get_active_checkin(&guard_id).await?.is_none());

        Ok(())
    }

    #[tokio::test]
    async fn test_checkin_requires_known_schedule() -> Result<()> {
        let ledger = ledger().await?;

        let err = ledger
            .checkin(CheckinRequest {
                schedule_id: Uuid::new_v4(),
                guard_id: Uuid::new_v4(),
                location: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::NotFound(_))
        ));

        Ok(())
    }
}
