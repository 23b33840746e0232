use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Portal role, supplied pre-authenticated by the identity layer
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Security,
    Warga,
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Admin => write!(f, "admin"),
            Self::Security => write!(f, "security"),
            Self::Warga => write!(f, "warga"),
        }
    }
}

/// A pre-authenticated caller. The core trusts the identity layer for the
/// id/role pair and only applies capability checks on top of it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Actor {
    pub id: Uuid,
    pub role: Role,
}

impl Actor {
    pub fn new(id: Uuid, role: Role) -> Self {
        Self { id, role }
    }
}

/// Whether the role may respond to, resolve or dismiss alerts and review
/// incident reports
pub fn can_coordinate_response(role: Role) -> bool {
    matches!(role, Role::Admin | Role::Security)
}

/// Whether the role may manage patrol schedules
pub fn can_manage_schedules(role: Role) -> bool {
    matches!(role, Role::Admin)
}

/// Capability check for alert response actions
pub fn require_responder(actor: &Actor) -> Result<(), Error> {
    if can_coordinate_response(actor.role) {
        Ok(())
    } else {
        Err(Error::Authorization(format!(
            "Role '{}' may not coordinate alert response",
            actor.role
        )))
    }
}

/// Capability check for schedule administration
pub fn require_schedule_admin(actor: &Actor) -> Result<(), Error> {
    if can_manage_schedules(actor.role) {
        Ok(())
    } else {
        Err(Error::Authorization(format!(
            "Role '{}' may not manage patrol schedules",
            actor.role
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_capability_requires_admin_or_security() {
        assert!(can_coordinate_response(Role::Admin));
        assert!(can_coordinate_response(Role::Security));
        assert!(!can_coordinate_response(Role::Warga));
    }

    #[test]
    fn schedule_capability_is_admin_only() {
        assert!(can_manage_schedules(Role::Admin));
        assert!(!can_manage_schedules(Role::Security));

        let guard = Actor::new(Uuid::new_v4(), Role::Security);
        assert!(matches!(
            require_schedule_admin(&guard),
            Err(Error::Authorization(_))
        ));
    }
}
