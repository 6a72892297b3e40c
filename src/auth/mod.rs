//! Authorization module
//!
//! Acting identities, their roles and the permission gate that routes an
//! edit either straight to the record store or into moderation.

mod policy;

pub use policy::{PermissionEvaluator, PermissionGate, RequestedAction, RolePolicy};

use serde::{Deserialize, Serialize};
use validator::Validate;

/// User roles for authorization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// No visibility beyond own proposals
    Guest,
    /// Can read everything, writes only where owner or moderator
    User,
    /// Can write and moderate any record
    ClearingAdmin,
    /// Full access
    Admin,
}

impl Role {
    pub fn can_read(&self) -> bool {
        !matches!(self, Role::Guest)
    }

    pub fn can_moderate(&self) -> bool {
        matches!(self, Role::ClearingAdmin | Role::Admin)
    }
}

impl Default for Role {
    fn default() -> Self {
        Role::User
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Guest => write!(f, "guest"),
            Role::User => write!(f, "user"),
            Role::ClearingAdmin => write!(f, "clearing_admin"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

/// The identity performing an operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    #[validate(email(message = "Actor email must be a valid address"))]
    pub email: String,
    #[validate(length(min = 1, max = 128, message = "Department is required"))]
    pub department: String,
    #[serde(default)]
    pub role: Role,
}

impl Actor {
    pub fn new(email: impl Into<String>, department: impl Into<String>, role: Role) -> Self {
        Self {
            email: email.into(),
            department: department.into(),
            role,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_capabilities() {
        assert!(!Role::Guest.can_read());
        assert!(Role::User.can_read());
        assert!(!Role::User.can_moderate());
        assert!(Role::ClearingAdmin.can_moderate());
        assert_eq!(Role::default(), Role::User);
    }

    #[test]
    fn test_actor_validation() {
        let valid = Actor::new("dev@corp.com", "ENG", Role::User);
        assert!(valid.validate().is_ok());

        let bad_email = Actor::new("not-an-email", "ENG", Role::User);
        assert!(bad_email.validate().is_err());

        let no_department = Actor::new("dev@corp.com", "", Role::User);
        assert!(no_department.validate().is_err());
    }
}
