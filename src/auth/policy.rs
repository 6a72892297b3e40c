//! Permission evaluation
//!
//! The gate only asks questions; it never mutates anything. The answer to
//! "may this actor WRITE this record" decides between a direct commit and a
//! moderation request.

use crate::auth::Actor;
use crate::record::Record;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Actions a permission evaluator is asked about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestedAction {
    Read,
    Write,
    Delete,
    Moderate,
}

/// Externally supplied policy
pub trait PermissionEvaluator: Send + Sync {
    fn is_action_allowed(&self, actor: &Actor, record: &Record, action: RequestedAction) -> bool;
}

/// Default role/ownership based policy
#[derive(Debug, Clone, Copy, Default)]
pub struct RolePolicy;

impl RolePolicy {
    fn is_owner_or_moderator(actor: &Actor, record: &Record) -> bool {
        record.created_by() == Some(actor.email.as_str()) || record.moderators().contains(&actor.email)
    }
}

impl PermissionEvaluator for RolePolicy {
    fn is_action_allowed(&self, actor: &Actor, record: &Record, action: RequestedAction) -> bool {
        match action {
            RequestedAction::Read => actor.role.can_read() || Self::is_owner_or_moderator(actor, record),
            RequestedAction::Write | RequestedAction::Delete => {
                actor.role.can_moderate() || Self::is_owner_or_moderator(actor, record)
            }
            RequestedAction::Moderate => {
                actor.role.can_moderate() || record.moderators().contains(&actor.email)
            }
        }
    }
}

/// Routing decision point for the write path
#[derive(Clone)]
pub struct PermissionGate {
    evaluator: Arc<dyn PermissionEvaluator>,
}

impl PermissionGate {
    pub fn new(evaluator: Arc<dyn PermissionEvaluator>) -> Self {
        Self { evaluator }
    }

    pub fn can_write_directly(&self, actor: &Actor, record: &Record) -> bool {
        let allowed = self.evaluator.is_action_allowed(actor, record, RequestedAction::Write);
        debug!(actor = %actor.email, record_id = %record.id, allowed, "Write permission checked");
        allowed
    }

    pub fn can_delete_directly(&self, actor: &Actor, record: &Record) -> bool {
        self.evaluator.is_action_allowed(actor, record, RequestedAction::Delete)
    }

    pub fn can_read(&self, actor: &Actor, record: &Record) -> bool {
        self.evaluator.is_action_allowed(actor, record, RequestedAction::Read)
    }

    pub fn can_moderate(&self, actor: &Actor, record: &Record) -> bool {
        self.evaluator.is_action_allowed(actor, record, RequestedAction::Moderate)
    }
}

impl Default for PermissionGate {
    fn default() -> Self {
        Self::new(Arc::new(RolePolicy))
    }
}
