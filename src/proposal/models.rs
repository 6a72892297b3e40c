//! Proposal data models
//!
//! A change proposal (moderation request) is an edit by someone without
//! WRITE permission, queued until a moderator decides on it.

use crate::auth::Actor;
use crate::changes::ProposalDelta;
use crate::error::{ModerationError, ModerationResult};
use crate::record::{DocumentType, FieldMap, Record};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Proposal state in the moderation workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModerationState {
    /// Waiting for a moderator
    Pending,
    /// A moderator is curating it
    InProgress,
    /// Merged into the record
    Approved,
    /// Discarded
    Rejected,
}

impl ModerationState {
    pub fn is_active(&self) -> bool {
        matches!(self, ModerationState::Pending | ModerationState::InProgress)
    }

    pub fn can_start_review(&self) -> bool {
        matches!(self, ModerationState::Pending)
    }

    pub fn can_decide(&self) -> bool {
        self.is_active()
    }
}

impl Default for ModerationState {
    fn default() -> Self {
        ModerationState::Pending
    }
}

impl std::fmt::Display for ModerationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModerationState::Pending => write!(f, "PENDING"),
            ModerationState::InProgress => write!(f, "IN_PROGRESS"),
            ModerationState::Approved => write!(f, "APPROVED"),
            ModerationState::Rejected => write!(f, "REJECTED"),
        }
    }
}

/// Reviewer decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    Approve,
    Reject,
}

/// A queued edit (like a pull request against one record)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeProposal {
    pub id: Uuid,
    pub target_document_id: String,
    pub document_type: DocumentType,
    pub document_name: String,
    pub requesting_user: String,
    pub requesting_user_department: String,
    /// Users empowered to decide on this proposal
    pub moderators: BTreeSet<String>,
    pub state: ModerationState,
    pub additions: FieldMap,
    pub deletions: FieldMap,
    /// The requester asks for the whole record to be deleted
    #[serde(default)]
    pub request_delete: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment_on_moderation: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ChangeProposal {
    fn new(record: &Record, actor: &Actor, moderators: BTreeSet<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            target_document_id: record.id.clone(),
            document_type: record.document_type,
            document_name: record.display_name(),
            requesting_user: actor.email.clone(),
            requesting_user_department: actor.department.clone(),
            moderators,
            state: ModerationState::Pending,
            additions: FieldMap::new(),
            deletions: FieldMap::new(),
            request_delete: false,
            reviewer: None,
            comment_on_moderation: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Create a pending edit proposal
    pub fn for_edit(record: &Record, actor: &Actor, moderators: BTreeSet<String>, delta: ProposalDelta) -> Self {
        let mut proposal = Self::new(record, actor, moderators);
        proposal.additions = delta.additions;
        proposal.deletions = delta.deletions;
        proposal
    }

    /// Create a pending deletion proposal
    pub fn for_delete(record: &Record, actor: &Actor, moderators: BTreeSet<String>) -> Self {
        let mut proposal = Self::new(record, actor, moderators);
        proposal.request_delete = true;
        proposal
    }

    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }

    pub fn is_moderator(&self, email: &str) -> bool {
        self.moderators.contains(email)
    }

    /// Resubmission: the new delta replaces the old one wholesale
    pub fn replace_delta(&mut self, delta: ProposalDelta, department: &str) {
        self.additions = delta.additions;
        self.deletions = delta.deletions;
        self.request_delete = false;
        self.requesting_user_department = department.to_string();
        self.state = ModerationState::Pending;
        self.reviewer = None;
        self.updated_at = Utc::now();
    }

    /// PENDING -> IN_PROGRESS
    pub fn start_review(&mut self, reviewer: &str) -> ModerationResult<()> {
        if !self.state.can_start_review() {
            return Err(ModerationError::InvalidTransition(format!(
                "Cannot start review of proposal {} in state {}",
                self.id, self.state
            )));
        }
        self.state = ModerationState::InProgress;
        self.reviewer = Some(reviewer.to_string());
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Record the reviewer's decision (terminal)
    pub fn decide(&mut self, decision: Decision, reviewer: &str, comment: Option<String>) -> ModerationResult<()> {
        if !self.state.can_decide() {
            return Err(ModerationError::InvalidTransition(format!(
                "Cannot decide on proposal {} in state {}",
                self.id, self.state
            )));
        }
        self.state = match decision {
            Decision::Approve => ModerationState::Approved,
            Decision::Reject => ModerationState::Rejected,
        };
        self.reviewer = Some(reviewer.to_string());
        self.comment_on_moderation = comment;
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// Whether a returned record is the stored original or a moderated preview
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentState {
    pub is_original_document: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub moderation_state: Option<ModerationState>,
}

impl DocumentState {
    pub fn original(moderation_state: Option<ModerationState>) -> Self {
        Self {
            is_original_document: true,
            moderation_state,
        }
    }

    pub fn moderated(proposal: &ChangeProposal) -> Self {
        Self {
            is_original_document: false,
            moderation_state: Some(proposal.state),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::record::FieldValue;

    fn proposal() -> ChangeProposal {
        let record = Record::new("rel-1", DocumentType::Release)
            .with_field("name", FieldValue::text("zlib"))
            .with_field("version", FieldValue::text("1.3"));
        let actor = Actor::new("dev@corp.com", "ENG", Role::User);
        ChangeProposal::for_edit(&record, &actor, BTreeSet::from(["mod@corp.com".to_string()]), ProposalDelta::default())
    }

    #[test]
    fn test_new_proposal_is_pending() {
        let p = proposal();
        assert_eq!(p.state, ModerationState::Pending);
        assert_eq!(p.document_name, "zlib (1.3)");
        assert!(p.is_active());
        assert!(p.is_moderator("mod@corp.com"));
    }

    #[test]
    fn test_review_lifecycle() {
        let mut p = proposal();
        p.start_review("mod@corp.com").unwrap();
        assert_eq!(p.state, ModerationState::InProgress);

        // cannot start twice
        assert!(p.start_review("mod@corp.com").is_err());

        p.decide(Decision::Reject, "mod@corp.com", Some("duplicate".into())).unwrap();
        assert_eq!(p.state, ModerationState::Rejected);
        assert!(!p.is_active());
        assert!(p.decide(Decision::Approve, "mod@corp.com", None).is_err());
    }

    #[test]
    fn test_resubmission_resets_to_pending() {
        let mut p = proposal();
        p.start_review("mod@corp.com").unwrap();

        let mut delta = ProposalDelta::default();
        delta.additions.insert("version".into(), FieldValue::text("1.3.1"));
        p.replace_delta(delta, "ENG-2");

        assert_eq!(p.state, ModerationState::Pending);
        assert!(p.reviewer.is_none());
        assert_eq!(p.requesting_user_department, "ENG-2");
        assert_eq!(p.additions.len(), 1);
    }
}
