//! Moderation service
//!
//! Routes every edit either straight into the record store or into the
//! moderation queue, and carries queued proposals through review.

use super::EditView;
use crate::auth::{Actor, PermissionGate};
use crate::changes::{DiffEngine, MergeEngine, ProposalDelta};
use crate::clearing::{ClearingStateComputer, ClearingStateSummary, Release, SignalTieBreak};
use crate::error::{forbidden_error, malformed_error, ModerationError, ModerationResult, RequestStatus};
use crate::proposal::{ChangeProposal, Decision, DocumentState, ModerationState, ProposalFilter, ProposalStore};
use crate::record::Record;
use crate::store::{ChangeLogEntry, ChangeLogWriter, ModerationEvent, Notifier, Operation, RecordStore};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;
use validator::Validate;

/// Moderation workflow over pluggable collaborators
pub struct ModerationService {
    records: Arc<dyn RecordStore>,
    proposals: Arc<dyn ProposalStore>,
    changelog: Arc<dyn ChangeLogWriter>,
    notifier: Arc<dyn Notifier>,
    gate: PermissionGate,
    clearing: ClearingStateComputer,
}

impl ModerationService {
    pub fn new(
        records: Arc<dyn RecordStore>,
        proposals: Arc<dyn ProposalStore>,
        changelog: Arc<dyn ChangeLogWriter>,
        notifier: Arc<dyn Notifier>,
        gate: PermissionGate,
    ) -> Self {
        Self {
            records,
            proposals,
            changelog,
            notifier,
            gate,
            clearing: ClearingStateComputer::default(),
        }
    }

    pub fn with_tie_break(mut self, tie_break: SignalTieBreak) -> Self {
        self.clearing = ClearingStateComputer::new(tie_break);
        self
    }

    // =========================================================================
    // WRITE PATH
    // =========================================================================

    /// Submit `candidate` as the actor's edit of `base`.
    ///
    /// Writers commit directly against `base`'s revision. Everyone else gets a
    /// moderation request, unless the edit changes nothing.
    pub fn submit_edit(&self, actor: &Actor, base: &Record, candidate: &Record) -> RequestStatus {
        into_status(self.try_submit_edit(actor, base, candidate))
    }

    fn try_submit_edit(&self, actor: &Actor, base: &Record, candidate: &Record) -> ModerationResult<RequestStatus> {
        actor.validate()?;
        if base.id != candidate.id || base.document_type != candidate.document_type {
            return Err(malformed_error(format!(
                "Edit of {} {} does not target the same document as its base",
                candidate.document_type, candidate.id
            )));
        }
        candidate.validate()?;
        let candidate = candidate.normalized();
        let current = self.records.get(&base.id)?;

        if self.gate.can_write_directly(actor, &current) {
            let mut committed = candidate;
            committed.revision = base.revision.clone();
            let revision = self.records.update(&committed)?;
            committed.revision = Some(revision);

            self.changelog
                .record(ChangeLogEntry::new(Operation::Update, &actor.email, Some(&current), Some(&committed)));
            self.notifier.notify(ModerationEvent::RecordUpdated {
                document_id: committed.id.clone(),
                actor: actor.email.clone(),
            });
            info!(document_id = %committed.id, actor = %actor.email, "Committed direct edit");
            return Ok(RequestStatus::Success);
        }

        if !DiffEngine::is_changed(base, &candidate) {
            debug!(document_id = %base.id, actor = %actor.email, "Edit changes nothing, not queued");
            return Ok(RequestStatus::Success);
        }

        let delta = MergeEngine::delta(base, &candidate)?;
        if delta.is_empty() {
            debug!(document_id = %base.id, actor = %actor.email, "Edit has nothing to merge, not queued");
            return Ok(RequestStatus::Success);
        }
        self.queue(actor, &current, |proposal| match proposal {
            Some(mut existing) => {
                existing.replace_delta(delta, &actor.department);
                existing
            }
            None => ChangeProposal::for_edit(&current, actor, current.moderators(), delta),
        })
    }

    /// Delete a record, or ask for its deletion when the actor may not delete
    pub fn submit_delete(&self, actor: &Actor, document_id: &str) -> RequestStatus {
        into_status(self.try_submit_delete(actor, document_id))
    }

    fn try_submit_delete(&self, actor: &Actor, document_id: &str) -> ModerationResult<RequestStatus> {
        actor.validate()?;
        let current = self.records.get(document_id)?;

        // blockers are checked when the deletion actually runs
        if self.gate.can_delete_directly(actor, &current) {
            self.delete_record(&current, &actor.email, None)?;
            return Ok(RequestStatus::Success);
        }

        self.queue(actor, &current, |proposal| match proposal {
            Some(mut existing) => {
                existing.replace_delta(ProposalDelta::default(), &actor.department);
                existing.request_delete = true;
                existing
            }
            None => ChangeProposal::for_delete(&current, actor, current.moderators()),
        })
    }

    /// Upsert the actor's authoritative proposal on `current`, retiring older ones
    fn queue<F>(&self, actor: &Actor, current: &Record, build: F) -> ModerationResult<RequestStatus>
    where
        F: FnOnce(Option<ChangeProposal>) -> ChangeProposal,
    {
        let mut own: Vec<ChangeProposal> = self
            .proposals
            .find_active_for(&current.id)?
            .into_iter()
            .filter(|p| p.requesting_user == actor.email)
            .collect();

        let latest = own.pop();
        let resubmitted = latest.is_some();
        let mut proposal = build(latest);
        proposal.moderators = current.moderators();
        proposal.document_name = current.display_name();

        for superseded in own {
            self.proposals.remove(superseded.id)?;
            info!(proposal_id = %superseded.id, document_id = %current.id, "Retired superseded proposal");
        }
        self.proposals.save(&proposal)?;
        self.notifier.notify(ModerationEvent::submitted(&proposal));

        info!(
            proposal_id = %proposal.id,
            document_id = %current.id,
            requester = %actor.email,
            resubmitted,
            delete = proposal.request_delete,
            "Sent to moderation"
        );
        Ok(RequestStatus::SentToModeration)
    }

    fn delete_record(&self, current: &Record, actor: &str, proposal_id: Option<Uuid>) -> ModerationResult<()> {
        ensure_deletable(current)?;
        let removed = self.records.remove(&current.id)?;

        let mut entry = ChangeLogEntry::new(Operation::Delete, actor, Some(&removed), None);
        if let Some(id) = proposal_id {
            entry = entry.with_proposal(id);
        }
        self.changelog.record(entry);

        // proposals against a deleted record can never be applied
        for orphan in self.proposals.find_for_document(&current.id)? {
            self.proposals.remove(orphan.id)?;
        }

        self.notifier.notify(ModerationEvent::RecordDeleted {
            document_id: current.id.clone(),
            actor: actor.to_string(),
        });
        info!(document_id = %current.id, actor, "Deleted record");
        Ok(())
    }

    // =========================================================================
    // REVIEW
    // =========================================================================

    /// Take a PENDING proposal into review
    pub fn start_review(&self, proposal_id: Uuid, reviewer: &Actor) -> RequestStatus {
        into_status(self.try_start_review(proposal_id, reviewer))
    }

    fn try_start_review(&self, proposal_id: Uuid, reviewer: &Actor) -> ModerationResult<RequestStatus> {
        reviewer.validate()?;
        let mut proposal = self.proposals.get(proposal_id)?;
        self.ensure_moderator(&proposal, reviewer)?;

        proposal.start_review(&reviewer.email)?;
        self.proposals.save(&proposal)?;

        info!(proposal_id = %proposal.id, reviewer = %reviewer.email, "Proposal in review");
        Ok(RequestStatus::Success)
    }

    /// Approve or reject an active proposal
    ///
    /// Approval merges against the record as it is now, not as the requester
    /// saw it. Either way the proposal is retired afterwards.
    pub fn resolve_proposal(
        &self,
        proposal_id: Uuid,
        decision: Decision,
        reviewer: &Actor,
        comment: Option<&str>,
    ) -> RequestStatus {
        into_status(self.try_resolve(proposal_id, decision, reviewer, comment))
    }

    fn try_resolve(
        &self,
        proposal_id: Uuid,
        decision: Decision,
        reviewer: &Actor,
        comment: Option<&str>,
    ) -> ModerationResult<RequestStatus> {
        reviewer.validate()?;
        let mut proposal = self.proposals.get(proposal_id)?;
        self.ensure_moderator(&proposal, reviewer)?;
        if !proposal.state.can_decide() {
            return Err(ModerationError::InvalidTransition(format!(
                "Proposal {} is already {}",
                proposal.id, proposal.state
            )));
        }

        match decision {
            Decision::Approve => {
                let current = self.records.get(&proposal.target_document_id)?;
                if proposal.request_delete {
                    proposal.decide(decision, &reviewer.email, comment.map(str::to_string))?;
                    self.delete_record(&current, &reviewer.email, Some(proposal.id))?;
                    self.notifier.notify(ModerationEvent::decided(&proposal));
                    info!(proposal_id = %proposal.id, reviewer = %reviewer.email, "Approved deletion");
                    return Ok(RequestStatus::Success);
                }

                let mut merged = MergeEngine::apply(&current, &proposal.additions, &proposal.deletions)?;
                let revision = self.records.update(&merged)?;
                merged.revision = Some(revision);

                self.changelog.record(
                    ChangeLogEntry::new(
                        Operation::MergedFromModeration,
                        &reviewer.email,
                        Some(&current),
                        Some(&merged),
                    )
                    .with_proposal(proposal.id),
                );
                self.notifier.notify(ModerationEvent::RecordUpdated {
                    document_id: merged.id.clone(),
                    actor: reviewer.email.clone(),
                });
            }
            Decision::Reject => {}
        }

        proposal.decide(decision, &reviewer.email, comment.map(str::to_string))?;
        self.proposals.remove(proposal.id)?;
        self.notifier.notify(ModerationEvent::decided(&proposal));

        info!(
            proposal_id = %proposal.id,
            document_id = %proposal.target_document_id,
            reviewer = %reviewer.email,
            state = %proposal.state,
            "Proposal resolved"
        );
        Ok(RequestStatus::Success)
    }

    /// Requester takes back their own active proposal
    pub fn withdraw(&self, proposal_id: Uuid, actor: &Actor) -> RequestStatus {
        into_status(self.try_withdraw(proposal_id, actor))
    }

    fn try_withdraw(&self, proposal_id: Uuid, actor: &Actor) -> ModerationResult<RequestStatus> {
        actor.validate()?;
        let proposal = self.proposals.get(proposal_id)?;
        if proposal.requesting_user != actor.email {
            return Err(forbidden_error(format!(
                "{} did not request proposal {}",
                actor.email, proposal.id
            )));
        }
        if !proposal.is_active() {
            return Err(ModerationError::InvalidTransition(format!(
                "Proposal {} is already {}",
                proposal.id, proposal.state
            )));
        }

        self.proposals.remove(proposal.id)?;
        info!(proposal_id = %proposal.id, requester = %actor.email, "Proposal withdrawn");
        Ok(RequestStatus::Success)
    }

    fn ensure_moderator(&self, proposal: &ChangeProposal, reviewer: &Actor) -> ModerationResult<()> {
        if proposal.is_moderator(&reviewer.email) {
            return Ok(());
        }
        let allowed = match self.records.get(&proposal.target_document_id) {
            Ok(record) => self.gate.can_moderate(reviewer, &record),
            Err(ModerationError::NotFound(_)) => false,
            Err(e) => return Err(e),
        };
        if allowed {
            Ok(())
        } else {
            Err(forbidden_error(format!(
                "{} may not moderate proposal {}",
                reviewer.email, proposal.id
            )))
        }
    }

    // =========================================================================
    // READ PATH
    // =========================================================================

    /// What the actor should see when opening a document for editing
    ///
    /// A requester with an active proposal sees it merged over the current
    /// record; everybody else sees the stored record.
    pub fn preview_for_requester(&self, document_id: &str, actor: &Actor) -> ModerationResult<EditView> {
        actor.validate()?;
        let current = self.records.get(document_id)?;
        let proposals = self.proposals.find_for_document(document_id)?;

        let own = proposals
            .iter()
            .filter(|p| p.is_active() && p.requesting_user == actor.email)
            .last();
        if let Some(proposal) = own {
            let record = if proposal.request_delete {
                current
            } else {
                MergeEngine::apply(&current, &proposal.additions, &proposal.deletions)?
            };
            return Ok(EditView {
                record,
                document_state: DocumentState::moderated(proposal),
            });
        }

        let is_moderator =
            current.moderators().contains(&actor.email) || proposals.iter().any(|p| p.is_moderator(&actor.email));
        if !is_moderator && !self.gate.can_read(actor, &current) {
            return Err(forbidden_error(format!("{} may not read {}", actor.email, document_id)));
        }

        let moderation_state = proposals.first().map(|p| p.state);
        Ok(EditView {
            record: current,
            document_state: DocumentState::original(moderation_state),
        })
    }

    /// Proposals the actor can see, filtered
    ///
    /// Moderating roles see the whole queue; others see what they requested
    /// or are moderators of.
    pub fn search_proposals(&self, actor: &Actor, filter: &ProposalFilter) -> ModerationResult<Vec<ChangeProposal>> {
        actor.validate()?;
        let visible: Vec<ChangeProposal> = self
            .proposals
            .list()?
            .into_iter()
            .filter(|p| {
                actor.role.can_moderate() || p.requesting_user == actor.email || p.is_moderator(&actor.email)
            })
            .collect();
        filter.apply(visible)
    }

    /// Active proposals waiting on this moderator, newest first
    pub fn proposals_for_moderator(&self, actor: &Actor) -> ModerationResult<Vec<ChangeProposal>> {
        actor.validate()?;
        let mut waiting: Vec<ChangeProposal> = self
            .proposals
            .list()?
            .into_iter()
            .filter(|p| p.is_active() && p.is_moderator(&actor.email))
            .collect();
        waiting.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(waiting)
    }

    /// Moderation state of the most recent active proposal on a document
    pub fn moderation_state_of(&self, document_id: &str) -> ModerationResult<Option<ModerationState>> {
        Ok(self.proposals.find_active_for(document_id)?.last().map(|p| p.state))
    }

    // =========================================================================
    // CLEARING
    // =========================================================================

    pub fn summarize_clearing(&self, releases: &[Release], team: &str) -> ClearingStateSummary {
        self.clearing.summarize(releases, team)
    }
}

fn ensure_deletable(record: &Record) -> ModerationResult<()> {
    let blockers = record.delete_blockers();
    if blockers.is_empty() {
        return Ok(());
    }
    Err(ModerationError::InUse(format!(
        "{} {} is still referenced through {}",
        record.document_type,
        record.id,
        blockers.join(", ")
    )))
}

fn into_status(result: ModerationResult<RequestStatus>) -> RequestStatus {
    result.unwrap_or_else(ModerationError::into_status)
}
