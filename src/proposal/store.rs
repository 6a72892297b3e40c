//! Proposal storage
//!
//! The moderation queue itself. The engine only needs lookup by document,
//! upsert and removal; the in-memory store below backs tests and embedding.

use crate::error::{not_found_error, ModerationResult};
use crate::proposal::ChangeProposal;
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

/// Persistence boundary for change proposals
pub trait ProposalStore: Send + Sync {
    /// All stored proposals for a document, oldest first
    fn find_for_document(&self, document_id: &str) -> ModerationResult<Vec<ChangeProposal>>;

    fn get(&self, id: Uuid) -> ModerationResult<ChangeProposal>;

    /// Insert or replace by id
    fn save(&self, proposal: &ChangeProposal) -> ModerationResult<()>;

    fn remove(&self, id: Uuid) -> ModerationResult<ChangeProposal>;

    fn list(&self) -> ModerationResult<Vec<ChangeProposal>>;

    /// Active (PENDING or IN_PROGRESS) proposals for a document, oldest first
    fn find_active_for(&self, document_id: &str) -> ModerationResult<Vec<ChangeProposal>> {
        Ok(self
            .find_for_document(document_id)?
            .into_iter()
            .filter(ChangeProposal::is_active)
            .collect())
    }
}

/// Thread-safe in-memory proposal store
#[derive(Default)]
pub struct InMemoryProposalStore {
    proposals: RwLock<HashMap<Uuid, ChangeProposal>>,
}

impl InMemoryProposalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get proposal count
    pub fn count(&self) -> ModerationResult<usize> {
        Ok(self.proposals.read()?.len())
    }
}

impl ProposalStore for InMemoryProposalStore {
    fn find_for_document(&self, document_id: &str) -> ModerationResult<Vec<ChangeProposal>> {
        let proposals = self.proposals.read()?;
        let mut found: Vec<ChangeProposal> = proposals
            .values()
            .filter(|p| p.target_document_id == document_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(found)
    }

    fn get(&self, id: Uuid) -> ModerationResult<ChangeProposal> {
        let proposals = self.proposals.read()?;
        proposals
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found_error(format!("Proposal {} not found", id)))
    }

    fn save(&self, proposal: &ChangeProposal) -> ModerationResult<()> {
        let mut proposals = self.proposals.write()?;
        proposals.insert(proposal.id, proposal.clone());
        Ok(())
    }

    fn remove(&self, id: Uuid) -> ModerationResult<ChangeProposal> {
        let mut proposals = self.proposals.write()?;
        proposals
            .remove(&id)
            .ok_or_else(|| not_found_error(format!("Proposal {} not found", id)))
    }

    fn list(&self) -> ModerationResult<Vec<ChangeProposal>> {
        let proposals = self.proposals.read()?;
        let mut all: Vec<ChangeProposal> = proposals.values().cloned().collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(all)
    }
}
