//! Change log
//!
//! Before/after snapshots of every committed change, direct or merged from
//! moderation. Writing is fire-and-forget: a failed write is logged, the
//! committed change stands.

use crate::changes::{DiffEngine, FieldChange};
use crate::record::{DocumentType, Record};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::RwLock;
use tracing::{debug, error};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operation {
    Create,
    Update,
    Delete,
    MergedFromModeration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeLogEntry {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub document_id: String,
    pub document_type: DocumentType,
    pub user_email: String,
    pub operation: Operation,
    pub before: Option<serde_json::Value>,
    pub after: Option<serde_json::Value>,
    /// Field-level details when both snapshots exist
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub changes: Vec<FieldChange>,
    /// Set when the change was merged from a moderation request
    pub proposal_id: Option<Uuid>,
}

impl ChangeLogEntry {
    /// Snapshot `before`/`after`; at least one of them names the document
    pub fn new(operation: Operation, actor: &str, before: Option<&Record>, after: Option<&Record>) -> Self {
        let subject = after.or(before);
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            document_id: subject.map(|r| r.id.clone()).unwrap_or_default(),
            document_type: subject.map_or(DocumentType::Component, |r| r.document_type),
            user_email: actor.to_string(),
            operation,
            before: before.and_then(snapshot),
            after: after.and_then(snapshot),
            changes: match (before, after) {
                (Some(before), Some(after)) => DiffEngine::changed_fields(before, after),
                _ => Vec::new(),
            },
            proposal_id: None,
        }
    }

    pub fn with_proposal(mut self, proposal_id: Uuid) -> Self {
        self.proposal_id = Some(proposal_id);
        self
    }
}

fn snapshot(record: &Record) -> Option<serde_json::Value> {
    match serde_json::to_value(record) {
        Ok(value) => Some(value),
        Err(e) => {
            error!(record_id = %record.id, "Failed to snapshot record for change log: {}", e);
            None
        }
    }
}

/// Sink for change-log entries
pub trait ChangeLogWriter: Send + Sync {
    fn record(&self, entry: ChangeLogEntry);
}

/// In-memory change log
#[derive(Default)]
pub struct InMemoryChangeLog {
    entries: RwLock<Vec<ChangeLogEntry>>,
}

impl InMemoryChangeLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<ChangeLogEntry> {
        match self.entries.read() {
            Ok(entries) => entries.clone(),
            Err(_) => Vec::new(),
        }
    }

    /// Entries for one document, oldest first
    pub fn entries_for(&self, document_id: &str) -> Vec<ChangeLogEntry> {
        self.entries()
            .into_iter()
            .filter(|e| e.document_id == document_id)
            .collect()
    }
}

impl ChangeLogWriter for InMemoryChangeLog {
    fn record(&self, entry: ChangeLogEntry) {
        match self.entries.write() {
            Ok(mut entries) => {
                debug!(
                    document_id = %entry.document_id,
                    operation = ?entry.operation,
                    changed = entry.changes.len(),
                    "Change log entry recorded"
                );
                entries.push(entry);
            }
            Err(_) => error!(document_id = %entry.document_id, "Change log lock poisoned, entry dropped"),
        }
    }
}
