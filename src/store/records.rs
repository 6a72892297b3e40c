//! Record storage
//!
//! The authoritative copy of every record. Writes carry the revision the
//! writer last saw; a mismatch means someone else committed in between.

use crate::error::{conflict_error, not_found_error, ModerationError, ModerationResult};
use crate::record::Record;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::{debug, info};

/// Persistence boundary for records
pub trait RecordStore: Send + Sync {
    fn get(&self, id: &str) -> ModerationResult<Record>;

    /// Commit `record`, returning the new revision.
    ///
    /// Fails with `Conflict` when `record.revision` is not the stored one.
    fn update(&self, record: &Record) -> ModerationResult<String>;

    fn remove(&self, id: &str) -> ModerationResult<Record>;
}

/// Revision token `"<generation>-<sha256 prefix>"` for a record's content
pub fn compute_revision(generation: u64, record: &Record) -> ModerationResult<String> {
    let content = serde_json::to_vec(&record.fields)
        .map_err(|e| ModerationError::Store(format!("Failed to hash record {}: {}", record.id, e)))?;

    let mut hasher = Sha256::new();
    hasher.update(record.id.as_bytes());
    hasher.update(&content);
    let digest = format!("{:x}", hasher.finalize());

    Ok(format!("{}-{}", generation, &digest[..12]))
}

struct StoredRecord {
    generation: u64,
    record: Record,
}

/// Thread-safe in-memory record store
#[derive(Default)]
pub struct InMemoryRecordStore {
    records: RwLock<HashMap<String, StoredRecord>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a record, returning it with its first revision
    pub fn insert(&self, mut record: Record) -> ModerationResult<Record> {
        let mut records = self.records.write()?;
        if records.contains_key(&record.id) {
            return Err(conflict_error(format!("Record {} already exists", record.id)));
        }

        record.revision = Some(compute_revision(1, &record)?);
        records.insert(
            record.id.clone(),
            StoredRecord {
                generation: 1,
                record: record.clone(),
            },
        );

        info!(record_id = %record.id, document_type = %record.document_type, "Created record");
        Ok(record)
    }

    pub fn len(&self) -> ModerationResult<usize> {
        Ok(self.records.read()?.len())
    }

    pub fn is_empty(&self) -> ModerationResult<bool> {
        Ok(self.len()? == 0)
    }
}

impl RecordStore for InMemoryRecordStore {
    fn get(&self, id: &str) -> ModerationResult<Record> {
        let records = self.records.read()?;
        records
            .get(id)
            .map(|stored| stored.record.clone())
            .ok_or_else(|| not_found_error(format!("Record {} not found", id)))
    }

    fn update(&self, record: &Record) -> ModerationResult<String> {
        let mut records = self.records.write()?;
        let stored = records
            .get_mut(&record.id)
            .ok_or_else(|| not_found_error(format!("Record {} not found", record.id)))?;

        if stored.record.revision != record.revision {
            return Err(conflict_error(format!(
                "Record {} changed since revision {}",
                record.id,
                record.revision.as_deref().unwrap_or("<none>")
            )));
        }

        let generation = stored.generation + 1;
        let revision = compute_revision(generation, record)?;
        let mut committed = record.clone();
        committed.revision = Some(revision.clone());
        stored.generation = generation;
        stored.record = committed;

        debug!(record_id = %record.id, %revision, "Committed record");
        Ok(revision)
    }

    fn remove(&self, id: &str) -> ModerationResult<Record> {
        let mut records = self.records.write()?;
        records
            .remove(id)
            .map(|stored| stored.record)
            .ok_or_else(|| not_found_error(format!("Record {} not found", id)))
    }
}
