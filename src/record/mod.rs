//! Record module
//!
//! The business documents under moderation: components, releases, projects
//! and SPDX documents, stored as typed field maps checked against a per-type
//! field descriptor list.

mod schema;
mod value;

pub use schema::{DocumentSchema, DocumentType, FieldKind, FieldSpec};
pub use value::{is_contiguous, reindex, FieldMap, FieldValue, OrderedItem};

use crate::error::ModerationResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub const FIELD_MODERATORS: &str = "moderators";
pub const FIELD_CREATED_BY: &str = "createdBy";
pub const FIELD_NAME: &str = "name";

/// A snapshot of one business document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub id: String,
    pub document_type: DocumentType,
    /// Revision token issued by the record store
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
    #[serde(default)]
    pub fields: FieldMap,
}

impl Record {
    pub fn new(id: impl Into<String>, document_type: DocumentType) -> Self {
        Self {
            id: id.into(),
            document_type,
            revision: None,
            fields: FieldMap::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: FieldValue) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    pub fn schema(&self) -> &'static DocumentSchema {
        self.document_type.schema()
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: FieldValue) {
        self.fields.insert(name.into(), value);
    }

    pub fn remove(&mut self, name: &str) -> Option<FieldValue> {
        self.fields.remove(name)
    }

    pub fn ordered(&self, name: &str) -> &[OrderedItem] {
        self.get(name).and_then(FieldValue::as_ordered).unwrap_or(&[])
    }

    pub fn moderators(&self) -> BTreeSet<String> {
        self.get(FIELD_MODERATORS)
            .and_then(FieldValue::as_set)
            .cloned()
            .unwrap_or_default()
    }

    pub fn created_by(&self) -> Option<&str> {
        self.get(FIELD_CREATED_BY).and_then(FieldValue::as_text)
    }

    /// Human-readable name used in proposals and search
    pub fn display_name(&self) -> String {
        let name = self.get(FIELD_NAME).and_then(FieldValue::as_text).unwrap_or("");
        let version = self.get("version").and_then(FieldValue::as_text).unwrap_or("");
        match (name.is_empty(), version.is_empty()) {
            (true, _) => self.id.clone(),
            (false, true) => name.to_string(),
            (false, false) => format!("{} ({})", name, version),
        }
    }

    /// Check all present fields against the declared field list
    pub fn validate(&self) -> ModerationResult<()> {
        self.schema().validate(&self.fields, "record")
    }

    /// Copy with every ordered sub-collection re-indexed to 0..n-1
    pub fn normalized(&self) -> Record {
        let mut record = self.clone();
        for spec in self.schema().ordered_fields() {
            if let Some(FieldValue::Ordered(items)) = record.fields.remove(spec.name) {
                record
                    .fields
                    .insert(spec.name.to_string(), FieldValue::Ordered(reindex(items)));
            }
        }
        record
    }

    /// Names of non-empty delete-blocker fields
    pub fn delete_blockers(&self) -> Vec<&'static str> {
        self.schema()
            .delete_blockers
            .iter()
            .copied()
            .filter(|name| self.get(name).map_or(false, |v| !v.is_empty()))
            .collect()
    }
}
