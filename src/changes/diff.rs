//! Field Diff Engine
//!
//! Compares two versions of a record field by field. Used as a gate so that
//! edits which change nothing never become moderation requests.

use crate::record::{FieldSpec, FieldValue, Record};
use serde::{Deserialize, Serialize};

/// Type of field change detected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    /// Field was absent and is now set
    Added,
    /// Field was set and is now absent
    Removed,
    /// Field is set on both sides with different values
    Modified,
}

/// A single differing field
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldChange {
    pub field: String,
    pub change_type: ChangeType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub before: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after: Option<serde_json::Value>,
}

/// The diff engine that compares record snapshots
pub struct DiffEngine;

impl DiffEngine {
    /// True as soon as one declared field differs
    pub fn is_changed(base: &Record, candidate: &Record) -> bool {
        if base.document_type != candidate.document_type {
            return true;
        }

        base.schema()
            .fields
            .iter()
            .any(|spec| Self::compare(spec, base.get(spec.name), candidate.get(spec.name)).is_some())
    }

    /// Every differing declared field, in declaration order
    pub fn changed_fields(base: &Record, candidate: &Record) -> Vec<FieldChange> {
        base.schema()
            .fields
            .iter()
            .filter_map(|spec| {
                let before = base.get(spec.name);
                let after = candidate.get(spec.name);
                Self::compare(spec, before, after).map(|change_type| FieldChange {
                    field: spec.name.to_string(),
                    change_type,
                    before: before.and_then(|v| serde_json::to_value(v).ok()),
                    after: after.and_then(|v| serde_json::to_value(v).ok()),
                })
            })
            .collect()
    }

    fn compare(
        spec: &FieldSpec,
        before: Option<&FieldValue>,
        after: Option<&FieldValue>,
    ) -> Option<ChangeType> {
        match (before, after) {
            (None, None) => None,
            (None, Some(_)) => Some(ChangeType::Added),
            (Some(_), None) => Some(ChangeType::Removed),
            (Some(a), Some(b)) if spec.kind.equals(a, b) => None,
            (Some(_), Some(_)) => Some(ChangeType::Modified),
        }
    }
}
