//! Merge Engine
//!
//! Applies a proposal's additions and deletions to a base record and computes
//! those deltas from a base/candidate pair in the first place.

use crate::error::{malformed_error, ModerationResult};
use crate::record::{reindex, FieldKind, FieldMap, FieldValue, OrderedItem, Record};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

/// Additions and deletions of one proposal, as partial records
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalDelta {
    pub additions: FieldMap,
    pub deletions: FieldMap,
}

impl ProposalDelta {
    pub fn is_empty(&self) -> bool {
        self.additions.is_empty() && self.deletions.is_empty()
    }
}

/// Stateless merge engine
pub struct MergeEngine;

impl MergeEngine {
    /// Effective record after applying `deletions` then `additions` to `base`.
    ///
    /// Sets: `(base - deletions) ∪ additions`. Ordered sub-collections use the
    /// same rule on item content, then get re-indexed `0..n-1`. A collection
    /// emptied by deletions with no addition entry is dropped. Scalars: a
    /// deletion clears the field only when it matches the current value, a
    /// present non-empty addition overwrites. `base` is never touched.
    pub fn apply(base: &Record, additions: &FieldMap, deletions: &FieldMap) -> ModerationResult<Record> {
        let schema = base.schema();
        schema.validate(additions, "additions")?;
        schema.validate(deletions, "deletions")?;

        let mut result = base.clone();
        for spec in schema.fields {
            let current = result.fields.remove(spec.name);
            let added = additions.get(spec.name);
            let deleted = deletions.get(spec.name);

            let merged = match spec.kind {
                FieldKind::Set => merge_set(current, added, deleted),
                FieldKind::Ordered => merge_ordered(current, added, deleted),
                FieldKind::Text | FieldKind::Flag | FieldKind::Number => {
                    merge_scalar(current, added, deleted)
                }
            };

            if let Some(value) = merged {
                result.fields.insert(spec.name.to_string(), value);
            }
        }

        debug!(
            record_id = %base.id,
            added = additions.len(),
            deleted = deletions.len(),
            "Applied proposal delta"
        );
        Ok(result)
    }

    /// Absolute deltas turning `base` into `candidate` under [`MergeEngine::apply`]
    pub fn delta(base: &Record, candidate: &Record) -> ModerationResult<ProposalDelta> {
        if base.document_type != candidate.document_type {
            return Err(malformed_error(format!(
                "cannot diff a {} against a {}",
                base.document_type, candidate.document_type
            )));
        }
        candidate.validate()?;

        let mut delta = ProposalDelta::default();
        for spec in base.schema().fields {
            let before = base.get(spec.name);
            let after = candidate.get(spec.name);

            match spec.kind {
                FieldKind::Set => {
                    let empty = BTreeSet::new();
                    let b = before.and_then(FieldValue::as_set).unwrap_or(&empty);
                    let c = after.and_then(FieldValue::as_set).unwrap_or(&empty);
                    let added: BTreeSet<String> = c.difference(b).cloned().collect();
                    let removed: BTreeSet<String> = b.difference(c).cloned().collect();
                    if keeps_addition(before, after, added.is_empty(), removed.is_empty(), c.is_empty()) {
                        delta.additions.insert(spec.name.to_string(), FieldValue::Set(added));
                    }
                    if !removed.is_empty() || (before.is_some() && after.is_none()) {
                        delta.deletions.insert(spec.name.to_string(), FieldValue::Set(removed));
                    }
                }
                FieldKind::Ordered => {
                    let b = before.and_then(FieldValue::as_ordered).unwrap_or(&[]);
                    let c = after.and_then(FieldValue::as_ordered).unwrap_or(&[]);
                    let added: Vec<OrderedItem> =
                        c.iter().filter(|item| !b.contains(item)).cloned().collect();
                    let removed: Vec<OrderedItem> =
                        b.iter().filter(|item| !c.contains(item)).cloned().collect();
                    if keeps_addition(before, after, added.is_empty(), removed.is_empty(), c.is_empty()) {
                        delta.additions.insert(spec.name.to_string(), FieldValue::Ordered(added));
                    }
                    if !removed.is_empty() || (before.is_some() && after.is_none()) {
                        delta.deletions.insert(spec.name.to_string(), FieldValue::Ordered(removed));
                    }
                }
                FieldKind::Text | FieldKind::Flag | FieldKind::Number => {
                    if before == after {
                        continue;
                    }
                    if let Some(old) = before {
                        delta.deletions.insert(spec.name.to_string(), old.clone());
                    }
                    if let Some(new) = after {
                        delta.additions.insert(spec.name.to_string(), new.clone());
                    }
                }
            }
        }
        Ok(delta)
    }
}

/// Whether a collection's delta needs an addition entry.
///
/// A collection left present but empty still gets an (empty) addition, so
/// that `apply` keeps the field instead of clearing it.
fn keeps_addition(
    before: Option<&FieldValue>,
    after: Option<&FieldValue>,
    nothing_added: bool,
    nothing_removed: bool,
    ends_empty: bool,
) -> bool {
    if after.is_none() {
        return false;
    }
    !nothing_added || before.is_none() || (ends_empty && !nothing_removed)
}

fn merge_set(
    current: Option<FieldValue>,
    added: Option<&FieldValue>,
    deleted: Option<&FieldValue>,
) -> Option<FieldValue> {
    if added.is_none() && deleted.is_none() {
        return current;
    }
    if current.is_none() && added.is_none() {
        return None;
    }

    let mut values = match current {
        Some(FieldValue::Set(values)) => values,
        _ => BTreeSet::new(),
    };
    if let Some(FieldValue::Set(removed)) = deleted {
        values.retain(|v| !removed.contains(v));
    }
    if let Some(FieldValue::Set(new)) = added {
        values.extend(new.iter().cloned());
    }
    // deleting everything with nothing added clears the field
    if values.is_empty() && added.is_none() && deleted.is_some() {
        return None;
    }
    Some(FieldValue::Set(values))
}

fn merge_ordered(
    current: Option<FieldValue>,
    added: Option<&FieldValue>,
    deleted: Option<&FieldValue>,
) -> Option<FieldValue> {
    if current.is_none() && added.is_none() {
        return None;
    }

    let mut items = match current {
        Some(FieldValue::Ordered(items)) => items,
        _ => Vec::new(),
    };
    if let Some(FieldValue::Ordered(removed)) = deleted {
        items.retain(|item| !removed.iter().any(|r| r.same_content(item)));
    }
    if let Some(FieldValue::Ordered(new)) = added {
        for item in new {
            if !items.iter().any(|existing| existing.same_content(item)) {
                items.push(item.clone());
            }
        }
    }
    if items.is_empty() && added.is_none() && deleted.is_some() {
        return None;
    }
    Some(FieldValue::Ordered(reindex(items)))
}

fn merge_scalar(
    current: Option<FieldValue>,
    added: Option<&FieldValue>,
    deleted: Option<&FieldValue>,
) -> Option<FieldValue> {
    let mut value = current;
    if let Some(old) = deleted {
        // mismatched deletions keep the base value
        if value.as_ref() == Some(old) {
            value = None;
        }
    }
    if let Some(new) = added {
        if !new.is_empty() {
            value = Some(new.clone());
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::changes::DiffEngine;
    use crate::record::{is_contiguous, DocumentType};
    use pretty_assertions::assert_eq;
    use tokio_test::{assert_err, assert_ok};

    fn snippet(index: u32, name: &str) -> OrderedItem {
        OrderedItem::new(index, [("name", name)])
    }

    fn spdx(snippets: Vec<OrderedItem>) -> Record {
        Record::new("spdx-1", DocumentType::SpdxDocument)
            .with_field("releaseId", FieldValue::text("rel-1"))
            .with_field("createdBy", FieldValue::text("owner@corp.com"))
            .with_field("moderators", FieldValue::set(["mod@corp.com", "lead@corp.com"]))
            .with_field("spdxPackageInfoIds", FieldValue::set(["pkg-1"]))
            .with_field("snippets", FieldValue::ordered(snippets))
    }

    fn three_snippets() -> Record {
        spdx(vec![snippet(0, "a"), snippet(1, "b"), snippet(2, "c")])
    }

    fn fields(entries: Vec<(&str, FieldValue)>) -> FieldMap {
        entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }

    #[test]
    fn test_empty_proposal_is_identity() {
        let record = three_snippets();
        let result = assert_ok!(MergeEngine::apply(&record, &FieldMap::new(), &FieldMap::new()));
        assert_eq!(result, record);
    }

    #[test]
    fn test_deleting_middle_snippet_reindexes() {
        let record = three_snippets();
        let deletions = fields(vec![("snippets", FieldValue::ordered(vec![snippet(1, "b")]))]);

        let result = assert_ok!(MergeEngine::apply(&record, &FieldMap::new(), &deletions));
        let snippets = result.ordered("snippets");

        assert_eq!(snippets.len(), 2);
        assert_eq!(snippets[0], snippet(0, "a"));
        assert_eq!(snippets[1], snippet(1, "c"));
        // base untouched
        assert_eq!(record.ordered("snippets").len(), 3);
    }

    #[test]
    fn test_set_difference_then_union() {
        let record = three_snippets();
        let additions = fields(vec![("moderators", FieldValue::set(["new@corp.com", "mod@corp.com"]))]);
        let deletions = fields(vec![("moderators", FieldValue::set(["lead@corp.com"]))]);

        let result = assert_ok!(MergeEngine::apply(&record, &additions, &deletions));
        let expected: BTreeSet<String> =
            ["mod@corp.com", "new@corp.com"].iter().map(|s| s.to_string()).collect();
        assert_eq!(result.moderators(), expected);
    }

    #[test]
    fn test_scalar_deletion_requires_exact_match() {
        let record = three_snippets();

        let mismatched = fields(vec![("releaseId", FieldValue::text("rel-other"))]);
        let kept = assert_ok!(MergeEngine::apply(&record, &FieldMap::new(), &mismatched));
        assert_eq!(kept.get("releaseId"), Some(&FieldValue::text("rel-1")));

        let matched = fields(vec![("releaseId", FieldValue::text("rel-1"))]);
        let cleared = assert_ok!(MergeEngine::apply(&record, &FieldMap::new(), &matched));
        assert_eq!(cleared.get("releaseId"), None);
    }

    #[test]
    fn test_empty_scalar_addition_keeps_base() {
        let record = three_snippets();
        let additions = fields(vec![("releaseId", FieldValue::text(""))]);
        let result = assert_ok!(MergeEngine::apply(&record, &additions, &FieldMap::new()));
        assert_eq!(result.get("releaseId"), Some(&FieldValue::text("rel-1")));
    }

    #[test]
    fn test_unknown_field_is_malformed() {
        let record = three_snippets();
        let additions = fields(vec![("vendor", FieldValue::text("acme"))]);
        let err = assert_err!(MergeEngine::apply(&record, &additions, &FieldMap::new()));
        assert!(matches!(err, crate::error::ModerationError::MalformedProposal(_)));
    }

    #[test]
    fn test_apply_is_idempotent() {
        let record = three_snippets();
        let additions = fields(vec![
            ("snippets", FieldValue::ordered(vec![snippet(3, "d")])),
            ("spdxPackageInfoIds", FieldValue::set(["pkg-2"])),
            ("releaseId", FieldValue::text("rel-2")),
        ]);
        let deletions = fields(vec![
            ("snippets", FieldValue::ordered(vec![snippet(0, "a")])),
            ("releaseId", FieldValue::text("rel-1")),
        ]);

        let once = assert_ok!(MergeEngine::apply(&record, &additions, &deletions));
        let twice = assert_ok!(MergeEngine::apply(&once, &additions, &deletions));
        assert_eq!(twice, once);
        assert!(is_contiguous(once.ordered("snippets")));
    }

    #[test]
    fn test_additions_slot_in_by_prior_index() {
        let record = spdx(vec![snippet(0, "a"), snippet(1, "c")]);
        let additions = fields(vec![("snippets", FieldValue::ordered(vec![snippet(1, "b")]))]);

        let result = assert_ok!(MergeEngine::apply(&record, &additions, &FieldMap::new()));
        let names: Vec<_> = result
            .ordered("snippets")
            .iter()
            .map(|s| s.content["name"].clone())
            .collect();
        // tie on index 1: surviving base item first, then the addition
        assert_eq!(names, vec!["a", "c", "b"]);
    }

    #[test]
    fn test_delta_round_trips_to_candidate() {
        let base = three_snippets();
        let mut candidate = spdx(vec![snippet(0, "a"), snippet(1, "c"), snippet(2, "e")]);
        candidate.set("moderators", FieldValue::set(["mod@corp.com"]));
        candidate.remove("releaseId");

        let delta = assert_ok!(MergeEngine::delta(&base, &candidate));
        assert!(!delta.is_empty());

        let merged = assert_ok!(MergeEngine::apply(&base, &delta.additions, &delta.deletions));
        assert_eq!(merged, candidate);
    }

    #[test]
    fn test_delta_of_identical_records_is_empty() {
        let base = three_snippets();
        let delta = assert_ok!(MergeEngine::delta(&base, &base));
        assert!(delta.is_empty());
    }

    #[test]
    fn test_emptied_collections_clear_the_field() {
        let base = spdx(Vec::new()).with_field("spdxFileInfoIds", FieldValue::set(Vec::<String>::new()));
        let mut candidate = base.clone();
        candidate.remove("snippets");
        candidate.remove("spdxFileInfoIds");

        let delta = assert_ok!(MergeEngine::delta(&base, &candidate));
        assert!(!delta.is_empty());
        assert_eq!(delta.deletions.get("snippets"), Some(&FieldValue::ordered(Vec::new())));
        assert_eq!(delta.deletions.get("spdxFileInfoIds"), Some(&FieldValue::set(Vec::<String>::new())));

        let merged = assert_ok!(MergeEngine::apply(&base, &delta.additions, &delta.deletions));
        assert_eq!(merged.get("snippets"), None);
        assert_eq!(merged.get("spdxFileInfoIds"), None);
        assert!(!DiffEngine::is_changed(&merged, &candidate));
    }

    #[test]
    fn test_emptying_a_collection_keeps_it_present() {
        let base = three_snippets();
        let candidate = base
            .clone()
            .with_field("snippets", FieldValue::ordered(Vec::new()))
            .with_field("spdxPackageInfoIds", FieldValue::set(Vec::<String>::new()));

        let delta = assert_ok!(MergeEngine::delta(&base, &candidate));
        let merged = assert_ok!(MergeEngine::apply(&base, &delta.additions, &delta.deletions));

        assert_eq!(merged.get("snippets"), Some(&FieldValue::ordered(Vec::new())));
        assert_eq!(merged.get("spdxPackageInfoIds"), Some(&FieldValue::set(Vec::<String>::new())));
        assert_eq!(merged, candidate);
    }

    /// (label, base, candidate) pairs covering empty, absent, reordered and
    /// gapped collections as well as scalar-only records
    fn merge_cases() -> Vec<(&'static str, Record, Record)> {
        let no_sets = Vec::<String>::new();
        let component = Record::new("c-1", DocumentType::Component)
            .with_field("name", FieldValue::text("zlib"))
            .with_field("homepage", FieldValue::text("https://zlib.net"));
        let project = Record::new("p-1", DocumentType::Project)
            .with_field("name", FieldValue::text("portal"))
            .with_field("enableSvm", FieldValue::Flag(false))
            .with_field("attachmentCount", FieldValue::Number(3));
        let release = Record::new("rel-1", DocumentType::Release)
            .with_field("name", FieldValue::text("zlib"))
            .with_field("contributors", FieldValue::set(no_sets.clone()));

        vec![
            (
                "scalars only",
                component.clone(),
                component
                    .clone()
                    .with_field("name", FieldValue::text("zlib-ng"))
                    .with_field("description", FieldValue::text("compression")),
            ),
            (
                "scalar cleared",
                component.clone(),
                {
                    let mut c = component.clone();
                    c.remove("homepage");
                    c
                },
            ),
            (
                "flag and number",
                project.clone(),
                project
                    .clone()
                    .with_field("enableSvm", FieldValue::Flag(true))
                    .with_field("attachmentCount", FieldValue::Number(4)),
            ),
            (
                "empty set filled",
                release.clone(),
                release.clone().with_field("contributors", FieldValue::set(["dev@corp.com"])),
            ),
            (
                "empty set dropped",
                release.clone(),
                {
                    let mut c = release.clone();
                    c.remove("contributors");
                    c
                },
            ),
            (
                "absent set created empty",
                component.clone(),
                component.clone().with_field("categories", FieldValue::set(no_sets.clone())),
            ),
            (
                "set emptied",
                release.clone().with_field("languages", FieldValue::set(["C", "Rust"])),
                release.clone().with_field("languages", FieldValue::set(no_sets.clone())),
            ),
            (
                "absent ordered created",
                spdx(Vec::new()).with_field("annotations", FieldValue::ordered(Vec::new())),
                spdx(Vec::new())
                    .with_field("annotations", FieldValue::ordered(Vec::new()))
                    .with_field("relationships", FieldValue::ordered(vec![snippet(0, "dep")])),
            ),
            (
                "empty ordered dropped",
                spdx(Vec::new()),
                {
                    let mut c = spdx(Vec::new());
                    c.remove("snippets");
                    c
                },
            ),
            (
                "snippets swapped",
                three_snippets(),
                spdx(vec![snippet(0, "a"), snippet(1, "c"), snippet(2, "b")]),
            ),
            (
                "storage order only",
                spdx(vec![snippet(2, "c"), snippet(0, "a"), snippet(1, "b")]),
                three_snippets(),
            ),
            (
                "gapped base trimmed",
                spdx(vec![snippet(0, "a"), snippet(2, "b"), snippet(5, "c")]),
                spdx(vec![snippet(0, "a"), snippet(3, "b")]),
            ),
            (
                "everything removed",
                three_snippets(),
                Record::new("spdx-1", DocumentType::SpdxDocument),
            ),
        ]
    }

    #[test]
    fn test_merge_properties_hold_across_records() {
        for (label, base, candidate) in merge_cases() {
            let candidate = candidate.normalized();

            let identity = assert_ok!(MergeEngine::apply(&base, &FieldMap::new(), &FieldMap::new()));
            assert_eq!(identity, base.normalized(), "identity: {}", label);

            let delta = assert_ok!(MergeEngine::delta(&base, &candidate));
            assert_eq!(
                delta.is_empty(),
                !DiffEngine::is_changed(&base, &candidate),
                "delta presence: {}",
                label
            );

            let once = assert_ok!(MergeEngine::apply(&base, &delta.additions, &delta.deletions));
            assert!(!DiffEngine::is_changed(&once, &candidate), "round trip: {}", label);

            let twice = assert_ok!(MergeEngine::apply(&once, &delta.additions, &delta.deletions));
            assert_eq!(twice, once, "idempotence: {}", label);

            for spec in once.schema().ordered_fields() {
                assert!(is_contiguous(once.ordered(spec.name)), "contiguity of {}: {}", spec.name, label);
            }
        }
    }

    #[test]
    fn test_delta_rejects_mixed_document_types() {
        let base = three_snippets();
        let other = Record::new("spdx-1", DocumentType::Release);
        assert_err!(MergeEngine::delta(&base, &other));
    }
}
