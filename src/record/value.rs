//! Field values
//!
//! A record is a map of named field values. Absent keys are null fields.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::schema::FieldKind;

/// Field name -> value. Also used for the additions/deletions partial records.
pub type FieldMap = BTreeMap<String, FieldValue>;

/// One entry of an ordered sub-collection (snippet, annotation, relationship, ...)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderedItem {
    pub index: u32,
    #[serde(default)]
    pub content: BTreeMap<String, String>,
}

impl OrderedItem {
    pub fn new<I, K, V>(index: u32, content: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            index,
            content: content
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Identity used by the merge engine: the index is positional, not part of the element
    pub fn same_content(&self, other: &OrderedItem) -> bool {
        self.content == other.content
    }
}

/// A single field value
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum FieldValue {
    Text(String),
    Flag(bool),
    Number(i64),
    Set(BTreeSet<String>),
    Ordered(Vec<OrderedItem>),
}

impl FieldValue {
    pub fn text(value: impl Into<String>) -> Self {
        FieldValue::Text(value.into())
    }

    pub fn set<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FieldValue::Set(values.into_iter().map(Into::into).collect())
    }

    pub fn ordered(items: Vec<OrderedItem>) -> Self {
        FieldValue::Ordered(items)
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            FieldValue::Text(_) => FieldKind::Text,
            FieldValue::Flag(_) => FieldKind::Flag,
            FieldValue::Number(_) => FieldKind::Number,
            FieldValue::Set(_) => FieldKind::Set,
            FieldValue::Ordered(_) => FieldKind::Ordered,
        }
    }

    /// Empty text and empty collections count as empty; flags and numbers never do
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Text(s) => s.is_empty(),
            FieldValue::Set(s) => s.is_empty(),
            FieldValue::Ordered(items) => items.is_empty(),
            FieldValue::Flag(_) | FieldValue::Number(_) => false,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_set(&self) -> Option<&BTreeSet<String>> {
        match self {
            FieldValue::Set(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_ordered(&self) -> Option<&[OrderedItem]> {
        match self {
            FieldValue::Ordered(items) => Some(items),
            _ => None,
        }
    }
}

// Ordered collections compare as (index, content) multisets so storage order
// of the vector does not matter.
impl PartialEq for FieldValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (FieldValue::Text(a), FieldValue::Text(b)) => a == b,
            (FieldValue::Flag(a), FieldValue::Flag(b)) => a == b,
            (FieldValue::Number(a), FieldValue::Number(b)) => a == b,
            (FieldValue::Set(a), FieldValue::Set(b)) => a == b,
            (FieldValue::Ordered(a), FieldValue::Ordered(b)) => {
                a.len() == b.len() && canonical(a) == canonical(b)
            }
            _ => false,
        }
    }
}

impl Eq for FieldValue {}

fn canonical(items: &[OrderedItem]) -> Vec<&OrderedItem> {
    let mut sorted: Vec<&OrderedItem> = items.iter().collect();
    sorted.sort();
    sorted
}

/// Re-derive indices: stable sort by prior index, then assign 0..n-1
pub fn reindex(mut items: Vec<OrderedItem>) -> Vec<OrderedItem> {
    items.sort_by_key(|item| item.index);
    for (position, item) in items.iter_mut().enumerate() {
        item.index = position as u32;
    }
    items
}

/// True when indices already form an unbroken 0..n-1 run
pub fn is_contiguous(items: &[OrderedItem]) -> bool {
    let mut indices: Vec<u32> = items.iter().map(|i| i.index).collect();
    indices.sort_unstable();
    indices.iter().enumerate().all(|(pos, idx)| *idx == pos as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snippet(index: u32, name: &str) -> OrderedItem {
        OrderedItem::new(index, [("name", name)])
    }

    #[test]
    fn test_reindex_keeps_relative_order() {
        let items = vec![snippet(4, "c"), snippet(0, "a"), snippet(2, "b")];
        let result = reindex(items);

        let names: Vec<_> = result.iter().map(|i| i.content["name"].as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert!(is_contiguous(&result));
    }

    #[test]
    fn test_reindex_ties_follow_encounter_order() {
        let items = vec![snippet(1, "first"), snippet(0, "zero"), snippet(1, "second")];
        let result = reindex(items);

        assert_eq!(result[1].content["name"], "first");
        assert_eq!(result[2].content["name"], "second");
        assert_eq!(result[2].index, 2);
    }

    #[test]
    fn test_ordered_equality_ignores_vector_order() {
        let a = FieldValue::ordered(vec![snippet(0, "a"), snippet(1, "b")]);
        let b = FieldValue::ordered(vec![snippet(1, "b"), snippet(0, "a")]);
        let c = FieldValue::ordered(vec![snippet(0, "b"), snippet(1, "a")]);

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_emptiness() {
        assert!(FieldValue::text("").is_empty());
        assert!(FieldValue::set(Vec::<String>::new()).is_empty());
        assert!(!FieldValue::Flag(false).is_empty());
        assert!(!FieldValue::Number(0).is_empty());
    }
}
