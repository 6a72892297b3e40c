//! Field descriptors per document type
//!
//! Every record type carries a hand-written list of its declared fields. The
//! comparator, the merge engine and proposal validation walk this list; there
//! is no runtime introspection.

use serde::{Deserialize, Serialize};

use super::value::{FieldMap, FieldValue};
use crate::error::{malformed_error, ModerationResult};

/// Kinds of documents subject to moderation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentType {
    Component,
    Release,
    Project,
    SpdxDocument,
}

impl DocumentType {
    pub fn schema(&self) -> &'static DocumentSchema {
        match self {
            DocumentType::Component => &COMPONENT_SCHEMA,
            DocumentType::Release => &RELEASE_SCHEMA,
            DocumentType::Project => &PROJECT_SCHEMA,
            DocumentType::SpdxDocument => &SPDX_DOCUMENT_SCHEMA,
        }
    }
}

impl std::fmt::Display for DocumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentType::Component => write!(f, "component"),
            DocumentType::Release => write!(f, "release"),
            DocumentType::Project => write!(f, "project"),
            DocumentType::SpdxDocument => write!(f, "spdx document"),
        }
    }
}

/// Shape of a declared field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Flag,
    Number,
    Set,
    Ordered,
}

impl FieldKind {
    /// Per-kind equality. Values of the wrong kind never compare equal.
    pub fn equals(&self, a: &FieldValue, b: &FieldValue) -> bool {
        a.kind() == *self && b.kind() == *self && a == b
    }
}

/// A declared field: name plus kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
}

const fn field(name: &'static str, kind: FieldKind) -> FieldSpec {
    FieldSpec { name, kind }
}

/// The declared field list of one document type
#[derive(Debug)]
pub struct DocumentSchema {
    pub document_type: DocumentType,
    pub fields: &'static [FieldSpec],
    /// Set fields that block deletion while non-empty
    pub delete_blockers: &'static [&'static str],
}

impl DocumentSchema {
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn ordered_fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter(|f| f.kind == FieldKind::Ordered)
    }

    /// Check every entry of `map` against the declared fields
    pub fn validate(&self, map: &FieldMap, what: &str) -> ModerationResult<()> {
        for (name, value) in map {
            let spec = self.field(name).ok_or_else(|| {
                malformed_error(format!(
                    "{} references unknown {} field '{}'",
                    what, self.document_type, name
                ))
            })?;
            if spec.kind != value.kind() {
                return Err(malformed_error(format!(
                    "{} field '{}' expects {:?}, got {:?}",
                    what,
                    name,
                    spec.kind,
                    value.kind()
                )));
            }
        }
        Ok(())
    }
}

use FieldKind::{Flag, Ordered, Set, Text};

pub static COMPONENT_SCHEMA: DocumentSchema = DocumentSchema {
    document_type: DocumentType::Component,
    fields: &[
        field("name", Text),
        field("description", Text),
        field("componentType", Text),
        field("homepage", Text),
        field("createdBy", Text),
        field("moderators", Set),
        field("categories", Set),
        field("languages", Set),
        field("operatingSystems", Set),
        field("vendorNames", Set),
        field("mainLicenseIds", Set),
        field("releaseIds", Set),
    ],
    delete_blockers: &["releaseIds"],
};

pub static RELEASE_SCHEMA: DocumentSchema = DocumentSchema {
    document_type: DocumentType::Release,
    fields: &[
        field("name", Text),
        field("version", Text),
        field("componentId", Text),
        field("createdBy", Text),
        field("moderators", Set),
        field("contributors", Set),
        field("mainLicenseIds", Set),
        field("languages", Set),
        field("clearingState", Text),
        field("mainlineState", Text),
        field("releaseDate", Text),
        field("spdxId", Text),
    ],
    delete_blockers: &[],
};

pub static PROJECT_SCHEMA: DocumentSchema = DocumentSchema {
    document_type: DocumentType::Project,
    fields: &[
        field("name", Text),
        field("version", Text),
        field("description", Text),
        field("projectType", Text),
        field("businessUnit", Text),
        field("state", Text),
        field("createdBy", Text),
        field("moderators", Set),
        field("contributors", Set),
        field("releaseIds", Set),
        field("enableSvm", Flag),
        field("attachmentCount", FieldKind::Number),
    ],
    delete_blockers: &[],
};

pub static SPDX_DOCUMENT_SCHEMA: DocumentSchema = DocumentSchema {
    document_type: DocumentType::SpdxDocument,
    fields: &[
        field("releaseId", Text),
        field("createdBy", Text),
        field("moderators", Set),
        field("spdxDocumentCreationInfoId", Text),
        field("spdxPackageInfoIds", Set),
        field("spdxFileInfoIds", Set),
        field("snippets", Ordered),
        field("relationships", Ordered),
        field("annotations", Ordered),
        field("otherLicensingInformationDetecteds", Ordered),
    ],
    delete_blockers: &["spdxFileInfoIds"],
};
