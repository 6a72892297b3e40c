//! Moderation workflow
//!
//! The public face of the engine: submit, review, preview and summarize.

mod service;

pub use service::ModerationService;

use crate::proposal::DocumentState;
use crate::record::Record;
use serde::Serialize;

/// A record as presented for editing, with its moderation context
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditView {
    pub record: Record,
    pub document_state: DocumentState,
}
