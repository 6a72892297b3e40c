//! Change detection and merging
//!
//! - Field diff engine: does a candidate actually change anything?
//! - Merge engine: additions/deletions in, effective record out

pub mod diff;
pub mod merge;

pub use diff::{ChangeType, DiffEngine, FieldChange};
pub use merge::{MergeEngine, ProposalDelta};
