//! Clearing Moderation - Moderation workflow engine for compliance records
//!
//! Components, releases, projects and SPDX documents are edited by many
//! people, not all of whom may write directly. This crate decides whether an
//! edit is committed or queued, reconciles queued proposals against the
//! authoritative record, and summarizes external clearing status per team.
//!
//! - Record model: typed field maps with hand-written per-type field lists
//! - Changes: field diff engine and additions/deletions merge engine
//! - Auth: actors, roles and the permission gate
//! - Proposals: the moderation queue and its search
//! - Moderation: the workflow service tying it all together
//! - Clearing: per-team clearing-state summaries

pub mod auth;
pub mod changes;
pub mod clearing;
pub mod config;
pub mod error;
pub mod moderation;
pub mod proposal;
pub mod record;
pub mod state;
pub mod store;
pub mod telemetry;

pub use error::{ModerationError, ModerationResult, RequestStatus};
pub use moderation::{EditView, ModerationService};
