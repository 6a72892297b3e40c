//! Collaborator boundaries
//!
//! Record persistence, the change log and notifications, each as a trait
//! with an in-memory implementation.

mod changelog;
mod notify;
mod records;

pub use changelog::{ChangeLogEntry, ChangeLogWriter, InMemoryChangeLog, Operation};
pub use notify::{ChannelNotifier, ModerationEvent, NoopNotifier, Notifier};
pub use records::{compute_revision, InMemoryRecordStore, RecordStore};
