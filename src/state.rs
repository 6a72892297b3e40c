//! Application state management
//!
//! Wires the moderation service to the in-memory collaborators.

use crate::auth::PermissionGate;
use crate::config::Settings;
use crate::moderation::ModerationService;
use crate::proposal::InMemoryProposalStore;
use crate::store::{ChannelNotifier, InMemoryChangeLog, InMemoryRecordStore, ModerationEvent, NoopNotifier, Notifier};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::info;

/// Application state shared across callers
pub struct AppState {
    pub moderation: ModerationService,

    /// Record store (has internal locking)
    pub records: Arc<InMemoryRecordStore>,

    /// Moderation queue (has internal locking)
    pub proposals: Arc<InMemoryProposalStore>,

    pub changelog: Arc<InMemoryChangeLog>,
}

impl AppState {
    /// Build state from settings.
    ///
    /// Returns the notification receiver when notifications are enabled.
    pub fn new(settings: &Settings) -> (Self, Option<UnboundedReceiver<ModerationEvent>>) {
        let (notifier, events) = if settings.moderation.notify {
            let (notifier, receiver) = ChannelNotifier::new();
            (Arc::new(notifier) as Arc<dyn Notifier>, Some(receiver))
        } else {
            (Arc::new(NoopNotifier) as Arc<dyn Notifier>, None)
        };

        let records = Arc::new(InMemoryRecordStore::new());
        let proposals = Arc::new(InMemoryProposalStore::new());
        let changelog = Arc::new(InMemoryChangeLog::new());

        let moderation = ModerationService::new(
            records.clone(),
            proposals.clone(),
            changelog.clone(),
            notifier,
            PermissionGate::default(),
        )
        .with_tie_break(settings.moderation.signal_tie_break);

        info!(
            notify = settings.moderation.notify,
            tie_break = ?settings.moderation.signal_tie_break,
            "Moderation state initialized"
        );

        (
            Self {
                moderation,
                records,
                proposals,
                changelog,
            },
            events,
        )
    }
}

/// Type alias for shared state
pub type SharedState = Arc<AppState>;
