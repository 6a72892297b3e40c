//! Post-commit notifications
//!
//! Events go out after the change is committed. Delivery failures are logged
//! and never undo the change.

use crate::proposal::{ChangeProposal, ModerationState};
use serde::Serialize;
use std::collections::BTreeSet;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Something moderators or requesters may want to hear about
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum ModerationEvent {
    #[serde(rename_all = "camelCase")]
    RecordUpdated { document_id: String, actor: String },
    #[serde(rename_all = "camelCase")]
    RecordDeleted { document_id: String, actor: String },
    #[serde(rename_all = "camelCase")]
    ProposalSubmitted {
        proposal_id: Uuid,
        document_id: String,
        moderators: BTreeSet<String>,
    },
    #[serde(rename_all = "camelCase")]
    ProposalDecided {
        proposal_id: Uuid,
        document_id: String,
        state: ModerationState,
        requesting_user: String,
    },
}

impl ModerationEvent {
    pub fn submitted(proposal: &ChangeProposal) -> Self {
        ModerationEvent::ProposalSubmitted {
            proposal_id: proposal.id,
            document_id: proposal.target_document_id.clone(),
            moderators: proposal.moderators.clone(),
        }
    }

    pub fn decided(proposal: &ChangeProposal) -> Self {
        ModerationEvent::ProposalDecided {
            proposal_id: proposal.id,
            document_id: proposal.target_document_id.clone(),
            state: proposal.state,
            requesting_user: proposal.requesting_user.clone(),
        }
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, event: ModerationEvent);
}

/// Discards every event (notifications disabled)
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, event: ModerationEvent) {
        debug!(?event, "Notifications disabled, event dropped");
    }
}

/// Forwards events to an unbounded tokio channel
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    sender: mpsc::UnboundedSender<ModerationEvent>,
}

impl ChannelNotifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ModerationEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, event: ModerationEvent) {
        if let Err(e) = self.sender.send(event) {
            warn!(event = ?e.0, "Notification receiver gone, event dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_delivers_in_order() {
        let (notifier, mut rx) = ChannelNotifier::new();
        notifier.notify(ModerationEvent::RecordUpdated {
            document_id: "c-1".into(),
            actor: "a@corp.com".into(),
        });
        notifier.notify(ModerationEvent::RecordDeleted {
            document_id: "c-1".into(),
            actor: "a@corp.com".into(),
        });

        assert!(matches!(rx.recv().await, Some(ModerationEvent::RecordUpdated { .. })));
        assert!(matches!(rx.recv().await, Some(ModerationEvent::RecordDeleted { .. })));
    }

    #[test]
    fn test_closed_channel_does_not_panic() {
        let (notifier, rx) = ChannelNotifier::new();
        drop(rx);
        notifier.notify(ModerationEvent::RecordDeleted {
            document_id: "c-1".into(),
            actor: "a@corp.com".into(),
        });
    }

    #[test]
    fn test_event_serializes_with_tag() {
        let event = ModerationEvent::RecordUpdated {
            document_id: "c-1".into(),
            actor: "a@corp.com".into(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "recordUpdated");
        assert_eq!(json["documentId"], "c-1");
    }
}
