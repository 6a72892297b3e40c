//! Clearing data models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Release-level clearing state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClearingState {
    NewClearing,
    ScanAvailable,
    SentToClearingTool,
    UnderClearing,
    ReportAvailable,
    Approved,
}

impl ClearingState {
    /// Position in the clearing progression; higher is further along
    pub fn rank(&self) -> u8 {
        match self {
            ClearingState::NewClearing => 0,
            ClearingState::ScanAvailable => 1,
            ClearingState::SentToClearingTool => 2,
            ClearingState::UnderClearing => 3,
            ClearingState::ReportAvailable => 4,
            ClearingState::Approved => 5,
        }
    }

    /// The further advanced of two states
    pub fn most_advanced(self, other: ClearingState) -> ClearingState {
        if other.rank() > self.rank() {
            other
        } else {
            self
        }
    }
}

impl Default for ClearingState {
    fn default() -> Self {
        ClearingState::NewClearing
    }
}

/// External review tool a signal comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExternalTool {
    Fossology,
}

/// Whether the request reached the tool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowStatus {
    NotSent,
    Sent,
    AccessDenied,
    ConnectionFailed,
    ServerError,
}

/// Progress reported by the tool itself
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ToolStatus {
    Open,
    InProgress,
    Closed,
    Rejected,
    Resolved,
}

/// External review-tool request state for one reviewing team
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewSignal {
    pub reviewing_team: String,
    pub tool_kind: ExternalTool,
    pub workflow_status: WorkflowStatus,
    pub tool_status: ToolStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_at: Option<DateTime<Utc>>,
}

impl ReviewSignal {
    pub fn new(team: impl Into<String>, workflow_status: WorkflowStatus, tool_status: ToolStatus) -> Self {
        Self {
            reviewing_team: team.into(),
            tool_kind: ExternalTool::Fossology,
            workflow_status,
            tool_status,
            requested_at: None,
        }
    }

    pub fn requested_at(mut self, at: DateTime<Utc>) -> Self {
        self.requested_at = Some(at);
        self
    }

    /// Clearing state implied by the tool, if the request actually reached it
    pub fn implied_state(&self) -> Option<ClearingState> {
        if self.workflow_status != WorkflowStatus::Sent {
            return None;
        }
        match self.tool_status {
            ToolStatus::Open => Some(ClearingState::SentToClearingTool),
            ToolStatus::InProgress => Some(ClearingState::UnderClearing),
            ToolStatus::Closed | ToolStatus::Resolved => Some(ClearingState::ReportAvailable),
            ToolStatus::Rejected => None,
        }
    }
}

/// The release view the aggregator needs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Release {
    pub id: String,
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub clearing_state: ClearingState,
    /// Signals in insertion order
    #[serde(default)]
    pub signals: Vec<ReviewSignal>,
}

impl Release {
    pub fn new(id: impl Into<String>, clearing_state: ClearingState) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            version: String::new(),
            clearing_state,
            signals: Vec::new(),
        }
    }

    pub fn with_signal(mut self, signal: ReviewSignal) -> Self {
        self.signals.push(signal);
        self
    }
}

/// Per-team release counts by derived clearing state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearingStateSummary {
    pub new_release: u32,
    pub scan_available: u32,
    pub sent_to_clearing_tool: u32,
    pub under_clearing: u32,
    pub report_available: u32,
    pub approved: u32,
}

impl ClearingStateSummary {
    pub fn increment(&mut self, state: ClearingState) {
        let counter = match state {
            ClearingState::NewClearing => &mut self.new_release,
            ClearingState::ScanAvailable => &mut self.scan_available,
            ClearingState::SentToClearingTool => &mut self.sent_to_clearing_tool,
            ClearingState::UnderClearing => &mut self.under_clearing,
            ClearingState::ReportAvailable => &mut self.report_available,
            ClearingState::Approved => &mut self.approved,
        };
        *counter += 1;
    }

    pub fn total(&self) -> u32 {
        self.new_release
            + self.scan_available
            + self.sent_to_clearing_tool
            + self.under_clearing
            + self.report_available
            + self.approved
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_implied_state() {
        let sent = |tool| ReviewSignal::new("T", WorkflowStatus::Sent, tool).implied_state();
        assert_eq!(sent(ToolStatus::Open), Some(ClearingState::SentToClearingTool));
        assert_eq!(sent(ToolStatus::InProgress), Some(ClearingState::UnderClearing));
        assert_eq!(sent(ToolStatus::Closed), Some(ClearingState::ReportAvailable));
        assert_eq!(sent(ToolStatus::Rejected), None);

        let failed = ReviewSignal::new("T", WorkflowStatus::ConnectionFailed, ToolStatus::Open);
        assert_eq!(failed.implied_state(), None);
    }

    #[test]
    fn test_most_advanced() {
        assert_eq!(
            ClearingState::NewClearing.most_advanced(ClearingState::SentToClearingTool),
            ClearingState::SentToClearingTool
        );
        assert_eq!(
            ClearingState::Approved.most_advanced(ClearingState::UnderClearing),
            ClearingState::Approved
        );
    }

    #[test]
    fn test_summary_counts() {
        let mut summary = ClearingStateSummary::default();
        summary.increment(ClearingState::Approved);
        summary.increment(ClearingState::Approved);
        summary.increment(ClearingState::ScanAvailable);
        assert_eq!(summary.approved, 2);
        assert_eq!(summary.total(), 3);
    }
}
