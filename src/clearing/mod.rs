//! Clearing-state aggregator
//!
//! Per-team summaries of where releases stand with external review tools.

mod models;
mod summary;

pub use models::{
    ClearingState, ClearingStateSummary, ExternalTool, Release, ReviewSignal, ToolStatus, WorkflowStatus,
};
pub use summary::{ClearingStateComputer, SignalTieBreak};
