//! Clearing-state aggregation
//!
//! Counts a team's releases by how far along clearing they are. A release
//! counts for a team when it has a signal from that team, or no signals at
//! all; releases reviewed only by other teams are left out.

use super::models::{ClearingState, ClearingStateSummary, Release, ReviewSignal};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Which signal wins when a team has several on one release
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalTieBreak {
    /// First in the release's signal list
    #[default]
    FirstEncountered,
    /// Latest `requested_at`; untimestamped signals rank lowest, ties keep position
    MostRecent,
}

/// Stateless summary computer
#[derive(Debug, Clone, Copy, Default)]
pub struct ClearingStateComputer {
    tie_break: SignalTieBreak,
}

impl ClearingStateComputer {
    pub fn new(tie_break: SignalTieBreak) -> Self {
        Self { tie_break }
    }

    pub fn summarize(&self, releases: &[Release], team: &str) -> ClearingStateSummary {
        let mut summary = ClearingStateSummary::default();
        for release in releases {
            if let Some(state) = self.categorize(release, team) {
                summary.increment(state);
            }
        }
        debug!(team, releases = releases.len(), counted = summary.total(), "Computed clearing summary");
        summary
    }

    /// Derived state of `release` for `team`, `None` if it is not the team's
    pub fn categorize(&self, release: &Release, team: &str) -> Option<ClearingState> {
        if release.signals.is_empty() {
            return Some(release.clearing_state);
        }

        let signal = self.select_signal(&release.signals, team)?;
        Some(match signal.implied_state() {
            Some(implied) => release.clearing_state.most_advanced(implied),
            None => release.clearing_state,
        })
    }

    fn select_signal<'a>(&self, signals: &'a [ReviewSignal], team: &str) -> Option<&'a ReviewSignal> {
        let mut matching = signals.iter().filter(|s| s.reviewing_team == team);
        match self.tie_break {
            SignalTieBreak::FirstEncountered => matching.next(),
            SignalTieBreak::MostRecent => matching.fold(None, |best: Option<&ReviewSignal>, s| match best {
                Some(b) if b.requested_at >= s.requested_at => Some(b),
                _ => Some(s),
            }),
        }
    }
}
