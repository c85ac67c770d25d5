//! Scan lifecycle state machine.
//!
//! Validating → Fetching → Scoring → Filtering → Ranking → Done.
//! Any non-terminal phase may move to Failed. Done and Failed are terminal.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScanPhase {
    Validating,
    Fetching,
    Scoring,
    Filtering,
    Ranking,
    Done,
    Failed,
}

impl ScanPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    pub fn can_transition_to(self, next: ScanPhase) -> bool {
        use ScanPhase::*;
        match (self, next) {
            (from, Failed) => !from.is_terminal(),
            (Validating, Fetching)
            | (Fetching, Scoring)
            | (Scoring, Filtering)
            | (Filtering, Ranking)
            | (Ranking, Done) => true,
            _ => false,
        }
    }
}

impl fmt::Display for ScanPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Validating => "validating",
            Self::Fetching => "fetching",
            Self::Scoring => "scoring",
            Self::Filtering => "filtering",
            Self::Ranking => "ranking",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum LifecycleError {
    #[error("invalid scan transition: {from} → {to}")]
    InvalidTransition { from: ScanPhase, to: ScanPhase },
}

/// Current phase plus the path taken to reach it.
#[derive(Debug, Clone)]
pub struct ScanLifecycle {
    trail: Vec<ScanPhase>,
}

impl Default for ScanLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanLifecycle {
    pub fn new() -> Self {
        Self {
            trail: vec![ScanPhase::Validating],
        }
    }

    pub fn phase(&self) -> ScanPhase {
        self.trail.last().copied().unwrap_or(ScanPhase::Validating)
    }

    pub fn advance(&mut self, to: ScanPhase) -> Result<(), LifecycleError> {
        let from = self.phase();
        if !from.can_transition_to(to) {
            return Err(LifecycleError::InvalidTransition { from, to });
        }
        tracing::trace!(%from, %to, "scan phase");
        self.trail.push(to);
        Ok(())
    }

    /// Move to Failed; a no-op once terminal.
    pub fn fail(&mut self) {
        if !self.phase().is_terminal() {
            self.trail.push(ScanPhase::Failed);
        }
    }

    pub fn trail(&self) -> &[ScanPhase] {
        &self.trail
    }
}
