//! Per-unit outcomes
//!
//! A unit is one chart, field or related document. Units fail on their own:
//! the batch carries on and reports counts.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum UnitStatus {
    Success,
    Skipped { reason: String },
    Error { message: String },
}

impl UnitStatus {
    pub fn skipped(reason: impl Into<String>) -> Self {
        UnitStatus::Skipped {
            reason: reason.into(),
        }
    }

    pub fn error(message: impl std::fmt::Display) -> Self {
        UnitStatus::Error {
            message: message.to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, UnitStatus::Success)
    }
}

/// Outcome of one named unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitOutcome {
    pub name: String,
    #[serde(flatten)]
    pub status: UnitStatus,
}

/// Counts plus per-unit statuses for a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub units: Vec<UnitOutcome>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.units.len()
    }

    pub fn push(&mut self, name: impl Into<String>, status: UnitStatus) {
        match &status {
            UnitStatus::Success => self.processed += 1,
            UnitStatus::Skipped { .. } => self.skipped += 1,
            UnitStatus::Error { .. } => self.failed += 1,
        }
        self.units.push(UnitOutcome {
            name: name.into(),
            status,
        });
    }
}
