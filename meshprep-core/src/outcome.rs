//! Per-stage outcome reporting
//!
//! Every pipeline stage returns a [`StageOutcome`] so callers can tell a
//! deliberate no-op apart from a degraded result produced after an internal
//! failure. Stages never return `Err`; the fallback value is always usable.

use crate::error::Error;
use std::fmt;

/// Why a stage left its input untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoOpReason {
    /// The mesh already carries a triangle index list.
    AlreadyIndexed,
    /// Fewer than 3 vertices; no triangle can be formed.
    TooFewVertices,
    /// The splitter needs an indexed mesh with at least 3 vertices and 3 indices.
    SplitPreconditionUnmet,
    /// The triangle count is already within the requested budget.
    WithinBudget,
    /// Subdivision is a reserved slot and performs no work.
    SubdivisionReserved,
    /// The solver inputs were out of range; the scale is unchanged.
    InvalidScaleInput,
}

impl fmt::Display for NoOpReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NoOpReason::AlreadyIndexed => "already indexed",
            NoOpReason::TooFewVertices => "fewer than 3 vertices",
            NoOpReason::SplitPreconditionUnmet => "split precondition unmet",
            NoOpReason::WithinBudget => "within triangle budget",
            NoOpReason::SubdivisionReserved => "subdivision reserved",
            NoOpReason::InvalidScaleInput => "invalid scale input",
        };
        f.write_str(s)
    }
}

/// Result of running one stage.
#[derive(Debug)]
pub enum StageOutcome<T> {
    /// The stage ran and produced a new value.
    Applied(T),
    /// The stage intentionally did nothing.
    Unchanged { value: T, reason: NoOpReason },
    /// The stage failed internally and fell back to `value`.
    Fallback { value: T, error: Error },
}

/// Value-free summary of a [`StageOutcome`], cheap to clone into reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageStatus {
    Applied,
    Unchanged(NoOpReason),
    Fallback(String),
}

impl<T> StageOutcome<T> {
    pub fn unchanged(value: T, reason: NoOpReason) -> Self {
        StageOutcome::Unchanged { value, reason }
    }

    pub fn fallback(value: T, error: Error) -> Self {
        StageOutcome::Fallback { value, error }
    }

    pub fn value(&self) -> &T {
        match self {
            StageOutcome::Applied(value)
            | StageOutcome::Unchanged { value, .. }
            | StageOutcome::Fallback { value, .. } => value,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            StageOutcome::Applied(value)
            | StageOutcome::Unchanged { value, .. }
            | StageOutcome::Fallback { value, .. } => value,
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, StageOutcome::Applied(_))
    }

    pub fn is_unchanged(&self) -> bool {
        matches!(self, StageOutcome::Unchanged { .. })
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, StageOutcome::Fallback { .. })
    }

    pub fn reason(&self) -> Option<NoOpReason> {
        match self {
            StageOutcome::Unchanged { reason, .. } => Some(*reason),
            _ => None,
        }
    }

    pub fn status(&self) -> StageStatus {
        match self {
            StageOutcome::Applied(_) => StageStatus::Applied,
            StageOutcome::Unchanged { reason, .. } => StageStatus::Unchanged(*reason),
            StageOutcome::Fallback { error, .. } => StageStatus::Fallback(error.to_string()),
        }
    }

    /// Split into the carried value and its status.
    pub fn into_parts(self) -> (T, StageStatus) {
        let status = self.status();
        (self.into_value(), status)
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> StageOutcome<U> {
        match self {
            StageOutcome::Applied(value) => StageOutcome::Applied(f(value)),
            StageOutcome::Unchanged { value, reason } => StageOutcome::Unchanged {
                value: f(value),
                reason,
            },
            StageOutcome::Fallback { value, error } => StageOutcome::Fallback {
                value: f(value),
                error,
            },
        }
    }
}
