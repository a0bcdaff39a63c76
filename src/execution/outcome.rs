//! Per-unit outcomes and merged call results

use super::SqlError;

/// A unit failure absorbed by the suppress policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuppressedFailure {
    /// Position of the unit in the logical call
    pub index: usize,
    pub data_source: String,
    pub sql: String,
    pub error: SqlError,
}

/// Result of one unit: a real value, or a failure that was suppressed
#[derive(Debug, Clone, PartialEq)]
pub enum UnitOutcome<T> {
    Completed(T),
    Suppressed(SuppressedFailure),
}

impl<T> UnitOutcome<T> {
    pub fn is_suppressed(&self) -> bool {
        matches!(self, UnitOutcome::Suppressed(_))
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            UnitOutcome::Completed(value) => Some(value),
            UnitOutcome::Suppressed(_) => None,
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            UnitOutcome::Completed(value) => Some(value),
            UnitOutcome::Suppressed(_) => None,
        }
    }

    pub fn suppressed(&self) -> Option<&SuppressedFailure> {
        match self {
            UnitOutcome::Completed(_) => None,
            UnitOutcome::Suppressed(failure) => Some(failure),
        }
    }
}

/// Merged value of a logical call plus the failures suppressed on the way
#[derive(Debug, Clone, PartialEq)]
pub struct Merged<T> {
    value: T,
    suppressed: Vec<SuppressedFailure>,
}

impl<T> Merged<T> {
    pub fn new(value: T, suppressed: Vec<SuppressedFailure>) -> Self {
        Merged { value, suppressed }
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn into_value(self) -> T {
        self.value
    }

    pub fn suppressed(&self) -> &[SuppressedFailure] {
        &self.suppressed
    }

    /// True when at least one unit's failure was suppressed
    pub fn is_partial(&self) -> bool {
        !self.suppressed.is_empty()
    }
}

impl Merged<u64> {
    /// Sum of affected rows; suppressed units count as zero
    pub(crate) fn sum(outcomes: Vec<UnitOutcome<u64>>) -> Self {
        let mut total = 0u64;
        let mut suppressed = Vec::new();
        for outcome in outcomes {
            match outcome {
                UnitOutcome::Completed(count) => total = total.saturating_add(count),
                UnitOutcome::Suppressed(failure) => suppressed.push(failure),
            }
        }
        Merged::new(total, suppressed)
    }
}

impl Merged<bool> {
    /// First unit's flag; false when there is no first unit or it was suppressed
    pub(crate) fn first(outcomes: Vec<UnitOutcome<bool>>) -> Self {
        let value = matches!(outcomes.first(), Some(UnitOutcome::Completed(true)));
        let suppressed = outcomes
            .into_iter()
            .filter_map(|outcome| match outcome {
                UnitOutcome::Suppressed(failure) => Some(failure),
                UnitOutcome::Completed(_) => None,
            })
            .collect();
        Merged::new(value, suppressed)
    }
}
