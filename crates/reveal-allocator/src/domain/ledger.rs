//! # Roll Ledger
//!
//! Per-item reveal state.
//!
//! ## State Machine
//!
//! ```text
//! [Unassigned] ──mark_in_progress──→ [RollInProgress] ──assign──→ [Assigned(index)]
//! ```
//!
//! `Assigned` is terminal. The coordinator only marks items after every
//! external call of a request has succeeded, so no transition back exists.

use crate::domain::value_objects::{AssetIndex, ItemId, U256, ROLL_IN_PROGRESS};
use crate::errors::LedgerError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Reveal state of one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RollState {
    /// No reveal requested yet.
    #[default]
    Unassigned,
    /// Waiting for randomness.
    RollInProgress,
    /// Permanently bound to an asset index.
    Assigned(AssetIndex),
}

impl RollState {
    /// Raw read-boundary value.
    ///
    /// `Unassigned` reads as zero and `RollInProgress` as [`ROLL_IN_PROGRESS`].
    /// With a zero-based pool, zero is also a legal index; callers that need
    /// to tell those apart must use the typed state.
    #[must_use]
    pub fn to_raw(self) -> U256 {
        match self {
            Self::Unassigned => U256::zero(),
            Self::RollInProgress => ROLL_IN_PROGRESS,
            Self::Assigned(index) => index.to_raw(),
        }
    }

    /// Returns the assigned index, if any.
    #[must_use]
    pub fn assigned_index(self) -> Option<AssetIndex> {
        match self {
            Self::Assigned(index) => Some(index),
            _ => None,
        }
    }

    /// Returns true while the item waits for randomness.
    #[must_use]
    pub fn is_rolling(self) -> bool {
        matches!(self, Self::RollInProgress)
    }
}

/// Item id → reveal state. Items never touched are `Unassigned`.
#[derive(Debug, Clone, Default)]
pub struct RollLedger {
    entries: HashMap<ItemId, RollState>,
}

impl RollLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state of `item`.
    #[must_use]
    pub fn read(&self, item: ItemId) -> RollState {
        self.entries.get(&item).copied().unwrap_or_default()
    }

    /// Checks that `item` may enter `RollInProgress` without changing anything.
    ///
    /// # Errors
    ///
    /// `AlreadyRolling` or `AlreadyAssigned` unless the item is `Unassigned`.
    pub fn check_unassigned(&self, item: ItemId) -> Result<(), LedgerError> {
        match self.read(item) {
            RollState::Unassigned => Ok(()),
            RollState::RollInProgress => Err(LedgerError::AlreadyRolling(item)),
            RollState::Assigned(index) => Err(LedgerError::AlreadyAssigned { item, index }),
        }
    }

    /// `Unassigned → RollInProgress`.
    ///
    /// # Errors
    ///
    /// `AlreadyRolling` or `AlreadyAssigned` unless the item is `Unassigned`.
    pub fn mark_in_progress(&mut self, item: ItemId) -> Result<(), LedgerError> {
        self.check_unassigned(item)?;
        self.entries.insert(item, RollState::RollInProgress);
        Ok(())
    }

    /// `RollInProgress → Assigned(index)`.
    ///
    /// # Errors
    ///
    /// `NotRolling` unless the item is `RollInProgress`.
    pub fn assign(&mut self, item: ItemId, index: AssetIndex) -> Result<(), LedgerError> {
        if !self.read(item).is_rolling() {
            return Err(LedgerError::NotRolling(item));
        }
        self.entries.insert(item, RollState::Assigned(index));
        Ok(())
    }

    /// Number of items bound to an index.
    #[must_use]
    pub fn assigned_count(&self) -> usize {
        self.entries
            .values()
            .filter(|state| matches!(state, RollState::Assigned(_)))
            .count()
    }

    /// Number of items waiting for randomness.
    #[must_use]
    pub fn in_progress_count(&self) -> usize {
        self.entries.values().filter(|state| state.is_rolling()).count()
    }

    /// Iterates over every assigned `(item, index)` pair.
    pub fn assignments(&self) -> impl Iterator<Item = (ItemId, AssetIndex)> + '_ {
        self.entries
            .iter()
            .filter_map(|(item, state)| state.assigned_index().map(|index| (*item, index)))
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_unassigned() {
        let ledger = RollLedger::new();
        assert_eq!(ledger.read(ItemId(1)), RollState::Unassigned);
        assert_eq!(ledger.read(ItemId(1)).to_raw(), U256::zero());
    }

    #[test]
    fn test_full_lifecycle() {
        let mut ledger = RollLedger::new();
        let item = ItemId(1);

        ledger.mark_in_progress(item).unwrap();
        assert_eq!(ledger.read(item), RollState::RollInProgress);
        assert_eq!(ledger.read(item).to_raw(), ROLL_IN_PROGRESS);
        assert_eq!(ledger.in_progress_count(), 1);

        ledger.assign(item, AssetIndex(7)).unwrap();
        assert_eq!(ledger.read(item), RollState::Assigned(AssetIndex(7)));
        assert_eq!(ledger.read(item).to_raw(), U256::from(7));
        assert_eq!(ledger.assigned_count(), 1);
        assert_eq!(ledger.in_progress_count(), 0);
    }

    #[test]
    fn test_mark_rejects_rolling_and_assigned() {
        let mut ledger = RollLedger::new();
        ledger.mark_in_progress(ItemId(1)).unwrap();
        assert_eq!(
            ledger.mark_in_progress(ItemId(1)),
            Err(LedgerError::AlreadyRolling(ItemId(1)))
        );

        ledger.assign(ItemId(1), AssetIndex(0)).unwrap();
        assert_eq!(
            ledger.mark_in_progress(ItemId(1)),
            Err(LedgerError::AlreadyAssigned {
                item: ItemId(1),
                index: AssetIndex(0)
            })
        );
    }

    #[test]
    fn test_assign_requires_rolling() {
        let mut ledger = RollLedger::new();
        assert_eq!(
            ledger.assign(ItemId(2), AssetIndex(1)),
            Err(LedgerError::NotRolling(ItemId(2)))
        );

        ledger.mark_in_progress(ItemId(2)).unwrap();
        ledger.assign(ItemId(2), AssetIndex(1)).unwrap();

        // Assigned is terminal.
        assert_eq!(
            ledger.assign(ItemId(2), AssetIndex(3)),
            Err(LedgerError::NotRolling(ItemId(2)))
        );
        assert_eq!(ledger.read(ItemId(2)), RollState::Assigned(AssetIndex(1)));
    }

    #[test]
    fn test_assignments_iterator() {
        let mut ledger = RollLedger::new();
        for raw in 1..=3 {
            ledger.mark_in_progress(ItemId(raw)).unwrap();
        }
        ledger.assign(ItemId(1), AssetIndex(10)).unwrap();
        ledger.assign(ItemId(3), AssetIndex(30)).unwrap();

        let mut pairs: Vec<_> = ledger.assignments().collect();
        pairs.sort();
        assert_eq!(
            pairs,
            vec![(ItemId(1), AssetIndex(10)), (ItemId(3), AssetIndex(30))]
        );
    }
}
