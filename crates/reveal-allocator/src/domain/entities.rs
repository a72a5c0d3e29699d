//! # Domain Entities
//!
//! The allocator state aggregate owned exclusively by the reveal coordinator.

use crate::domain::ledger::{RollLedger, RollState};
use crate::domain::pool::{Draw, IndexBase, IndexPool};
use crate::domain::tracker::RequestTracker;
use crate::domain::value_objects::{AssetIndex, ItemId, RandomWord};
use crate::errors::{LedgerError, PoolError, RevealError};

/// Pool, ledger and tracker, mutated only by the coordinator.
#[derive(Debug, Clone, Default)]
pub struct AllocatorState {
    /// Available asset indices.
    pub pool: IndexPool,
    /// Per-item reveal state.
    pub ledger: RollLedger,
    /// Outstanding oracle requests.
    pub tracker: RequestTracker,
    /// Size the pool was initialized with.
    pub initial_size: u64,
    /// Counter mixed into owner fallback seeds.
    pub fallback_nonce: u64,
}

/// One planned `(item, draw)` pair of a fulfillment not yet committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedReveal {
    /// The item receiving the index.
    pub item: ItemId,
    /// Receipt of the pool draw.
    pub draw: Draw,
}

impl AllocatorState {
    /// Creates an empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Populates the pool.
    ///
    /// # Errors
    ///
    /// `AlreadyInitialized` on any call after the first.
    pub fn initialize_pool(&mut self, n: u64, base: IndexBase) -> Result<(), PoolError> {
        self.pool.initialize(n, base)?;
        self.initial_size = n;
        Ok(())
    }

    /// Draws one index per `(item, word)` pair in order.
    ///
    /// Either every pair gets a draw or the pool is restored and the error is
    /// returned; the ledger is never touched.
    ///
    /// # Errors
    ///
    /// `PoolExhausted` if the pool runs dry part way.
    pub fn plan_draws(
        &mut self,
        pairs: &[(ItemId, RandomWord)],
    ) -> Result<Vec<PlannedReveal>, PoolError> {
        let mut planned = Vec::with_capacity(pairs.len());
        for (item, word) in pairs {
            match self.pool.draw(*word) {
                Ok(draw) => planned.push(PlannedReveal { item: *item, draw }),
                Err(err) => {
                    self.undo_draws(&planned);
                    return Err(err);
                }
            }
        }
        Ok(planned)
    }

    /// Puts planned draws back into the pool, newest first.
    pub fn undo_draws(&mut self, planned: &[PlannedReveal]) {
        let draws: Vec<Draw> = planned.iter().map(|reveal| reveal.draw).collect();
        self.pool.restore_all(&draws);
    }

    /// Binds every planned item to its drawn index.
    ///
    /// # Errors
    ///
    /// `NotRolling` if an item left `RollInProgress` since planning. Nothing is
    /// written in that case.
    pub fn commit(&mut self, planned: &[PlannedReveal]) -> Result<(), LedgerError> {
        if let Some(stale) = planned
            .iter()
            .find(|reveal| !self.ledger.read(reveal.item).is_rolling())
        {
            return Err(LedgerError::NotRolling(stale.item));
        }
        for reveal in planned {
            self.ledger.assign(reveal.item, reveal.draw.index)?;
        }
        Ok(())
    }

    /// Current state of `item`.
    #[must_use]
    pub fn roll_state(&self, item: ItemId) -> RollState {
        self.ledger.read(item)
    }

    /// Index bound to `item`, if revealed.
    #[must_use]
    pub fn assigned_index(&self, item: ItemId) -> Option<AssetIndex> {
        self.ledger.read(item).assigned_index()
    }

    /// Fails unless the pool has been initialized.
    ///
    /// # Errors
    ///
    /// `PoolNotInitialized`.
    pub fn require_initialized(&self) -> Result<(), RevealError> {
        if self.pool.is_initialized() {
            Ok(())
        } else {
            Err(RevealError::PoolNotInitialized)
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::U256;

    fn state_with_rolling(n: u64, items: &[u64]) -> AllocatorState {
        let mut state = AllocatorState::new();
        state.initialize_pool(n, IndexBase::Zero).unwrap();
        for raw in items {
            state.ledger.mark_in_progress(ItemId(*raw)).unwrap();
        }
        state
    }

    #[test]
    fn test_plan_and_commit() {
        let mut state = state_with_rolling(10, &[1, 2]);
        let planned = state
            .plan_draws(&[(ItemId(1), U256::from(7)), (ItemId(2), U256::from(7))])
            .unwrap();
        assert_eq!(state.pool.size(), 8);

        state.commit(&planned).unwrap();
        assert_eq!(state.assigned_index(ItemId(1)), Some(AssetIndex(7)));
        // After swap-remove slot 7 holds the former last index 9.
        assert_eq!(state.assigned_index(ItemId(2)), Some(AssetIndex(9)));
    }

    #[test]
    fn test_plan_exhaustion_restores_pool() {
        let mut state = state_with_rolling(2, &[1, 2, 3]);
        let before = state.pool.remaining().to_vec();

        let result = state.plan_draws(&[
            (ItemId(1), U256::from(1)),
            (ItemId(2), U256::from(1)),
            (ItemId(3), U256::from(1)),
        ]);

        assert_eq!(result, Err(PoolError::PoolExhausted));
        assert_eq!(state.pool.remaining(), before.as_slice());
        assert_eq!(state.ledger.in_progress_count(), 3);
    }

    #[test]
    fn test_commit_rejects_stale_plan_without_writes() {
        let mut state = state_with_rolling(10, &[1, 2]);
        let planned = state
            .plan_draws(&[(ItemId(1), U256::zero()), (ItemId(2), U256::zero())])
            .unwrap();

        state.ledger.assign(ItemId(2), AssetIndex(5)).unwrap();
        assert_eq!(
            state.commit(&planned),
            Err(LedgerError::NotRolling(ItemId(2)))
        );
        assert!(state.roll_state(ItemId(1)).is_rolling());
    }

    #[test]
    fn test_require_initialized() {
        let state = AllocatorState::new();
        assert_eq!(
            state.require_initialized(),
            Err(RevealError::PoolNotInitialized)
        );
    }
}
