//! # Domain Invariants
//!
//! Invariants that MUST hold between any two state-changing calls.
//! The coordinator checks them in debug builds after every commit, and the
//! integration tests check them after every step of adversarial call orders.
//!
//! - INVARIANT-1: No two items share an assigned index
//! - INVARIANT-2: No assigned index is still in the pool
//! - INVARIANT-3: Pool size + assigned count == initial size
//! - INVARIANT-4: Every tracked item is rolling or already assigned

use crate::domain::entities::AllocatorState;
use crate::domain::ledger::RollState;
use crate::domain::value_objects::{AssetIndex, ItemId, RequestId};
use std::collections::{HashMap, HashSet};

// =============================================================================
// INVARIANT CHECKS
// =============================================================================

/// INVARIANT-1: No duplicate assignment.
///
/// Returns the first pair of items found sharing an index.
#[must_use]
pub fn find_duplicate_assignment(state: &AllocatorState) -> Option<(ItemId, ItemId, AssetIndex)> {
    let mut owners: HashMap<AssetIndex, ItemId> = HashMap::new();
    for (item, index) in state.ledger.assignments() {
        if let Some(other) = owners.insert(index, item) {
            return Some((other, item, index));
        }
    }
    None
}

/// INVARIANT-2: Assigned indices are absent from the pool.
///
/// Linear in pool size plus assigned count.
#[must_use]
pub fn check_pool_disjoint_invariant(state: &AllocatorState) -> bool {
    let available: HashSet<u64> = state.pool.remaining().iter().copied().collect();
    state
        .ledger
        .assignments()
        .all(|(_, index)| !available.contains(&index.get()))
}

/// INVARIANT-3: Pool size law.
///
/// Every successful reveal removes exactly one index.
#[must_use]
pub fn check_pool_size_invariant(state: &AllocatorState) -> bool {
    if !state.pool.is_initialized() {
        return state.ledger.assigned_count() == 0;
    }
    state.pool.size() as u64 + state.ledger.assigned_count() as u64 == state.initial_size
}

/// INVARIANT-4: Tracked items are `RollInProgress` or were revealed by the owner.
///
/// Returns the offending request and item.
#[must_use]
pub fn find_untracked_state(state: &AllocatorState) -> Option<(RequestId, ItemId)> {
    for request_id in state.tracker.pending_ids() {
        let Ok(items) = state.tracker.get(request_id) else {
            continue;
        };
        for item in items {
            if state.ledger.read(*item) == RollState::Unassigned {
                return Some((request_id, *item));
            }
        }
    }
    None
}

/// Check all invariants at once.
#[must_use]
pub fn check_all_invariants(state: &AllocatorState) -> InvariantCheckResult {
    let mut violations = Vec::new();

    if let Some((first, second, index)) = find_duplicate_assignment(state) {
        violations.push(InvariantViolation::DuplicateIndex {
            first,
            second,
            index,
        });
    }

    if !check_pool_disjoint_invariant(state) {
        violations.push(InvariantViolation::AssignedIndexInPool);
    }

    if !check_pool_size_invariant(state) {
        violations.push(InvariantViolation::PoolSizeDrift {
            pool_size: state.pool.size(),
            assigned: state.ledger.assigned_count(),
            initial: state.initial_size,
        });
    }

    if let Some((request_id, item)) = find_untracked_state(state) {
        violations.push(InvariantViolation::TrackedItemNotRolling { request_id, item });
    }

    if violations.is_empty() {
        InvariantCheckResult::Valid
    } else {
        InvariantCheckResult::Invalid(violations)
    }
}

// =============================================================================
// INVARIANT TYPES
// =============================================================================

/// Result of checking all invariants.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InvariantCheckResult {
    /// All invariants hold.
    Valid,
    /// One or more invariants violated.
    Invalid(Vec<InvariantViolation>),
}

impl InvariantCheckResult {
    /// Returns true if all invariants hold.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }
}

/// Specific invariant violation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InvariantViolation {
    /// Two items hold the same index.
    DuplicateIndex {
        /// Item found first with the index.
        first: ItemId,
        /// Item found second with the index.
        second: ItemId,
        /// The shared index.
        index: AssetIndex,
    },
    /// An assigned index is still drawable.
    AssignedIndexInPool,
    /// Pool size and assignments disagree with the initial size.
    PoolSizeDrift {
        /// Indices still available.
        pool_size: usize,
        /// Items assigned so far.
        assigned: usize,
        /// Size the pool was initialized with.
        initial: u64,
    },
    /// A pending request references an item that is not rolling.
    TrackedItemNotRolling {
        /// The pending request.
        request_id: RequestId,
        /// The unassigned item it references.
        item: ItemId,
    },
}

impl std::fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateIndex {
                first,
                second,
                index,
            } => {
                write!(f, "items {first} and {second} share index {index}")
            }
            Self::AssignedIndexInPool => write!(f, "assigned index still present in pool"),
            Self::PoolSizeDrift {
                pool_size,
                assigned,
                initial,
            } => {
                write!(
                    f,
                    "pool size drift: {pool_size} available + {assigned} assigned != {initial}"
                )
            }
            Self::TrackedItemNotRolling { request_id, item } => {
                write!(f, "request {request_id} tracks unassigned item {item}")
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
