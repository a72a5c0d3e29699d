//! # Error Types
//!
//! All error types for reveal allocation.
//!
//! Errors fall into three categories (see [`ErrorCategory`]):
//! precondition violations, authorization failures and collaborator failures.
//! Every failing operation leaves allocator state exactly as it found it.

use crate::domain::value_objects::{Address, AssetIndex, ItemId, RequestId};
use thiserror::Error;

// =============================================================================
// POOL ERRORS
// =============================================================================

/// Errors from the index pool.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// The pool was already populated.
    #[error("index pool already initialized")]
    AlreadyInitialized,

    /// No indices left to draw.
    #[error("index pool exhausted")]
    PoolExhausted,
}

// =============================================================================
// LEDGER ERRORS
// =============================================================================

/// Errors from the roll ledger state machine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// A roll is already pending for the item.
    #[error("roll already in progress for item {0}")]
    AlreadyRolling(ItemId),

    /// The item already holds a permanent index.
    #[error("item {item} already assigned index {index}")]
    AlreadyAssigned {
        /// The item.
        item: ItemId,
        /// Its index.
        index: AssetIndex,
    },

    /// The item is not waiting for a roll.
    #[error("item {0} has no roll in progress")]
    NotRolling(ItemId),
}

// =============================================================================
// TRACKER ERRORS
// =============================================================================

/// Errors from the request tracker.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TrackerError {
    /// The oracle handed out a request id that is still outstanding.
    #[error("duplicate request id: {0}")]
    DuplicateRequest(RequestId),

    /// Unknown or already consumed request id.
    #[error("unknown request id: {0}")]
    UnknownRequest(RequestId),
}

// =============================================================================
// COLLABORATOR ERRORS
// =============================================================================

/// Errors reported by the registry mirror.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MirrorError {
    /// The mirror already binds the item to a different value.
    #[error("mirror conflict for item {item}: holds {existing}, write was {attempted}")]
    Conflict {
        /// The item.
        item: ItemId,
        /// Value the mirror holds.
        existing: String,
        /// Value that was refused.
        attempted: String,
    },

    /// The mirror refused the write.
    #[error("mirror rejected write: {0}")]
    Rejected(String),

    /// The mirror could not be reached.
    #[error("registry mirror unavailable")]
    Unavailable,
}

/// Errors reported by the randomness oracle.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OracleError {
    /// The request could not be submitted.
    #[error("oracle request submission failed: {0}")]
    SubmissionFailed(String),

    /// The oracle could not be reached.
    #[error("randomness oracle unavailable")]
    Unavailable,
}

/// Errors reported by the minting collaborator.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MintError {
    /// The item exists but belongs to someone else.
    #[error("item {item} is owned by {owner}, not {receiver}")]
    NotOwner {
        /// The item.
        item: ItemId,
        /// Current owner.
        owner: Address,
        /// Receiver named in the reveal request.
        receiver: Address,
    },

    /// Minting failed.
    #[error("mint failed: {0}")]
    Failed(String),
}

// =============================================================================
// REVEAL ERRORS
// =============================================================================

/// Coarse classification of a [`RevealError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The call was not legal in the current state.
    Precondition,
    /// The caller lacks the required capability.
    Authorization,
    /// An external collaborator failed.
    Collaborator,
}

/// Errors surfaced by the reveal coordinator.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RevealError {
    /// Index pool precondition.
    #[error(transparent)]
    Pool(#[from] PoolError),

    /// Roll ledger precondition.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Request tracker precondition.
    #[error(transparent)]
    Tracker(#[from] TrackerError),

    /// Fulfillment carried the wrong number of random values.
    #[error("length mismatch: request has {expected} items, got {actual} values")]
    LengthMismatch {
        /// Items in the request.
        expected: usize,
        /// Values delivered.
        actual: usize,
    },

    /// The pool has not been initialized yet.
    #[error("index pool not initialized")]
    PoolNotInitialized,

    /// Pool size outside `1..=max_supply`.
    #[error("invalid pool size {requested} (max supply {max_supply})")]
    InvalidPoolSize {
        /// Requested size.
        requested: u64,
        /// Configured upper bound.
        max_supply: u64,
    },

    /// Reveal batch is empty.
    #[error("empty reveal batch")]
    EmptyBatch,

    /// Reveal batch exceeds the configured maximum.
    #[error("batch too large: {size} > {max}")]
    BatchTooLarge {
        /// Items in the batch.
        size: usize,
        /// Configured maximum.
        max: usize,
    },

    /// The same item appears twice in one batch.
    #[error("item {0} appears more than once in batch")]
    DuplicateItemInBatch(ItemId),

    /// Item id zero.
    #[error("invalid item id {0}")]
    InvalidItemId(ItemId),

    /// The caller lacks the capability for this operation.
    #[error("unauthorized: {caller} may not {action}")]
    Unauthorized {
        /// Who called.
        caller: Address,
        /// What they tried.
        action: &'static str,
    },

    /// The mirror does not accept this allocator as a minter.
    #[error("allocator {0} is not an authorized minter on the registry mirror")]
    MinterNotAuthorized(Address),

    /// Registry mirror failure.
    #[error("registry mirror error: {0}")]
    Mirror(#[from] MirrorError),

    /// Randomness oracle failure.
    #[error("oracle error: {0}")]
    Oracle(#[from] OracleError),

    /// Minting collaborator failure.
    #[error("minting error: {0}")]
    Mint(#[from] MintError),
}

impl RevealError {
    /// Classifies the error.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Unauthorized { .. } => ErrorCategory::Authorization,
            Self::MinterNotAuthorized(_)
            | Self::Mirror(_)
            | Self::Oracle(_)
            | Self::Mint(_) => ErrorCategory::Collaborator,
            _ => ErrorCategory::Precondition,
        }
    }

    /// Returns true if the caller was denied rather than the call being invalid.
    #[must_use]
    pub fn is_authorization(&self) -> bool {
        self.category() == ErrorCategory::Authorization
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reveal_error_display() {
        let err = RevealError::LengthMismatch {
            expected: 3,
            actual: 2,
        };
        assert_eq!(
            err.to_string(),
            "length mismatch: request has 3 items, got 2 values"
        );

        let err: RevealError = PoolError::PoolExhausted.into();
        assert_eq!(err.to_string(), "index pool exhausted");

        let err: RevealError = LedgerError::AlreadyRolling(ItemId(4)).into();
        assert_eq!(err.to_string(), "roll already in progress for item #4");
    }

    #[test]
    fn test_error_categories() {
        let unauthorized = RevealError::Unauthorized {
            caller: Address::ZERO,
            action: "reveal by owner",
        };
        assert_eq!(unauthorized.category(), ErrorCategory::Authorization);
        assert!(unauthorized.is_authorization());

        let replay: RevealError = TrackerError::UnknownRequest(RequestId::from_u64(1)).into();
        assert_eq!(replay.category(), ErrorCategory::Precondition);
        assert!(!replay.is_authorization());

        let mirror: RevealError = MirrorError::Unavailable.into();
        assert_eq!(mirror.category(), ErrorCategory::Collaborator);

        let oracle: RevealError = OracleError::SubmissionFailed("down".into()).into();
        assert_eq!(oracle.category(), ErrorCategory::Collaborator);
    }

    #[test]
    fn test_mint_error_display() {
        let err = MintError::NotOwner {
            item: ItemId(9),
            owner: Address::new([1; 20]),
            receiver: Address::new([2; 20]),
        };
        assert!(err.to_string().contains("#9"));
        assert!(err.to_string().contains("owned by"));
    }
}
