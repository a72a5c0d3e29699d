//! # Driven Ports (SPI - Outbound)
//!
//! These are the interfaces the reveal coordinator depends on.
//! External adapters implement these traits to provide:
//! - The companion item registry (registry mirror)
//! - The randomness oracle
//! - Item minting / ownership
//! - Event publication
//!
//! The coordinator never assumes a collaborator call can be undone by the
//! collaborator itself; every mutating mirror call has a compensating call.

use crate::config::OracleRequestParams;
use crate::domain::value_objects::{Address, ItemId, RequestId, U256};
use crate::errors::{MintError, MirrorError, OracleError};
use crate::events::EventEnvelope;
use async_trait::async_trait;

// =============================================================================
// REGISTRY MIRROR
// =============================================================================

/// The companion item registry that must observe the same item → index
/// binding as the allocator.
///
/// ## Write Semantics
///
/// `set_assigned_index` receives raw boundary values: either an asset index
/// or [`ROLL_IN_PROGRESS`](crate::domain::value_objects::ROLL_IN_PROGRESS).
/// Writing the value already stored is a no-op. Overwriting a real index with
/// a different value must be refused with `MirrorError::Conflict`.
#[async_trait]
pub trait RegistryMirror: Send + Sync {
    /// Records the raw reveal value for `item`.
    async fn set_assigned_index(&self, item: ItemId, raw: U256) -> Result<(), MirrorError>;

    /// Compensation: forces the raw value back to `previous` after an aborted
    /// coordinator call. `previous == 0` means "never written".
    async fn revert_assigned_index(&self, item: ItemId, previous: U256)
        -> Result<(), MirrorError>;

    /// Reads the raw value for `item` (zero if never written).
    async fn assigned_index(&self, item: ItemId) -> Result<U256, MirrorError>;

    /// Returns true if `minter` holds the minter capability on the registry.
    async fn is_minter_authorized(&self, minter: Address) -> Result<bool, MirrorError>;
}

// =============================================================================
// RANDOMNESS ORACLE
// =============================================================================

/// The external randomness source.
///
/// `request` returns immediately. The oracle later delivers exactly one
/// fulfillment per accepted request, carrying `num_words` values, by calling
/// [`RevealApi::on_fulfill`](crate::ports::inbound::RevealApi::on_fulfill).
#[async_trait]
pub trait RandomnessOracle: Send + Sync {
    /// Submits a request for `num_words` random values.
    async fn request(
        &self,
        params: &OracleRequestParams,
        num_words: u32,
    ) -> Result<RequestId, OracleError>;
}

// =============================================================================
// MINTING COLLABORATOR
// =============================================================================

/// Guarantees an item exists and belongs to its receiver before a reveal is
/// requested for it.
#[async_trait]
pub trait MintingCollaborator: Send + Sync {
    /// Mints `item` to `receiver` if it does not exist yet, otherwise checks
    /// that `receiver` owns it.
    async fn ensure_minted(&self, receiver: Address, item: ItemId) -> Result<(), MintError>;
}

// =============================================================================
// EVENT PUBLISHER
// =============================================================================

/// Sink for observable coordinator events.
pub trait EventPublisher: Send + Sync {
    /// Publishes one event. Publication never fails the calling operation.
    fn publish(&self, envelope: EventEnvelope);
}

// =============================================================================
// TESTS
// =============================================================================
