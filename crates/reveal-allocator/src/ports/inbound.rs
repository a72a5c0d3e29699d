//! # Driving Ports (API - Inbound)
//!
//! The interface exposed by the reveal coordinator to callers, operators and
//! the randomness oracle.
//!
//! ## Capabilities
//!
//! | Operation | Caller |
//! |-----------|--------|
//! | `initialize_pool` | owner |
//! | `request_reveal` | any (items must be minted to the receivers) |
//! | `on_fulfill` | configured oracle address |
//! | `reveal_by_owner` | owner |

use crate::domain::ledger::RollState;
use crate::domain::value_objects::{
    Address, AssetIndex, ItemId, RandomWord, RequestId, RevealEntry, U256,
};
use crate::errors::RevealError;
use async_trait::async_trait;

/// One item revealed by a fulfillment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Revealed {
    /// The item.
    pub item_id: ItemId,
    /// Its permanent index.
    pub index: AssetIndex,
}

/// Primary API of the reveal allocator.
///
/// ## Usage
///
/// ```ignore
/// let request_id = api.request_reveal(&[RevealEntry::new(alice, ItemId(1))]).await?;
/// // ... later, from the oracle:
/// let revealed = api.on_fulfill(oracle, request_id, &[word]).await?;
/// ```
#[async_trait]
pub trait RevealApi: Send + Sync {
    /// Populates the index pool with `size` indices. Owner only, once.
    async fn initialize_pool(&self, caller: Address, size: u64) -> Result<(), RevealError>;

    /// Marks every item of `batch` as rolling and requests randomness for the
    /// whole batch. All-or-nothing.
    async fn request_reveal(&self, batch: &[RevealEntry]) -> Result<RequestId, RevealError>;

    /// Applies delivered randomness: `words[i]` reveals the i-th item of the
    /// request. All-or-nothing; a request can be fulfilled once.
    async fn on_fulfill(
        &self,
        caller: Address,
        request_id: RequestId,
        words: &[RandomWord],
    ) -> Result<Vec<Revealed>, RevealError>;

    /// Owner fallback for an item stuck in `RollInProgress`.
    async fn reveal_by_owner(&self, caller: Address, item: ItemId)
        -> Result<AssetIndex, RevealError>;

    /// Current typed state of `item`.
    async fn roll_state(&self, item: ItemId) -> RollState;

    /// Raw boundary value of `item` (sentinel while rolling).
    async fn asset_index_raw(&self, item: ItemId) -> U256;

    /// Indices still available.
    async fn pool_size(&self) -> usize;
}
