//! # Reveal Coordinator Service
//!
//! Orchestrates the two-phase reveal: `request_reveal` parks a batch in
//! `RollInProgress` and asks the oracle for randomness, `on_fulfill` turns the
//! delivered values into permanent index assignments.
//!
//! ## Serialization
//!
//! The allocator state sits behind one `tokio::sync::Mutex` that every
//! state-changing call holds until it returns, collaborator awaits included.
//! Calls therefore never interleave.
//!
//! ## Dual Write
//!
//! The registry mirror is written before local state is committed. When a
//! mirror write fails, entries already written by the same call are reverted
//! and pool draws are restored from their receipts, so the allocator and the
//! mirror keep agreeing.
//!
//! ## Security
//!
//! - `initialize_pool` and `reveal_by_owner`: configured owner only
//! - `on_fulfill`: configured oracle address only

use crate::adapters::{InMemoryEventLog, InMemoryItemRegistry, MockVrfCoordinator};
use crate::config::RevealConfig;
use crate::domain::entities::{AllocatorState, PlannedReveal};
use crate::domain::invariants::{check_all_invariants, InvariantCheckResult};
use crate::domain::ledger::RollState;
use crate::domain::services::derive_fallback_seed;
use crate::domain::value_objects::{
    Address, AssetIndex, ItemId, RandomWord, RequestId, RevealEntry, U256, ROLL_IN_PROGRESS,
};
use crate::errors::{LedgerError, OracleError, RevealError, TrackerError};
use crate::events::{EventEnvelope, RevealEvent, RevealSource};
use crate::ports::inbound::{RevealApi, Revealed};
use crate::ports::outbound::{EventPublisher, MintingCollaborator, RandomnessOracle, RegistryMirror};

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// Statistics for the reveal coordinator.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ServiceStats {
    /// Oracle requests opened.
    pub requests_opened: u64,
    /// Fulfillments applied.
    pub fulfillments_applied: u64,
    /// Items revealed through the oracle path.
    pub items_revealed: u64,
    /// Items revealed through the owner fallback.
    pub owner_reveals: u64,
    /// Reveal requests rejected (validation or collaborator failure).
    pub rejected_requests: u64,
    /// Fulfillments rejected (unknown id, length mismatch, exhaustion...).
    pub rejected_fulfillments: u64,
    /// Calls refused for lack of capability.
    pub unauthorized_calls: u64,
}

/// The reveal coordinator.
///
/// Owns the pool, the roll ledger and the request tracker. Talks to the
/// outside world only through the outbound ports.
pub struct RevealCoordinator<R, O, M, P>
where
    R: RegistryMirror,
    O: RandomnessOracle,
    M: MintingCollaborator,
    P: EventPublisher,
{
    /// Deployment configuration.
    config: RevealConfig,
    /// Registry mirror.
    mirror: Arc<R>,
    /// Randomness oracle.
    oracle: Arc<O>,
    /// Minting collaborator.
    minter: Arc<M>,
    /// Event sink.
    publisher: Arc<P>,
    /// Pool, ledger and tracker. Held for the whole of every mutating call.
    state: Mutex<AllocatorState>,
    /// Service statistics.
    stats: RwLock<ServiceStats>,
}

impl<R, O, M, P> RevealCoordinator<R, O, M, P>
where
    R: RegistryMirror,
    O: RandomnessOracle,
    M: MintingCollaborator,
    P: EventPublisher,
{
    /// Create a new coordinator with an uninitialized pool.
    pub fn new(
        config: RevealConfig,
        mirror: Arc<R>,
        oracle: Arc<O>,
        minter: Arc<M>,
        publisher: Arc<P>,
    ) -> Self {
        Self {
            config,
            mirror,
            oracle,
            minter,
            publisher,
            state: Mutex::new(AllocatorState::new()),
            stats: RwLock::new(ServiceStats::default()),
        }
    }

    /// Configuration in use.
    pub fn config(&self) -> &RevealConfig {
        &self.config
    }

    /// Registry mirror.
    pub fn mirror(&self) -> &Arc<R> {
        &self.mirror
    }

    /// Randomness oracle.
    pub fn oracle(&self) -> &Arc<O> {
        &self.oracle
    }

    /// Minting collaborator.
    pub fn minter(&self) -> &Arc<M> {
        &self.minter
    }

    /// Event sink.
    pub fn publisher(&self) -> &Arc<P> {
        &self.publisher
    }

    /// Get current service statistics.
    pub async fn stats(&self) -> ServiceStats {
        self.stats.read().await.clone()
    }

    /// Request ids still waiting for the oracle.
    pub async fn pending_requests(&self) -> Vec<RequestId> {
        self.state.lock().await.tracker.pending_ids().collect()
    }

    /// Items still rolling.
    pub async fn rolling_count(&self) -> usize {
        self.state.lock().await.ledger.in_progress_count()
    }

    /// Runs every domain invariant check against the current state.
    pub async fn check_invariants(&self) -> InvariantCheckResult {
        check_all_invariants(&*self.state.lock().await)
    }

    // =========================================================================
    // POOL
    // =========================================================================

    /// Populates the index pool. Owner only, once.
    #[instrument(skip(self), fields(caller = %caller))]
    pub async fn initialize_pool(&self, caller: Address, size: u64) -> Result<(), RevealError> {
        self.require_owner(caller, "initialize the pool").await?;

        if size == 0 || size > self.config.max_supply {
            return Err(RevealError::InvalidPoolSize {
                requested: size,
                max_supply: self.config.max_supply,
            });
        }

        let mut state = self.state.lock().await;
        state.initialize_pool(size, self.config.index_base)?;

        info!(size, base = ?self.config.index_base, "Index pool initialized");
        self.publish(Uuid::new_v4(), RevealEvent::PoolInitialized { size });
        Ok(())
    }

    // =========================================================================
    // REQUEST PHASE
    // =========================================================================

    /// Marks a batch as rolling and asks the oracle for one value per item.
    ///
    /// On any failure no item changes state and mirror writes made by this
    /// call are reverted. Items minted by this call stay minted.
    #[instrument(skip(self, batch), fields(batch_size = batch.len()))]
    pub async fn request_reveal(&self, batch: &[RevealEntry]) -> Result<RequestId, RevealError> {
        let mut state = self.state.lock().await;

        let result = self.request_reveal_locked(&mut state, batch).await;
        match &result {
            Ok(request_id) => {
                self.stats.write().await.requests_opened += 1;
                debug!(request_id = %request_id, pending = state.tracker.pending_count(), "Request tracked");
            }
            Err(err) => {
                warn!(error = %err, "Reveal request rejected");
                self.stats.write().await.rejected_requests += 1;
            }
        }
        result
    }

    async fn request_reveal_locked(
        &self,
        state: &mut AllocatorState,
        batch: &[RevealEntry],
    ) -> Result<RequestId, RevealError> {
        state.require_initialized()?;
        let items = self.validate_batch(state, batch)?;

        if !self
            .mirror
            .is_minter_authorized(self.config.allocator_address)
            .await?
        {
            return Err(RevealError::MinterNotAuthorized(self.config.allocator_address));
        }

        for entry in batch {
            self.minter.ensure_minted(entry.receiver, entry.item_id).await?;
        }

        let writes: Vec<(ItemId, U256)> = items.iter().map(|item| (*item, ROLL_IN_PROGRESS)).collect();
        self.write_mirror(&writes, U256::zero()).await?;

        let request_id = match self.submit_oracle_request(items.len()).await {
            Ok(id) => id,
            Err(err) => {
                self.revert_mirror(&items, U256::zero()).await;
                return Err(err);
            }
        };

        if state.tracker.contains(request_id) {
            self.revert_mirror(&items, U256::zero()).await;
            return Err(TrackerError::DuplicateRequest(request_id).into());
        }

        for item in &items {
            state.ledger.mark_in_progress(*item)?;
        }
        state.tracker.open(request_id, items.clone())?;

        info!(request_id = %request_id, items = items.len(), "Reveal requested");
        self.publish(
            Uuid::new_v4(),
            RevealEvent::RevealRequested { request_id, items },
        );
        Ok(request_id)
    }

    /// Checks a batch without mutating anything. Returns the items in order.
    fn validate_batch(
        &self,
        state: &AllocatorState,
        batch: &[RevealEntry],
    ) -> Result<Vec<ItemId>, RevealError> {
        if batch.is_empty() {
            return Err(RevealError::EmptyBatch);
        }
        if batch.len() > self.config.max_batch_size {
            return Err(RevealError::BatchTooLarge {
                size: batch.len(),
                max: self.config.max_batch_size,
            });
        }

        let mut seen = HashSet::with_capacity(batch.len());
        for entry in batch {
            if !entry.item_id.is_valid() {
                return Err(RevealError::InvalidItemId(entry.item_id));
            }
            if !seen.insert(entry.item_id) {
                return Err(RevealError::DuplicateItemInBatch(entry.item_id));
            }
            state.ledger.check_unassigned(entry.item_id)?;
        }

        Ok(batch.iter().map(|entry| entry.item_id).collect())
    }

    async fn submit_oracle_request(&self, batch_size: usize) -> Result<RequestId, RevealError> {
        let num_words = u32::try_from(batch_size).map_err(|_| {
            OracleError::SubmissionFailed(format!("batch of {batch_size} exceeds u32 words"))
        })?;
        Ok(self.oracle.request(&self.config.oracle, num_words).await?)
    }

    // =========================================================================
    // FULFILLMENT PHASE
    // =========================================================================

    /// Applies oracle randomness to a pending request.
    ///
    /// `words[i]` reveals the i-th item of the request. Items the owner
    /// revealed in the meantime are skipped and their words discarded.
    /// All-or-nothing: on error the request stays pending and nothing moves.
    #[instrument(skip(self, words), fields(request_id = %request_id, words = words.len()))]
    pub async fn on_fulfill(
        &self,
        caller: Address,
        request_id: RequestId,
        words: &[RandomWord],
    ) -> Result<Vec<Revealed>, RevealError> {
        if caller != self.config.oracle_address {
            warn!(caller = %caller, "Fulfillment from unauthorized caller");
            self.stats.write().await.unauthorized_calls += 1;
            return Err(RevealError::Unauthorized {
                caller,
                action: "fulfill randomness",
            });
        }

        let mut state = self.state.lock().await;
        let result = self.fulfill_locked(&mut state, request_id, words).await;

        let mut stats = self.stats.write().await;
        match &result {
            Ok(revealed) => {
                stats.fulfillments_applied += 1;
                stats.items_revealed += revealed.len() as u64;
            }
            Err(err) => {
                warn!(error = %err, "Fulfillment rejected");
                stats.rejected_fulfillments += 1;
            }
        }
        result
    }

    async fn fulfill_locked(
        &self,
        state: &mut AllocatorState,
        request_id: RequestId,
        words: &[RandomWord],
    ) -> Result<Vec<Revealed>, RevealError> {
        let items = state.tracker.get(request_id)?.to_vec();
        if words.len() != items.len() {
            return Err(RevealError::LengthMismatch {
                expected: items.len(),
                actual: words.len(),
            });
        }

        let mut pairs = Vec::with_capacity(items.len());
        for (item, word) in items.iter().zip(words) {
            match state.roll_state(*item) {
                RollState::RollInProgress => pairs.push((*item, *word)),
                RollState::Assigned(index) => {
                    debug!(item = %item, index = %index, "Skipping item revealed by owner");
                }
                RollState::Unassigned => return Err(LedgerError::NotRolling(*item).into()),
            }
        }

        let planned = state.plan_draws(&pairs)?;
        self.commit_planned(state, &planned).await?;
        state.tracker.consume(request_id)?;

        let correlation_id = Uuid::new_v4();
        let revealed: Vec<Revealed> = planned
            .iter()
            .map(|reveal| Revealed {
                item_id: reveal.item,
                index: reveal.draw.index,
            })
            .collect();
        for reveal in &revealed {
            self.publish(
                correlation_id,
                RevealEvent::RevealCompleted {
                    item_id: reveal.item_id,
                    index: reveal.index,
                    request_id: Some(request_id),
                    source: RevealSource::Oracle,
                },
            );
        }

        info!(
            revealed = revealed.len(),
            skipped = items.len() - revealed.len(),
            pool_size = state.pool.size(),
            "Fulfillment applied"
        );
        self.verify_invariants(state);
        Ok(revealed)
    }

    // =========================================================================
    // OWNER FALLBACK
    // =========================================================================

    /// Reveals a stuck item with a seed derived from the owner address, the
    /// item, the current pool size and a fallback counter.
    #[instrument(skip(self), fields(caller = %caller, item = %item))]
    pub async fn reveal_by_owner(
        &self,
        caller: Address,
        item: ItemId,
    ) -> Result<AssetIndex, RevealError> {
        self.require_owner(caller, "reveal by owner").await?;

        let mut state = self.state.lock().await;
        let seed = derive_fallback_seed(
            self.config.owner,
            item,
            state.pool.size() as u64,
            state.fallback_nonce,
        );
        self.owner_reveal_locked(&mut state, item, seed).await
    }

    /// Owner fallback with an explicit seed.
    #[instrument(skip(self, seed), fields(caller = %caller, item = %item))]
    pub async fn reveal_by_owner_with_seed(
        &self,
        caller: Address,
        item: ItemId,
        seed: U256,
    ) -> Result<AssetIndex, RevealError> {
        self.require_owner(caller, "reveal by owner").await?;

        let mut state = self.state.lock().await;
        self.owner_reveal_locked(&mut state, item, seed).await
    }

    async fn owner_reveal_locked(
        &self,
        state: &mut AllocatorState,
        item: ItemId,
        seed: U256,
    ) -> Result<AssetIndex, RevealError> {
        state.require_initialized()?;
        if !state.roll_state(item).is_rolling() {
            return Err(LedgerError::NotRolling(item).into());
        }

        let planned = state.plan_draws(&[(item, seed)])?;
        self.commit_planned(state, &planned).await?;
        state.fallback_nonce += 1;
        Self::retire_settled_request(state, item);

        let index = planned[0].draw.index;
        self.stats.write().await.owner_reveals += 1;
        info!(index = %index, pool_size = state.pool.size(), "Item revealed by owner");
        self.publish(
            Uuid::new_v4(),
            RevealEvent::RevealCompleted {
                item_id: item,
                index,
                request_id: None,
                source: RevealSource::Owner,
            },
        );
        self.verify_invariants(state);
        Ok(index)
    }

    // =========================================================================
    // READS
    // =========================================================================

    /// Typed state of `item`.
    pub async fn roll_state(&self, item: ItemId) -> RollState {
        self.state.lock().await.roll_state(item)
    }

    /// Raw boundary value of `item`: sentinel while rolling, zero if unassigned.
    pub async fn asset_index_raw(&self, item: ItemId) -> U256 {
        self.state.lock().await.roll_state(item).to_raw()
    }

    /// Indices still available.
    pub async fn pool_size(&self) -> usize {
        self.state.lock().await.pool.size()
    }

    // =========================================================================
    // INTERNALS
    // =========================================================================

    /// Drops the request holding `item` once the owner has revealed every
    /// item of its batch. A later delivery for it is then `UnknownRequest`.
    fn retire_settled_request(state: &mut AllocatorState, item: ItemId) {
        let Some(request_id) = state.tracker.request_for(item) else {
            return;
        };
        let settled = state
            .tracker
            .get(request_id)
            .is_ok_and(|items| items.iter().all(|other| !state.roll_state(*other).is_rolling()));
        if settled && state.tracker.consume(request_id).is_ok() {
            debug!(request_id = %request_id, "Request settled by owner fallback");
        }
    }

    async fn require_owner(&self, caller: Address, action: &'static str) -> Result<(), RevealError> {
        if caller == self.config.owner {
            return Ok(());
        }
        warn!(caller = %caller, action, "Unauthorized privileged call");
        self.stats.write().await.unauthorized_calls += 1;
        Err(RevealError::Unauthorized { caller, action })
    }

    /// Mirrors the planned indices, then binds them locally. Undoes the draws
    /// and the mirror writes if either step fails.
    async fn commit_planned(
        &self,
        state: &mut AllocatorState,
        planned: &[PlannedReveal],
    ) -> Result<(), RevealError> {
        let writes: Vec<(ItemId, U256)> = planned
            .iter()
            .map(|reveal| (reveal.item, reveal.draw.index.to_raw()))
            .collect();

        if let Err(err) = self.write_mirror(&writes, ROLL_IN_PROGRESS).await {
            state.undo_draws(planned);
            return Err(err);
        }

        if let Err(err) = state.commit(planned) {
            let items: Vec<ItemId> = planned.iter().map(|reveal| reveal.item).collect();
            self.revert_mirror(&items, ROLL_IN_PROGRESS).await;
            state.undo_draws(planned);
            return Err(err.into());
        }
        Ok(())
    }

    /// Writes every `(item, raw)` pair to the mirror in order. On the first
    /// failure the pairs already written are reverted to `previous`.
    async fn write_mirror(&self, writes: &[(ItemId, U256)], previous: U256) -> Result<(), RevealError> {
        for (done, (item, raw)) in writes.iter().enumerate() {
            if let Err(err) = self.mirror.set_assigned_index(*item, *raw).await {
                error!(item = %item, error = %err, "Mirror write failed, compensating");
                let written: Vec<ItemId> = writes[..done].iter().map(|(item, _)| *item).collect();
                self.revert_mirror(&written, previous).await;
                return Err(err.into());
            }
        }
        Ok(())
    }

    async fn revert_mirror(&self, items: &[ItemId], previous: U256) {
        for item in items.iter().rev() {
            if let Err(err) = self.mirror.revert_assigned_index(*item, previous).await {
                error!(item = %item, error = %err, "Mirror compensation failed");
            }
        }
    }

    fn publish(&self, correlation_id: Uuid, event: RevealEvent) {
        self.publisher.publish(EventEnvelope::new(correlation_id, event));
    }

    fn verify_invariants(&self, state: &AllocatorState) {
        if !self.config.check_invariants {
            return;
        }
        if let InvariantCheckResult::Invalid(violations) = check_all_invariants(state) {
            for violation in &violations {
                error!(violation = %violation, "Allocator invariant violated");
            }
        }
    }
}

/// Coordinator wired to the in-memory adapters.
pub type InMemoryCoordinator =
    RevealCoordinator<InMemoryItemRegistry, MockVrfCoordinator, InMemoryItemRegistry, InMemoryEventLog>;

/// Create a coordinator backed by in-memory adapters.
///
/// The registry grants the minter capability to the configured allocator
/// address; the pool is left uninitialized.
pub fn create_test_coordinator(config: RevealConfig) -> InMemoryCoordinator {
    let registry = Arc::new(InMemoryItemRegistry::new());
    registry.grant_minter(config.allocator_address);
    let oracle = Arc::new(MockVrfCoordinator::new(config.oracle_address));
    RevealCoordinator::new(
        config,
        Arc::clone(&registry),
        oracle,
        registry,
        Arc::new(InMemoryEventLog::new()),
    )
}

// =============================================================================
// TRAIT IMPLEMENTATION
// =============================================================================

#[async_trait]
impl<R, O, M, P> RevealApi for RevealCoordinator<R, O, M, P>
where
    R: RegistryMirror,
    O: RandomnessOracle,
    M: MintingCollaborator,
    P: EventPublisher,
{
    async fn initialize_pool(&self, caller: Address, size: u64) -> Result<(), RevealError> {
        RevealCoordinator::initialize_pool(self, caller, size).await
    }

    async fn request_reveal(&self, batch: &[RevealEntry]) -> Result<RequestId, RevealError> {
        RevealCoordinator::request_reveal(self, batch).await
    }

    async fn on_fulfill(
        &self,
        caller: Address,
        request_id: RequestId,
        words: &[RandomWord],
    ) -> Result<Vec<Revealed>, RevealError> {
        RevealCoordinator::on_fulfill(self, caller, request_id, words).await
    }

    async fn reveal_by_owner(
        &self,
        caller: Address,
        item: ItemId,
    ) -> Result<AssetIndex, RevealError> {
        RevealCoordinator::reveal_by_owner(self, caller, item).await
    }

    async fn roll_state(&self, item: ItemId) -> RollState {
        RevealCoordinator::roll_state(self, item).await
    }

    async fn asset_index_raw(&self, item: ItemId) -> U256 {
        RevealCoordinator::asset_index_raw(self, item).await
    }

    async fn pool_size(&self) -> usize {
        RevealCoordinator::pool_size(self).await
    }
}

// =============================================================================
// TESTS
// =============================================================================
