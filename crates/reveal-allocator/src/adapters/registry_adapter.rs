//! # Registry Adapter
//!
//! In-memory item registry: plays both the minting collaborator and the
//! registry mirror, like the item contract the allocator is paired with.
//! Production deployments would talk to the real registry instead.
//!
//! Failure injection hooks let tests make the mirror refuse writes part way
//! through a batch.

use crate::domain::value_objects::{Address, ItemId, U256, ROLL_IN_PROGRESS};
use crate::errors::{MintError, MirrorError};
use crate::ports::outbound::{MintingCollaborator, RegistryMirror};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, PoisonError, RwLock};
use tracing::debug;

/// In-memory item registry for testing and the demo node.
#[derive(Debug, Default)]
pub struct InMemoryItemRegistry {
    /// Item owners.
    owners: RwLock<HashMap<ItemId, Address>>,
    /// Raw reveal values mirrored from the allocator.
    indices: RwLock<HashMap<ItemId, U256>>,
    /// Addresses holding the minter capability.
    minters: RwLock<HashSet<Address>>,
    /// Successful `set_assigned_index` calls allowed before writes fail.
    write_budget: Mutex<Option<usize>>,
    /// Simulates an unreachable registry.
    unavailable: Mutex<bool>,
}

impl InMemoryItemRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Grants the minter capability to `minter`.
    pub fn grant_minter(&self, minter: Address) {
        self.minters
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(minter);
    }

    /// Revokes the minter capability from `minter`.
    pub fn revoke_minter(&self, minter: Address) {
        self.minters
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&minter);
    }

    /// Owner of `item`, if minted.
    #[must_use]
    pub fn owner_of(&self, item: ItemId) -> Option<Address> {
        self.owners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&item)
            .copied()
    }

    /// Mints `item` to `owner` directly, outside any reveal.
    pub fn mint(&self, owner: Address, item: ItemId) {
        self.owners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(item, owner);
    }

    /// Number of minted items.
    #[must_use]
    pub fn minted_count(&self) -> usize {
        self.owners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Lets `n` more mirror writes succeed, then rejects every write.
    pub fn fail_writes_after(&self, n: usize) {
        *self
            .write_budget
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(n);
    }

    /// Removes any write failure injection.
    pub fn clear_write_failures(&self) {
        *self
            .write_budget
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Makes every call fail with `Unavailable` (or stop failing).
    pub fn set_unavailable(&self, unavailable: bool) {
        *self
            .unavailable
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = unavailable;
    }

    /// Raw value for `item`, read synchronously.
    #[must_use]
    pub fn raw_index(&self, item: ItemId) -> U256 {
        self.indices
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&item)
            .copied()
            .unwrap_or_default()
    }

    fn ensure_available(&self) -> Result<(), MirrorError> {
        if *self
            .unavailable
            .lock()
            .map_err(|_| MirrorError::Unavailable)?
        {
            return Err(MirrorError::Unavailable);
        }
        Ok(())
    }

    fn take_write_budget(&self) -> Result<(), MirrorError> {
        let mut budget = self
            .write_budget
            .lock()
            .map_err(|_| MirrorError::Unavailable)?;
        match budget.as_mut() {
            Some(0) => Err(MirrorError::Rejected("write budget exhausted".to_string())),
            Some(left) => {
                *left -= 1;
                Ok(())
            }
            None => Ok(()),
        }
    }
}

#[async_trait]
impl RegistryMirror for InMemoryItemRegistry {
    async fn set_assigned_index(&self, item: ItemId, raw: U256) -> Result<(), MirrorError> {
        self.ensure_available()?;

        let mut indices = self.indices.write().map_err(|_| MirrorError::Unavailable)?;
        match indices.get(&item) {
            Some(existing) if *existing == raw => return Ok(()),
            Some(existing) if *existing != ROLL_IN_PROGRESS => {
                return Err(MirrorError::Conflict {
                    item,
                    existing: existing.to_string(),
                    attempted: raw.to_string(),
                });
            }
            _ => {}
        }

        self.take_write_budget()?;
        indices.insert(item, raw);
        debug!(item = %item, raw = %raw, "mirror reveal value written");
        Ok(())
    }

    async fn revert_assigned_index(
        &self,
        item: ItemId,
        previous: U256,
    ) -> Result<(), MirrorError> {
        self.ensure_available()?;

        let mut indices = self.indices.write().map_err(|_| MirrorError::Unavailable)?;
        if previous.is_zero() {
            indices.remove(&item);
        } else {
            indices.insert(item, previous);
        }
        debug!(item = %item, previous = %previous, "mirror reveal value reverted");
        Ok(())
    }

    async fn assigned_index(&self, item: ItemId) -> Result<U256, MirrorError> {
        self.ensure_available()?;
        Ok(self.raw_index(item))
    }

    async fn is_minter_authorized(&self, minter: Address) -> Result<bool, MirrorError> {
        self.ensure_available()?;
        Ok(self
            .minters
            .read()
            .map_err(|_| MirrorError::Unavailable)?
            .contains(&minter))
    }
}

#[async_trait]
impl MintingCollaborator for InMemoryItemRegistry {
    async fn ensure_minted(&self, receiver: Address, item: ItemId) -> Result<(), MintError> {
        let mut owners = self
            .owners
            .write()
            .map_err(|_| MintError::Failed("registry lock poisoned".to_string()))?;
        match owners.get(&item) {
            Some(owner) if *owner == receiver => Ok(()),
            Some(owner) => Err(MintError::NotOwner {
                item,
                owner: *owner,
                receiver,
            }),
            None => {
                owners.insert(item, receiver);
                debug!(item = %item, receiver = %receiver, "item minted");
                Ok(())
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
