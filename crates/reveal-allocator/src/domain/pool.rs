//! # Index Pool
//!
//! The shrinking set of not-yet-assigned asset indices.
//!
//! The pool is an owned slot array. A draw maps a random word onto a slot
//! position by modulo, returns the slot's index and swap-removes it: the last
//! slot overwrites the drawn one and the pool shrinks by one. Initial order is
//! therefore irrelevant after the first draw.
//!
//! ```text
//! slots: [0, 1, 2, 3, 4]    draw(seed = 6) -> position 1 -> index 1
//! slots: [0, 4, 2, 3]
//! ```
//!
//! Every draw returns a [`Draw`] receipt. Receipts can be handed back to
//! [`IndexPool::restore`] in reverse order to undo a partially applied batch.

use crate::domain::value_objects::{AssetIndex, U256};
use crate::errors::PoolError;
use serde::{Deserialize, Serialize};

/// First index of the contiguous range the pool is populated with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum IndexBase {
    /// Indices `0..n`.
    #[default]
    Zero,
    /// Indices `1..=n`.
    One,
}

impl IndexBase {
    /// Offset added to every slot number.
    #[must_use]
    pub const fn offset(self) -> u64 {
        match self {
            Self::Zero => 0,
            Self::One => 1,
        }
    }
}

/// Receipt of one draw: where the index sat and which index left the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Draw {
    /// Slot position the seed mapped to.
    pub position: usize,
    /// The index removed from the pool.
    pub index: AssetIndex,
}

/// Shrinking pool of available asset indices.
#[derive(Debug, Clone, Default)]
pub struct IndexPool {
    slots: Vec<u64>,
    initialized: bool,
}

impl IndexPool {
    /// Creates an empty, uninitialized pool.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Populates the pool with `n` contiguous indices starting at `base`.
    ///
    /// # Errors
    ///
    /// `AlreadyInitialized` on any call after the first.
    pub fn initialize(&mut self, n: u64, base: IndexBase) -> Result<(), PoolError> {
        if self.initialized {
            return Err(PoolError::AlreadyInitialized);
        }
        let offset = base.offset();
        self.slots = (0..n).map(|slot| slot + offset).collect();
        self.initialized = true;
        Ok(())
    }

    /// Returns true once [`initialize`](Self::initialize) has succeeded.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Number of indices still available.
    #[must_use]
    pub fn size(&self) -> usize {
        self.slots.len()
    }

    /// Returns true if nothing is left to draw.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Returns true if `index` is still available.
    #[must_use]
    pub fn contains(&self, index: AssetIndex) -> bool {
        self.slots.contains(&index.get())
    }

    /// Maps `seed` onto a slot position without drawing.
    #[must_use]
    pub fn position_for(&self, seed: U256) -> Option<usize> {
        if self.slots.is_empty() {
            return None;
        }
        // Remainder is strictly below the slot count, so it fits in usize.
        Some((seed % U256::from(self.slots.len())).as_usize())
    }

    /// Draws the index at `seed mod size()` and swap-removes it.
    ///
    /// # Errors
    ///
    /// `PoolExhausted` if the pool is empty.
    pub fn draw(&mut self, seed: U256) -> Result<Draw, PoolError> {
        let position = self.position_for(seed).ok_or(PoolError::PoolExhausted)?;
        let index = self.slots.swap_remove(position);
        Ok(Draw {
            position,
            index: AssetIndex(index),
        })
    }

    /// Undoes `draw`, which must be the most recent draw not yet restored.
    pub fn restore(&mut self, draw: Draw) {
        if draw.position == self.slots.len() {
            self.slots.push(draw.index.get());
        } else {
            let moved = std::mem::replace(&mut self.slots[draw.position], draw.index.get());
            self.slots.push(moved);
        }
    }

    /// Undoes a sequence of draws, newest first.
    pub fn restore_all(&mut self, draws: &[Draw]) {
        for draw in draws.iter().rev() {
            self.restore(*draw);
        }
    }

    /// Snapshot of the remaining indices in slot order.
    #[must_use]
    pub fn remaining(&self) -> &[u64] {
        &self.slots
    }
}

// =============================================================================
// TESTS
// =============================================================================
