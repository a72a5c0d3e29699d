//! # Event Schema
//!
//! Observable side effects of the reveal coordinator. Every state-changing
//! call that succeeds publishes one or more events through the
//! [`EventPublisher`](crate::ports::outbound::EventPublisher) port; failed
//! calls publish nothing.
//!
//! | Event | Published by | Cardinality |
//! |-------|--------------|-------------|
//! | `RevealRequested` | `request_reveal` | once per batch |
//! | `RevealCompleted` | `on_fulfill`, `reveal_by_owner` | once per revealed item |
//! | `PoolInitialized` | `initialize_pool` | once |

use crate::domain::value_objects::{AssetIndex, ItemId, RequestId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How an item obtained its index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RevealSource {
    /// Randomness delivered by the oracle.
    Oracle,
    /// Owner fallback seed.
    Owner,
}

/// Events published by the coordinator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RevealEvent {
    /// The index pool was populated.
    PoolInitialized {
        /// Number of indices.
        size: u64,
    },

    /// A batch now waits for the oracle.
    RevealRequested {
        /// Oracle request id.
        request_id: RequestId,
        /// Items in the order their random values will be applied.
        items: Vec<ItemId>,
    },

    /// One item was permanently bound to an index.
    RevealCompleted {
        /// The revealed item.
        item_id: ItemId,
        /// The drawn index.
        index: AssetIndex,
        /// Oracle request that carried the randomness (`None` for owner fallback).
        request_id: Option<RequestId>,
        /// Where the seed came from.
        source: RevealSource,
    },
}

impl RevealEvent {
    /// Topic name used when routing the event.
    #[must_use]
    pub fn topic(&self) -> &'static str {
        match self {
            Self::PoolInitialized { .. } => topics::POOL_INITIALIZED,
            Self::RevealRequested { .. } => topics::REVEAL_REQUESTED,
            Self::RevealCompleted { .. } => topics::REVEAL_COMPLETED,
        }
    }
}

/// An event with its correlation id, as delivered to subscribers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Correlation id shared by all events of one call.
    pub correlation_id: Uuid,
    /// The event.
    pub event: RevealEvent,
}

impl EventEnvelope {
    /// Wraps `event` with `correlation_id`.
    #[must_use]
    pub fn new(correlation_id: Uuid, event: RevealEvent) -> Self {
        Self {
            correlation_id,
            event,
        }
    }

    /// Serializes the envelope to JSON.
    ///
    /// # Errors
    ///
    /// Propagates `serde_json` errors.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Topic names.
pub mod topics {
    /// Pool initialized.
    pub const POOL_INITIALIZED: &str = "reveal.pool_initialized";
    /// Reveal requested.
    pub const REVEAL_REQUESTED: &str = "reveal.requested";
    /// Reveal completed.
    pub const REVEAL_COMPLETED: &str = "reveal.completed";
}

// =============================================================================
// TESTS
// =============================================================================
