//! # Reveal Allocator - Randomized Without-Replacement Index Assignment
//!
//! **Status:** Production-Ready
//!
//! ## Purpose
//!
//! Binds each issued item to a content index drawn without replacement from a
//! fixed pool, using randomness that arrives asynchronously from an external
//! oracle. Between request and fulfillment an item is visibly
//! `RollInProgress`; once assigned its index never changes. The binding is
//! mirrored into a companion item registry.
//!
//! ## Domain Invariants
//!
//! | ID | Invariant | Enforcement Location |
//! |----|-----------|---------------------|
//! | INVARIANT-1 | No duplicate assignment | `domain/invariants.rs` - `find_duplicate_assignment()` |
//! | INVARIANT-2 | Assigned indices left the pool | `domain/invariants.rs` - `check_pool_disjoint_invariant()` |
//! | INVARIANT-3 | Pool size + assigned == initial size | `domain/invariants.rs` - `check_pool_size_invariant()` |
//! | INVARIANT-4 | Tracked items are rolling or assigned | `domain/invariants.rs` - `find_untracked_state()` |
//!
//! ## Security
//!
//! | Operation | Authorized Caller | Enforcement |
//! |-----------|-------------------|-------------|
//! | `initialize_pool` | owner | `service.rs` - `require_owner()` |
//! | `reveal_by_owner` | owner | `service.rs` - `require_owner()` |
//! | `on_fulfill` | oracle address | `service.rs` - `on_fulfill()` |
//! | `request_reveal` | anyone; allocator must be an authorized minter | `service.rs` - `request_reveal()` |
//!
//! ## Outbound Dependencies
//!
//! | Port | Purpose |
//! |------|---------|
//! | `RegistryMirror` | Mirror item → index bindings, minter capability |
//! | `RandomnessOracle` | Request random words |
//! | `MintingCollaborator` | Ensure items exist and belong to their receiver |
//! | `EventPublisher` | `RevealRequested` / `RevealCompleted` events |
//!
//! ## Usage Example
//!
//! ```ignore
//! use reveal_allocator::prelude::*;
//!
//! let coordinator = create_test_coordinator(RevealConfig::default());
//! coordinator.initialize_pool(owner, 10).await?;
//!
//! let request_id = coordinator.request_reveal(&[RevealEntry::new(alice, ItemId(1))]).await?;
//! coordinator.oracle().fulfill(&coordinator, request_id, &[U256::from(7)]).await?;
//!
//! assert_eq!(coordinator.roll_state(ItemId(1)).await, RollState::Assigned(AssetIndex(7)));
//! ```

// Crate-level lints
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// =============================================================================
// MODULES
// =============================================================================

pub mod adapters;
pub mod config;
pub mod domain;
pub mod errors;
pub mod events;
pub mod ports;
pub mod service;

// =============================================================================
// PRELUDE
// =============================================================================

/// Convenient re-exports for common usage.
pub mod prelude {
    // Domain
    pub use crate::domain::entities::{AllocatorState, PlannedReveal};
    pub use crate::domain::ledger::{RollLedger, RollState};
    pub use crate::domain::pool::{Draw, IndexBase, IndexPool};
    pub use crate::domain::tracker::RequestTracker;

    // Value objects
    pub use crate::domain::value_objects::{
        Address, AssetIndex, Hash, ItemId, RandomWord, RequestId, RevealEntry, U256,
        ROLL_IN_PROGRESS,
    };

    // Domain services
    pub use crate::domain::services::{derive_fallback_seed, keccak256};

    // Invariants
    pub use crate::domain::invariants::{
        check_all_invariants, InvariantCheckResult, InvariantViolation,
    };

    // Ports
    pub use crate::ports::inbound::{RevealApi, Revealed};
    pub use crate::ports::outbound::{
        EventPublisher, MintingCollaborator, RandomnessOracle, RegistryMirror,
    };

    // Events
    pub use crate::events::{topics, EventEnvelope, RevealEvent, RevealSource};

    // Errors
    pub use crate::errors::{
        ErrorCategory, LedgerError, MintError, MirrorError, OracleError, PoolError, RevealError,
        TrackerError,
    };

    // Config
    pub use crate::config::{ConfigError, OracleRequestParams, RevealConfig};

    // Adapters
    pub use crate::adapters::{
        spawn_fulfillment_listener, ChannelOracle, Fulfillment, FulfillmentHandler,
        InMemoryEventLog, InMemoryItemRegistry, ListenerReport, MockVrfCoordinator,
        OracleRequest,
    };

    // Service
    pub use crate::service::{
        create_test_coordinator, InMemoryCoordinator, RevealCoordinator, ServiceStats,
    };
}

// =============================================================================
// CRATE INFO
// =============================================================================

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// =============================================================================
// TESTS
// =============================================================================
