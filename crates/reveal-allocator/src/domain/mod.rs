//! # Domain Layer (Inner Hexagon)
//!
//! Pure business logic for reveal allocation.
//! NO I/O, NO async, NO collaborator calls.
//!
//! - `pool` - shrinking index pool with journaled draws
//! - `ledger` - per-item roll state machine
//! - `tracker` - one-shot request records
//! - `entities` - the aggregate the coordinator owns
//! - `invariants` - cross-structure consistency checks

pub mod entities;
pub mod invariants;
pub mod ledger;
pub mod pool;
pub mod services;
pub mod tracker;
pub mod value_objects;

pub use entities::*;
pub use invariants::*;
pub use ledger::*;
pub use pool::*;
pub use services::*;
pub use tracker::*;
pub use value_objects::*;
