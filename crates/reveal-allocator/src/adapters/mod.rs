//! # Adapters Layer (Outer Hexagon)
//!
//! Adapters connect the reveal coordinator to its collaborators.
//!
//! - `registry_adapter` - in-memory item registry (mirror + minting)
//! - `vrf_coordinator` - mock oracle with on-demand fulfillment
//! - `event_handler` - channel oracle bridge and fulfillment listener
//! - `event_log` - in-memory event publisher

pub mod event_handler;
pub mod event_log;
pub mod registry_adapter;
pub mod vrf_coordinator;

pub use event_handler::*;
pub use event_log::*;
pub use registry_adapter::*;
pub use vrf_coordinator::*;
