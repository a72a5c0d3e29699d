//! # Ports Layer (Middle Hexagon)
//!
//! Trait definitions for reveal allocation.
//! These are the interfaces between the domain and the outside world.
//!
//! - **Driving Ports (Inbound)**: `RevealApi`
//! - **Driven Ports (Outbound)**: `RegistryMirror`, `RandomnessOracle`,
//!   `MintingCollaborator`, `EventPublisher`
//! - No concrete implementations in this module

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
