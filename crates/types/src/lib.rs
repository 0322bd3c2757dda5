//! Foundational types for the meshsim simulation engine.
//!
//! This crate provides the identifier and state types shared by every layer:
//!
//! - [`NodeId`]: stable creation-order identity of a simulated peer
//! - [`NodeIndex`]: a node's current position in the registry (changes on removal)
//! - [`ProtocolSlot`]: index into a node's fixed-length protocol array
//! - [`VirtualTime`]: the simulation's logical clock value
//! - [`FailState`]: liveness state of a node

mod fail_state;
mod ids;

pub use fail_state::FailState;
pub use ids::{NodeId, NodeIndex, ProtocolSlot};

/// Logical simulation time.
///
/// Virtual time is a plain counter with no relation to wall-clock time.
/// It never decreases; only the engine advances it, and only to the
/// delivery time of the event it is about to dispatch.
pub type VirtualTime = u64;
