//! Identifier types for nodes and protocol slots.

use std::fmt;

/// Stable identity of a simulated node.
///
/// Assigned in creation order by the node registry and immutable for the
/// node's lifetime. Used for deterministic tie-breaking and for identity
/// lookup after removals have shuffled registry positions.
///
/// This is *not* the node's registry index: swap-removal moves the last
/// node into the vacated position, so indices are only valid until the
/// next structural mutation. Identity lookups go through `NodeId`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A node's current position in the registry.
///
/// Valid only until the next structural mutation of the registry.
pub type NodeIndex = usize;

/// Index into a node's fixed-length protocol array.
///
/// Every node in a simulation carries the same protocol slots, populated
/// from the prototype registry at creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProtocolSlot(pub usize);

impl fmt::Display for ProtocolSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
