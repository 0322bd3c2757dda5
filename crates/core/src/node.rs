//! A simulated peer.

use crate::protocol::ProtocolCell;
use meshsim_types::{FailState, NodeId, ProtocolSlot};

/// A simulated peer: a stable identity, a liveness state, and a
/// fixed-length array of protocol instances.
///
/// The protocol array length equals the number of configured protocol
/// slots and never changes after creation.
pub struct Node {
    id: NodeId,
    fail_state: FailState,
    protocols: Box<[ProtocolCell]>,
}

impl Node {
    pub(crate) fn new(id: NodeId, protocols: Box<[ProtocolCell]>) -> Self {
        Self {
            id,
            fail_state: FailState::Up,
            protocols,
        }
    }

    /// Stable creation-order identity.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Current liveness state.
    pub fn fail_state(&self) -> FailState {
        self.fail_state
    }

    /// Change the liveness state. Driven by control hooks only.
    pub fn set_fail_state(&mut self, state: FailState) {
        self.fail_state = state;
    }

    /// Whether the node participates in dispatch.
    pub fn is_up(&self) -> bool {
        self.fail_state.is_up()
    }

    /// Number of protocol slots on this node.
    pub fn slots(&self) -> usize {
        self.protocols.len()
    }

    /// The protocol instance in `slot`.
    ///
    /// Borrowing the returned cell while the same instance is already
    /// mutably borrowed (a handler reading its own node through the
    /// registry) panics; handlers access their own state through `self`.
    pub fn protocol(&self, slot: ProtocolSlot) -> Option<&ProtocolCell> {
        self.protocols.get(slot.0)
    }
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("fail_state", &self.fail_state)
            .field("slots", &self.protocols.len())
            .finish()
    }
}
