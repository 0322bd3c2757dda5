//! The node registry.
//!
//! A mutable, ordered collection of [`Node`]s. Removal swaps the last
//! element into the vacated position, so it is O(1) but invalidates any
//! cached index: callers that hold on to a node across mutations must
//! re-resolve it by [`NodeId`]. The identity index is maintained here so
//! that lookup stays O(1) after arbitrary churn.
//!
//! Structural mutation during iteration is ruled out statically:
//! iteration borrows the registry shared, while every mutating operation
//! takes `&mut self`.

use crate::error::RegistryError;
use crate::node::Node;
use crate::protocol::ProtocolCell;
use meshsim_types::{NodeId, NodeIndex};
use std::collections::HashMap;

/// Registry of all nodes in one simulation.
#[derive(Debug, Default)]
pub struct Network {
    nodes: Vec<Node>,
    /// Identity lookup, repaired on every swap-removal.
    index: HashMap<NodeId, NodeIndex>,
    /// Next creation-order identity; never reused.
    next_id: u64,
    removed: u64,
}

impl Network {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a node built from the given protocol array.
    ///
    /// Returns the node's current index. Amortized O(1).
    pub fn add(&mut self, protocols: Box<[ProtocolCell]>) -> NodeIndex {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        let index = self.nodes.len();
        self.nodes.push(Node::new(id, protocols));
        self.index.insert(id, index);
        index
    }

    /// Remove the node at `index` by swapping the last node into its place.
    ///
    /// O(1). Any cached index to the moved node becomes stale; re-resolve
    /// by identity afterwards.
    pub fn remove_at(&mut self, index: NodeIndex) -> Result<Node, RegistryError> {
        if index >= self.nodes.len() {
            return Err(RegistryError::IndexOutOfRange {
                index,
                len: self.nodes.len(),
            });
        }
        let node = self.nodes.swap_remove(index);
        self.index.remove(&node.id());
        if let Some(moved) = self.nodes.get(index) {
            self.index.insert(moved.id(), index);
        }
        self.removed += 1;
        Ok(node)
    }

    /// Remove a node by identity. Returns `None` if it is not registered.
    pub fn remove(&mut self, id: NodeId) -> Option<Node> {
        let index = self.index.get(&id).copied()?;
        self.remove_at(index).ok()
    }

    /// The node at `index`, bounds-checked.
    pub fn get(&self, index: NodeIndex) -> Result<&Node, RegistryError> {
        self.nodes.get(index).ok_or(RegistryError::IndexOutOfRange {
            index,
            len: self.nodes.len(),
        })
    }

    /// Mutable access to the node at `index`, bounds-checked.
    pub fn get_mut(&mut self, index: NodeIndex) -> Result<&mut Node, RegistryError> {
        let len = self.nodes.len();
        self.nodes
            .get_mut(index)
            .ok_or(RegistryError::IndexOutOfRange { index, len })
    }

    /// Identity lookup.
    pub fn by_id(&self, id: NodeId) -> Option<&Node> {
        self.index.get(&id).map(|&i| &self.nodes[i])
    }

    /// Mutable identity lookup.
    pub fn by_id_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        let index = self.index.get(&id).copied()?;
        self.nodes.get_mut(index)
    }

    /// Current index of the node with identity `id`, if registered.
    pub fn index_of(&self, id: NodeId) -> Option<NodeIndex> {
        self.index.get(&id).copied()
    }

    /// Number of registered nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterate over all nodes in current registry order.
    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    /// Total nodes ever created in this registry.
    pub fn nodes_added(&self) -> u64 {
        self.next_id
    }

    /// Total nodes removed from this registry.
    pub fn nodes_removed(&self) -> u64 {
        self.removed
    }
}
