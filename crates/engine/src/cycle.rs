//! Cycle-driven execution.
//!
//! Cycle-driven protocols do not consume events; they are walked once per
//! cycle in a round-robin pass over the node population. In this engine a
//! cycle is just a periodic control: registering a [`CycleControl`] with
//! period `P` runs one cycle of one protocol slot every `P` time units,
//! sharing the node registry with event-driven protocols in the same
//! simulation.

use meshsim_core::{Control, ControlContext, HandlerError, Node};
use meshsim_types::{NodeId, ProtocolSlot};
use rand::seq::SliceRandom;
use std::rc::Rc;

/// Periodic round-robin driver for one cycle-driven protocol slot.
///
/// Nodes are visited in creation order, or in a seeded-random order when
/// shuffling is enabled (still deterministic for a fixed engine seed).
/// Suspended and removed nodes are skipped.
pub struct CycleControl {
    slot: ProtocolSlot,
    shuffle: bool,
}

impl CycleControl {
    /// Walk nodes in registry order.
    pub fn new(slot: ProtocolSlot) -> Self {
        Self {
            slot,
            shuffle: false,
        }
    }

    /// Walk nodes in a fresh seeded-random order each cycle.
    pub fn shuffled(slot: ProtocolSlot) -> Self {
        Self {
            slot,
            shuffle: true,
        }
    }
}

impl Control for CycleControl {
    fn execute(&mut self, ctx: &mut ControlContext<'_>) -> Result<bool, HandlerError> {
        // Snapshot identities first: handlers may not mutate the
        // population, but identity lookup keeps the walk well-defined
        // regardless of what earlier cycles scheduled.
        let mut ids: Vec<NodeId> = ctx
            .network()
            .iter()
            .filter(|node| node.is_up())
            .map(Node::id)
            .collect();
        // Registry order is perturbed by swap-removal; the walk follows
        // creation order regardless of churn.
        ids.sort_unstable();
        if self.shuffle {
            ids.shuffle(ctx.rng());
        }

        for id in ids {
            let Some(node) = ctx.network().by_id(id) else {
                continue;
            };
            let Some(cell) = node.protocol(self.slot) else {
                return Err(format!("protocol slot {} does not exist", self.slot).into());
            };
            let cell = Rc::clone(cell);
            let mut protocol = cell.borrow_mut();
            let Some(handler) = protocol.as_cycle_handler() else {
                return Err(format!("protocol in slot {} does not run cycles", self.slot).into());
            };
            let mut handler_ctx = ctx.handler_ctx();
            handler.next_cycle(&mut handler_ctx, id, self.slot)?;
        }
        Ok(false)
    }
}
