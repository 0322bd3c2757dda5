//! Scheduling contexts handed to plugin code.
//!
//! Protocol handlers receive a [`SimContext`]: scheduling, cancellation,
//! read access to the network, and seeded randomness. Control hooks
//! receive a [`ControlContext`], which additionally allows structural
//! mutation of the node population. All mutation happens between dispatch
//! steps on the single logical thread; there is no concurrent access.

use crate::error::{ConfigError, ScheduleError};
use crate::event_queue::{EventHandle, EventQueue};
use crate::network::Network;
use crate::node::Node;
use crate::protocol::Payload;
use crate::prototypes::PrototypeRegistry;
use meshsim_types::{FailState, NodeId, ProtocolSlot, VirtualTime};
use rand_chacha::ChaCha8Rng;

fn check_slot(slot: ProtocolSlot, slots: usize) -> Result<(), ScheduleError> {
    if slot.0 >= slots {
        return Err(ScheduleError::SlotOutOfRange {
            slot: slot.0,
            slots,
        });
    }
    Ok(())
}

/// Context passed to protocol event and cycle handlers.
///
/// Handlers may read any node's protocol state through [`network`]
/// (shared-memory inspection is a deliberate feature of the simulated
/// domain), but only controls may mutate the population.
///
/// [`network`]: SimContext::network
pub struct SimContext<'a> {
    now: VirtualTime,
    slots: usize,
    queue: &'a mut EventQueue,
    network: &'a Network,
    rng: &'a mut ChaCha8Rng,
}

impl<'a> SimContext<'a> {
    /// Assemble a context. Called by the engine around each dispatch.
    pub fn new(
        now: VirtualTime,
        slots: usize,
        queue: &'a mut EventQueue,
        network: &'a Network,
        rng: &'a mut ChaCha8Rng,
    ) -> Self {
        Self {
            now,
            slots,
            queue,
            network,
            rng,
        }
    }

    /// Current virtual time.
    pub fn now(&self) -> VirtualTime {
        self.now
    }

    /// Number of configured protocol slots.
    pub fn slots(&self) -> usize {
        self.slots
    }

    /// Read access to the node registry.
    ///
    /// Reading the protocol instance currently being dispatched through
    /// the registry panics (it is mutably borrowed); handlers use `self`
    /// for their own state.
    pub fn network(&self) -> &Network {
        self.network
    }

    /// The engine's seeded randomness source.
    ///
    /// Drawing randomness only from here is what keeps runs reproducible
    /// for a fixed seed.
    pub fn rng(&mut self) -> &mut ChaCha8Rng {
        self.rng
    }

    /// Schedule an event `delay` time units from now.
    pub fn schedule_after(
        &mut self,
        delay: VirtualTime,
        target: NodeId,
        slot: ProtocolSlot,
        payload: Option<Payload>,
    ) -> Result<EventHandle, ScheduleError> {
        self.schedule_at(self.now.saturating_add(delay), target, slot, payload)
    }

    /// Schedule an event at absolute `time` (which must not be in the past).
    pub fn schedule_at(
        &mut self,
        time: VirtualTime,
        target: NodeId,
        slot: ProtocolSlot,
        payload: Option<Payload>,
    ) -> Result<EventHandle, ScheduleError> {
        check_slot(slot, self.slots)?;
        self.queue.schedule(self.now, time, target, slot, payload)
    }

    /// Cancel a pending event. Idempotent; returns whether it was pending.
    pub fn cancel(&mut self, handle: EventHandle) -> bool {
        self.queue.cancel(handle)
    }
}

/// Context passed to control hooks.
///
/// Controls run between dispatch steps and are the only plugin code
/// allowed to mutate the node population.
pub struct ControlContext<'a> {
    now: VirtualTime,
    slots: usize,
    queue: &'a mut EventQueue,
    network: &'a mut Network,
    prototypes: &'a PrototypeRegistry,
    rng: &'a mut ChaCha8Rng,
}

impl<'a> ControlContext<'a> {
    /// Assemble a context. Called by the engine around each control round.
    pub fn new(
        now: VirtualTime,
        slots: usize,
        queue: &'a mut EventQueue,
        network: &'a mut Network,
        prototypes: &'a PrototypeRegistry,
        rng: &'a mut ChaCha8Rng,
    ) -> Self {
        Self {
            now,
            slots,
            queue,
            network,
            prototypes,
            rng,
        }
    }

    /// Current virtual time.
    pub fn now(&self) -> VirtualTime {
        self.now
    }

    /// Number of configured protocol slots.
    pub fn slots(&self) -> usize {
        self.slots
    }

    /// Read access to the node registry.
    pub fn network(&self) -> &Network {
        self.network
    }

    /// The engine's seeded randomness source.
    pub fn rng(&mut self) -> &mut ChaCha8Rng {
        self.rng
    }

    /// Create a new node populated from the prototype registry.
    pub fn spawn_node(&mut self) -> Result<NodeId, ConfigError> {
        let protocols = self.prototypes.instantiate_all()?;
        let index = self.network.add(protocols);
        let node = self.network.get(index).expect("node just added");
        Ok(node.id())
    }

    /// Permanently remove a node. Pending events addressed to it become
    /// silent no-ops. Returns the node, or `None` if it was not registered.
    pub fn remove_node(&mut self, id: NodeId) -> Option<Node> {
        self.network.remove(id)
    }

    /// Change a node's liveness state. Setting [`FailState::Dead`] removes
    /// the node from the registry. Returns `false` for unknown identities.
    pub fn set_fail_state(&mut self, id: NodeId, state: FailState) -> bool {
        if state == FailState::Dead {
            return self.network.remove(id).is_some();
        }
        match self.network.by_id_mut(id) {
            Some(node) => {
                node.set_fail_state(state);
                true
            }
            None => false,
        }
    }

    /// Schedule an event `delay` time units from now.
    pub fn schedule_after(
        &mut self,
        delay: VirtualTime,
        target: NodeId,
        slot: ProtocolSlot,
        payload: Option<Payload>,
    ) -> Result<EventHandle, ScheduleError> {
        self.schedule_at(self.now.saturating_add(delay), target, slot, payload)
    }

    /// Schedule an event at absolute `time`.
    pub fn schedule_at(
        &mut self,
        time: VirtualTime,
        target: NodeId,
        slot: ProtocolSlot,
        payload: Option<Payload>,
    ) -> Result<EventHandle, ScheduleError> {
        check_slot(slot, self.slots)?;
        self.queue.schedule(self.now, time, target, slot, payload)
    }

    /// Cancel a pending event. Idempotent.
    pub fn cancel(&mut self, handle: EventHandle) -> bool {
        self.queue.cancel(handle)
    }

    /// Narrow this context to the handler view, for controls that invoke
    /// protocol handlers directly (cycle-driven execution).
    pub fn handler_ctx(&mut self) -> SimContext<'_> {
        SimContext::new(self.now, self.slots, self.queue, self.network, self.rng)
    }
}
