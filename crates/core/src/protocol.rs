//! Protocol plugin traits and capability interfaces.
//!
//! A protocol is an opaque piece of per-node state plus a set of
//! capabilities the engine (or other protocols) may query:
//!
//! - [`EventHandler`]: consumes scheduled events (event-driven protocols)
//! - [`CycleHandler`]: invoked once per cycle by a periodic round-robin
//!   control (cycle-driven protocols)
//! - [`Linkable`]: exposes a neighbor list, consumed only by other
//!   protocols, never interpreted by the engine
//!
//! Capability lookup is explicit and typed. Asking a protocol for a
//! capability it does not implement yields `None`, which the engine turns
//! into a clear "capability not supported" error instead of a cast failure.

use crate::context::SimContext;
use crate::error::HandlerError;
use meshsim_types::{NodeId, ProtocolSlot};
use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

/// Opaque event payload.
///
/// Ownership passes to the invoked handler on dispatch. A `None` payload
/// is the timeout/self-alarm sentinel: a protocol wanting a timeout
/// schedules itself an empty event and checks its own state on delivery.
pub type Payload = Box<dyn Any>;

/// Shared handle to a protocol instance.
///
/// The model is single-threaded, so `Rc<RefCell<_>>` is sufficient.
/// Per-node protocols get a fresh cell per node; shared-singleton
/// protocols (valid for stateless logic) hand out clones of one cell.
pub type ProtocolCell = Rc<RefCell<dyn Protocol>>;

/// Wrap a protocol value into a [`ProtocolCell`].
pub fn protocol_cell<P: Protocol + 'static>(protocol: P) -> ProtocolCell {
    Rc::new(RefCell::new(protocol))
}

/// Base trait for all per-node protocol state.
///
/// The default capability lookups return `None`; a protocol overrides the
/// ones it supports, typically returning `Some(self)`.
pub trait Protocol {
    /// Event-driven capability: handle events delivered by the scheduler.
    fn as_event_handler(&mut self) -> Option<&mut dyn EventHandler> {
        None
    }

    /// Cycle-driven capability: run once per cycle under a periodic control.
    fn as_cycle_handler(&mut self) -> Option<&mut dyn CycleHandler> {
        None
    }

    /// Neighbor-list capability, read-only.
    fn as_linkable(&self) -> Option<&dyn Linkable> {
        None
    }

    /// Neighbor-list capability, mutable.
    fn as_linkable_mut(&mut self) -> Option<&mut dyn Linkable> {
        None
    }

    /// Concrete-type access for observers and sibling protocols.
    fn as_any(&self) -> &dyn Any;

    /// Mutable concrete-type access.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Event-handling entry point for event-driven protocols.
pub trait EventHandler {
    /// Process one event delivered to `node` in `slot`.
    ///
    /// `payload` is `None` for self-scheduled timeouts. The context allows
    /// scheduling further events, cancelling pending ones, reading the
    /// network, and drawing seeded randomness.
    ///
    /// Errors abort the whole run; simulated state is not recoverable once
    /// a protocol has observed an inconsistency.
    fn process_event(
        &mut self,
        ctx: &mut SimContext<'_>,
        node: NodeId,
        slot: ProtocolSlot,
        payload: Option<Payload>,
    ) -> Result<(), HandlerError>;
}

/// Cycle entry point for cycle-driven protocols.
pub trait CycleHandler {
    /// Run one cycle on `node`.
    fn next_cycle(
        &mut self,
        ctx: &mut SimContext<'_>,
        node: NodeId,
        slot: ProtocolSlot,
    ) -> Result<(), HandlerError>;
}

/// Neighbor-list capability.
///
/// The engine never interprets this; gossip-style protocols query it on
/// their peers through the node's protocol array.
pub trait Linkable {
    /// Number of neighbors.
    fn degree(&self) -> usize;

    /// Neighbor at position `i`, if any.
    fn neighbor(&self, i: usize) -> Option<NodeId>;

    /// Add a neighbor. Returns `false` if it was already present.
    fn add_neighbor(&mut self, id: NodeId) -> bool;

    /// Whether `id` is a neighbor.
    fn contains(&self, id: NodeId) -> bool;
}

/// Factory used by the prototype registry to populate new nodes.
///
/// A per-node factory builds an independent instance per call. A
/// shared-singleton factory returns clones of the same cell, so sibling
/// nodes deliberately share state.
pub trait ProtocolFactory {
    /// Build the protocol instance for one node.
    fn build(&self) -> ProtocolCell;
}

impl<F> ProtocolFactory for F
where
    F: Fn() -> ProtocolCell,
{
    fn build(&self) -> ProtocolCell {
        self()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Inert;

    impl Protocol for Inert {
        fn as_any(&self) -> &dyn Any {
            self
        }
        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    #[test]
    fn test_capabilities_default_to_none() {
        let mut p = Inert;
        assert!(p.as_event_handler().is_none());
        assert!(p.as_cycle_handler().is_none());
        assert!(p.as_linkable().is_none());
        assert!(p.as_linkable_mut().is_none());
    }

    #[test]
    fn test_downcast_through_any() {
        let cell = protocol_cell(Inert);
        assert!(cell.borrow().as_any().downcast_ref::<Inert>().is_some());
    }
}
