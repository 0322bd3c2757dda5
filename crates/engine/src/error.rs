//! Fatal run errors.

use meshsim_core::{ConfigError, HandlerError, RegistryError};
use meshsim_types::{NodeId, ProtocolSlot, VirtualTime};
use thiserror::Error;

/// Errors that terminate a simulation run.
///
/// Recoverable conditions (event for a removed node, cancelling an event
/// that already fired) never appear here; they are silent no-ops by
/// design. Everything in this enum either indicates broken setup, a bug
/// in plugin code, or a violated engine invariant.
#[derive(Debug, Error)]
pub enum EngineError {
    /// `run_to_completion` was called on an engine that already finished.
    /// One engine drives one run; build a new engine for another run.
    #[error("engine already finished; create a new engine for another run")]
    AlreadyFinished,

    /// The queue yielded an event older than the clock. Indicates queue
    /// corruption; never silently repaired.
    #[error("clock regression: popped event at time {event_time} behind clock at {now}")]
    ClockRegression {
        event_time: VirtualTime,
        now: VirtualTime,
    },

    /// A node's protocol array is shorter than the configured slot count.
    #[error("protocol array on node {node} is missing slot {slot} (at time {time})")]
    ProtocolArrayMismatch {
        time: VirtualTime,
        node: NodeId,
        slot: ProtocolSlot,
    },

    /// An event targeted a protocol that does not implement the
    /// event-handler capability.
    #[error("protocol in slot {slot} on node {node} does not handle events (at time {time})")]
    CapabilityNotSupported {
        time: VirtualTime,
        node: NodeId,
        slot: ProtocolSlot,
    },

    /// A protocol handler failed. Carries the dispatch context for
    /// debugging the protocol logic.
    #[error("protocol handler failed at time {time} on node {node} slot {slot}: {source}")]
    Handler {
        time: VirtualTime,
        node: NodeId,
        slot: ProtocolSlot,
        #[source]
        source: HandlerError,
    },

    /// A control hook failed.
    #[error("control '{name}' failed at time {time}: {source}")]
    Control {
        time: VirtualTime,
        name: String,
        #[source]
        source: HandlerError,
    },

    /// Invalid setup detected before or during the run.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Registry access violated an internal invariant.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}
