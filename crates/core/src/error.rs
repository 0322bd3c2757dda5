//! Error types for the simulation model.
//!
//! Three categories, kept distinct at the type level:
//!
//! - [`ConfigError`]: setup mistakes, reported before any simulation time
//!   elapses and never retried.
//! - [`ScheduleError`] / [`RegistryError`]: rejected operations against the
//!   event queue or node registry; recoverable by the caller.
//! - [`HandlerError`]: opaque failures raised by protocol handlers and
//!   controls. The engine wraps these with virtual-time and node context
//!   and aborts the run; plugin code is trusted, not sandboxed.

use meshsim_types::VirtualTime;
use thiserror::Error;

/// Opaque error raised by protocol handlers and controls.
///
/// Plugins return whatever error type suits them; the engine attaches the
/// dispatch context (time, node, slot) when surfacing it.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Simulation setup errors.
///
/// All of these surface before the run loop starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A protocol slot was used before a prototype was registered for it.
    #[error("no prototype registered for protocol slot {slot}")]
    MissingPrototype { slot: usize },

    /// Two prototypes were registered for the same slot.
    #[error("prototype already registered for protocol slot {slot}")]
    DuplicatePrototype { slot: usize },

    /// A slot index outside the configured protocol array.
    #[error("protocol slot {slot} out of range ({slots} slots configured)")]
    SlotOutOfRange { slot: usize, slots: usize },

    /// Control execution periods must be positive.
    #[error("control execution period must be positive")]
    InvalidPeriod,
}

/// Rejected scheduling requests.
#[derive(Debug, Error)]
pub enum ScheduleError {
    /// Events can only be scheduled at or after the current virtual time.
    #[error("cannot schedule an event at time {requested}, clock is already at {now}")]
    InvalidTime {
        requested: VirtualTime,
        now: VirtualTime,
    },

    /// The target slot does not exist on any node.
    #[error("protocol slot {slot} out of range ({slots} slots configured)")]
    SlotOutOfRange { slot: usize, slots: usize },
}

/// Rejected node registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Index-based access past the end of the registry.
    #[error("node index {index} out of range (network size {len})")]
    IndexOutOfRange { index: usize, len: usize },
}
