//! Core model for the meshsim simulation engine.
//!
//! This crate provides the building blocks the engine schedules over:
//!
//! - [`Protocol`]: the per-node plugin trait, with typed capability lookup
//!   for [`EventHandler`], [`CycleHandler`] and [`Linkable`]
//! - [`Control`]: periodic callbacks that observe or mutate the simulation
//! - [`Network`]: the mutable, ordered registry of simulated nodes
//! - [`PrototypeRegistry`]: per-slot factories that populate new nodes
//! - [`EventQueue`]: the pending-event collection, ordered by (time, sequence)
//! - [`SimContext`] / [`ControlContext`]: the scheduling API handed to
//!   protocol handlers and controls
//!
//! # Architecture
//!
//! The model is single-threaded and cooperative:
//!
//! ```text
//! EventQueue → dispatch → Protocol::process_event(ctx, ...) → ctx.schedule(...)
//! ```
//!
//! Protocols never perform I/O and never block. Concurrency between
//! simulated peers is purely an artifact of event interleaving, which is
//! fully deterministic for a fixed seed.

mod context;
mod control;
mod error;
mod event_queue;
mod network;
mod node;
mod protocol;
mod prototypes;

pub use context::{ControlContext, SimContext};
pub use control::Control;
pub use error::{ConfigError, HandlerError, RegistryError, ScheduleError};
pub use event_queue::{EventHandle, EventKey, EventQueue, ScheduledEvent};
pub use network::Network;
pub use node::Node;
pub use protocol::{
    protocol_cell, CycleHandler, EventHandler, Linkable, Payload, Protocol, ProtocolCell,
    ProtocolFactory,
};
pub use prototypes::PrototypeRegistry;
