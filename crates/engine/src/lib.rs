//! Discrete-event simulation engine.
//!
//! This crate provides the scheduler/dispatcher that drives a simulated
//! peer population. Given the same seed and configuration, it produces an
//! identical sequence of dispatches every run.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                        Engine                           │
//! │                                                         │
//! │  ┌────────────────────────────────────────────────────┐ │
//! │  │     EventQueue (BTreeMap<EventKey, _>)             │ │
//! │  │     Ordered by: time, insertion sequence           │ │
//! │  └────────────────────────┬───────────────────────────┘ │
//! │                           │ pop → advance clock         │
//! │                           ▼                             │
//! │  ┌────────────────────────────────────────────────────┐ │
//! │  │     Network: Vec<Node>, each with protocol array   │ │
//! │  │     Target resolved by identity; gone ⇒ dropped    │ │
//! │  └────────────────────────┬───────────────────────────┘ │
//! │                           │ process_event(ctx, ...)     │
//! │                           ▼                             │
//! │  ┌────────────────────────────────────────────────────┐ │
//! │  │     Controls: periodic hooks between dispatches    │ │
//! │  │     (observers, churn, cycle-driven execution)     │ │
//! │  └────────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────┘
//! ```

mod cycle;
mod engine;
mod error;
mod stats;

pub use cycle::CycleControl;
pub use engine::{Engine, EngineConfig, FinishReason, RunState};
pub use error::EngineError;
pub use stats::EngineStats;
