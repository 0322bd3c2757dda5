//! The scheduler/dispatcher.
//!
//! The engine owns the virtual clock, the event queue, the node registry
//! and the registered controls, and advances them on a single logical
//! thread: pop the next-due event, advance the clock to its time, locate
//! the target node and protocol, invoke the handler. Control rounds fire
//! whenever the clock is about to pass a period boundary.
//!
//! Determinism: with a fixed seed and configuration, two runs produce an
//! identical sequence of `(time, node, slot)` dispatches. All tie-breaks
//! are by insertion sequence; all randomness flows through one seeded rng.

use crate::error::EngineError;
use crate::stats::EngineStats;
use meshsim_core::{
    ConfigError, Control, ControlContext, EventHandle, EventQueue, Network, Payload,
    PrototypeRegistry, ScheduleError, SimContext,
};
use meshsim_types::{NodeId, ProtocolSlot, VirtualTime};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::rc::Rc;
use tracing::{debug, info, trace, warn};

/// Engine configuration.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// Seed for the engine's randomness source. Fixing this fixes the
    /// entire dispatch sequence.
    pub seed: u64,
    /// Maximum virtual time. When the next event or control round would
    /// pass this, the run finishes with [`FinishReason::EndTime`]. With
    /// no end time, the run lasts until the queue drains.
    pub end_time: Option<VirtualTime>,
}

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    /// No events remained and no control round was still due.
    EmptyQueue,
    /// The configured end time was reached.
    EndTime,
    /// A control requested the stop.
    ControlRequested,
}

/// Lifecycle of one engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Created; population and schedule may still be set up.
    Initializing,
    /// Inside `run_to_completion`.
    Running,
    /// The run ended normally.
    Finished(FinishReason),
    /// The run was aborted by an error.
    Failed,
}

struct ControlEntry {
    name: String,
    control: Box<dyn Control>,
    period: VirtualTime,
    order: u32,
    next_due: VirtualTime,
}

enum Step {
    Event,
    Controls(VirtualTime),
}

/// The discrete-event simulation engine.
///
/// One engine drives exactly one run; terminal states never transition
/// further. No state is shared between engines, so independent
/// simulations can coexist in one process.
pub struct Engine {
    config: EngineConfig,
    prototypes: PrototypeRegistry,
    network: Network,
    queue: EventQueue,
    now: VirtualTime,
    rng: ChaCha8Rng,
    controls: Vec<ControlEntry>,
    state: RunState,
    stats: EngineStats,
}

impl Engine {
    /// Create an engine over the given prototype registry.
    pub fn new(config: EngineConfig, prototypes: PrototypeRegistry) -> Self {
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        Self {
            config,
            prototypes,
            network: Network::new(),
            queue: EventQueue::new(),
            now: 0,
            rng,
            controls: Vec::new(),
            state: RunState::Initializing,
            stats: EngineStats::default(),
        }
    }

    /// Create `count` nodes from the prototype registry.
    ///
    /// Fails before any node is created if a slot has no prototype.
    pub fn populate(&mut self, count: usize) -> Result<(), ConfigError> {
        for _ in 0..count {
            let protocols = self.prototypes.instantiate_all()?;
            self.network.add(protocols);
        }
        info!(
            nodes = self.network.len(),
            slots = self.prototypes.slots(),
            "Created simulation population"
        );
        Ok(())
    }

    /// Register a periodic control.
    ///
    /// `period` is the execution interval in virtual time units (the
    /// first round fires at `period`); `order` fixes the position within
    /// a round, ascending. Registration order breaks order ties.
    pub fn register_control(
        &mut self,
        name: impl Into<String>,
        control: Box<dyn Control>,
        period: VirtualTime,
        order: u32,
    ) -> Result<(), ConfigError> {
        if period == 0 {
            return Err(ConfigError::InvalidPeriod);
        }
        self.controls.push(ControlEntry {
            name: name.into(),
            control,
            period,
            order,
            next_due: period,
        });
        // Stable sort: equal orders keep registration order.
        self.controls.sort_by_key(|entry| entry.order);
        Ok(())
    }

    /// Schedule an event at absolute `time`.
    pub fn schedule_at(
        &mut self,
        time: VirtualTime,
        target: NodeId,
        slot: ProtocolSlot,
        payload: Option<Payload>,
    ) -> Result<EventHandle, ScheduleError> {
        let slots = self.prototypes.slots();
        if slot.0 >= slots {
            return Err(ScheduleError::SlotOutOfRange {
                slot: slot.0,
                slots,
            });
        }
        self.queue.schedule(self.now, time, target, slot, payload)
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

    /// Cancel a pending event. Idempotent; returns whether it was pending.
    pub fn cancel(&mut self, handle: EventHandle) -> bool {
        self.queue.cancel(handle)
    }

    /// Current virtual time.
    pub fn now(&self) -> VirtualTime {
        self.now
    }

    /// Number of nodes currently in the network.
    pub fn network_size(&self) -> usize {
        self.network.len()
    }

    /// Read access to the node registry.
    pub fn network(&self) -> &Network {
        &self.network
    }

    /// Mutable access to the node registry, for setup and inspection
    /// between runs of plugin code.
    pub fn network_mut(&mut self) -> &mut Network {
        &mut self.network
    }

    /// Run statistics so far.
    pub fn stats(&self) -> &EngineStats {
        &self.stats
    }

    /// Pending events in the queue.
    pub fn pending_events(&self) -> usize {
        self.queue.len()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> RunState {
        self.state
    }

    /// Drive the simulation until a termination condition is met.
    ///
    /// Terminates when the queue drains, when the configured end time is
    /// reached, or when a control requests a stop. Handler and control
    /// errors, as well as internal invariant violations, abort the run.
    pub fn run_to_completion(&mut self) -> Result<FinishReason, EngineError> {
        if matches!(self.state, RunState::Finished(_) | RunState::Failed) {
            return Err(EngineError::AlreadyFinished);
        }
        self.state = RunState::Running;

        let result = self.run_loop();
        match &result {
            Ok(reason) => {
                self.state = RunState::Finished(*reason);
                info!(
                    reason = ?reason,
                    time = self.now,
                    events_dispatched = self.stats.events_dispatched,
                    events_dropped = self.stats.events_dropped(),
                    control_rounds = self.stats.control_rounds,
                    "Simulation finished"
                );
            }
            Err(err) => {
                self.state = RunState::Failed;
                warn!(time = self.now, error = %err, "Simulation aborted");
            }
        }
        result
    }

    fn run_loop(&mut self) -> Result<FinishReason, EngineError> {
        loop {
            let next_event = self.queue.peek_time();
            let next_round = self.controls.iter().map(|c| c.next_due).min();

            let step = match (next_event, next_round) {
                (None, None) => return Ok(FinishReason::EmptyQueue),
                (Some(_), None) => Step::Event,
                (Some(te), Some(tc)) if te <= tc => Step::Event,
                (Some(_), Some(tc)) => Step::Controls(tc),
                (None, Some(tc)) => {
                    // With nothing left in the queue, periodic controls
                    // keep the clock moving only inside a bounded run.
                    if self.config.end_time.is_some() {
                        Step::Controls(tc)
                    } else {
                        debug!(time = self.now, "Queue drained, no bound set");
                        return Ok(FinishReason::EmptyQueue);
                    }
                }
            };

            if let Some(end) = self.config.end_time {
                let next_time = match &step {
                    Step::Event => next_event.unwrap_or(end),
                    Step::Controls(tc) => *tc,
                };
                if next_time > end {
                    debug!(
                        time = self.now,
                        end_time = end,
                        remaining_events = self.queue.len(),
                        "End time reached"
                    );
                    return Ok(FinishReason::EndTime);
                }
            }

            match step {
                Step::Event => self.dispatch_next()?,
                Step::Controls(tc) => {
                    if self.run_control_round(tc)? {
                        return Ok(FinishReason::ControlRequested);
                    }
                }
            }
        }
    }

    /// Pop and dispatch the next event.
    fn dispatch_next(&mut self) -> Result<(), EngineError> {
        let Some(event) = self.queue.pop() else {
            return Ok(());
        };
        if event.time < self.now {
            return Err(EngineError::ClockRegression {
                event_time: event.time,
                now: self.now,
            });
        }
        self.now = event.time;

        // Identity lookup: the node may have been removed since the event
        // was scheduled. That is the documented consequence of lazy
        // cancellation, not an error.
        let Some(index) = self.network.index_of(event.target) else {
            self.stats.events_dropped_dead_node += 1;
            trace!(time = self.now, node = %event.target, "Event dropped: node removed");
            return Ok(());
        };
        let node = self.network.get(index)?;
        if !node.is_up() {
            self.stats.events_dropped_down_node += 1;
            trace!(time = self.now, node = %event.target, "Event dropped: node down");
            return Ok(());
        }

        let Some(cell) = node.protocol(event.slot) else {
            return Err(EngineError::ProtocolArrayMismatch {
                time: self.now,
                node: event.target,
                slot: event.slot,
            });
        };
        let cell = Rc::clone(cell);
        let mut protocol = cell.borrow_mut();
        let Some(handler) = protocol.as_event_handler() else {
            return Err(EngineError::CapabilityNotSupported {
                time: self.now,
                node: event.target,
                slot: event.slot,
            });
        };

        self.stats.events_dispatched += 1;
        trace!(time = self.now, node = %event.target, slot = %event.slot, "Dispatching event");

        let mut ctx = SimContext::new(
            self.now,
            self.prototypes.slots(),
            &mut self.queue,
            &self.network,
            &mut self.rng,
        );
        handler
            .process_event(&mut ctx, event.target, event.slot, event.payload)
            .map_err(|source| EngineError::Handler {
                time: self.now,
                node: event.target,
                slot: event.slot,
                source,
            })
    }

    /// Run all controls due at the period boundary `tc`, in ascending
    /// execution order. Returns whether any control requested a stop.
    ///
    /// A stop request does not short-circuit the round: every due control
    /// still runs, so side effects stay consistent across controls.
    fn run_control_round(&mut self, tc: VirtualTime) -> Result<bool, EngineError> {
        debug_assert!(tc >= self.now, "control rounds never move the clock back");
        self.now = tc;
        self.stats.control_rounds += 1;

        let mut stop = false;
        let mut failure = None;
        let mut controls = std::mem::take(&mut self.controls);
        for entry in controls.iter_mut() {
            if entry.next_due > tc {
                continue;
            }
            debug!(time = tc, control = %entry.name, "Executing control");
            let mut ctx = ControlContext::new(
                self.now,
                self.prototypes.slots(),
                &mut self.queue,
                &mut self.network,
                &self.prototypes,
                &mut self.rng,
            );
            match entry.control.execute(&mut ctx) {
                Ok(true) => {
                    debug!(time = tc, control = %entry.name, "Control requested stop");
                    stop = true;
                }
                Ok(false) => {}
                Err(source) => {
                    failure = Some(EngineError::Control {
                        time: tc,
                        name: entry.name.clone(),
                        source,
                    });
                }
            }
            entry.next_due += entry.period;
            if failure.is_some() {
                break;
            }
        }
        self.controls = controls;

        match failure {
            Some(err) => Err(err),
            None => Ok(stop),
        }
    }
}
