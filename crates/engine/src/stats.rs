//! Run statistics.

/// Counters collected during one engine run.
#[derive(Debug, Default, Clone)]
pub struct EngineStats {
    /// Events dispatched to a protocol handler.
    pub events_dispatched: u64,
    /// Events dropped because the target node had been removed.
    pub events_dropped_dead_node: u64,
    /// Events dropped because the target node was suspended.
    pub events_dropped_down_node: u64,
    /// Control rounds executed.
    pub control_rounds: u64,
}

impl EngineStats {
    /// Total events dropped without reaching a handler.
    pub fn events_dropped(&self) -> u64 {
        self.events_dropped_dead_node + self.events_dropped_down_node
    }
}
