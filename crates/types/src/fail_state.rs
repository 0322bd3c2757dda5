//! Node liveness states.

/// Liveness state of a simulated node.
///
/// Transitions are driven by control hooks, never by the engine itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum FailState {
    /// The node is alive and receives events.
    #[default]
    Up,

    /// The node is temporarily suspended. It remains in the registry but
    /// liveness-checking dispatch skips it: events addressed to it are
    /// dropped silently while it stays down.
    Down,

    /// The node is permanently destroyed. Dead nodes are removed from the
    /// registry; pending events addressed to them become silent no-ops.
    Dead,
}

impl FailState {
    /// Whether a node in this state participates in dispatch.
    pub fn is_up(self) -> bool {
        matches!(self, FailState::Up)
    }
}
