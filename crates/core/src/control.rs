//! Control hooks.

use crate::context::ControlContext;
use crate::error::HandlerError;

/// A periodic callback interleaved with event dispatch.
///
/// Controls run at fixed virtual-time intervals, in a fixed
/// configuration-defined order, and are the only plugin code allowed to
/// mutate the node population. Typical uses: observers that sample
/// protocol state, churn generators that add and remove nodes, and the
/// round-robin driver for cycle-driven protocols.
pub trait Control {
    /// Run one execution of this control.
    ///
    /// Returning `Ok(true)` requests that the run stop; the engine
    /// finishes the current control round first, so all controls in the
    /// round still observe consistent state.
    ///
    /// Errors abort the run.
    fn execute(&mut self, ctx: &mut ControlContext<'_>) -> Result<bool, HandlerError>;
}
