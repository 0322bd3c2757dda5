//! Event queue with deterministic ordering.
//!
//! Pending events are kept in an ordered map keyed by
//! [`EventKey`] `(time, sequence)`: `pop` always yields the event with the
//! minimum key, and same-time events dispatch in strict insertion order.
//! The sequence number makes the total order independent of anything but
//! scheduling order, which is what makes fixed-seed runs bit-identical.
//!
//! Events address their target by [`NodeId`], never by registry index or
//! reference: a node removed before delivery simply makes the event a
//! no-op at dispatch time. Cancellation is likewise lazy and idempotent.

use crate::error::ScheduleError;
use crate::protocol::Payload;
use meshsim_types::{NodeId, ProtocolSlot, VirtualTime};
use std::collections::BTreeMap;

/// Ordering key for pending events.
///
/// Ordered by delivery time first, then by insertion sequence, giving
/// FIFO determinism for same-time events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventKey {
    /// Absolute virtual delivery time.
    pub time: VirtualTime,
    /// Strictly increasing insertion sequence.
    pub sequence: u64,
}

/// Handle to a pending event, usable for cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventHandle(EventKey);

/// A popped event, ready for dispatch.
pub struct ScheduledEvent {
    /// Delivery time; the clock advances to this value on dispatch.
    pub time: VirtualTime,
    /// Target node identity. Dispatch drops the event silently if the
    /// node has been removed since scheduling.
    pub target: NodeId,
    /// Target protocol slot.
    pub slot: ProtocolSlot,
    /// Opaque payload; `None` signals a timeout/self-alarm.
    pub payload: Option<Payload>,
}

struct Pending {
    target: NodeId,
    slot: ProtocolSlot,
    payload: Option<Payload>,
}

/// The sole authority on "what happens next".
#[derive(Default)]
pub struct EventQueue {
    queue: BTreeMap<EventKey, Pending>,
    sequence: u64,
    scheduled: u64,
    cancelled: u64,
}

impl EventQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule an event at absolute `time`.
    ///
    /// `now` is the current clock value; scheduling into the past fails
    /// with [`ScheduleError::InvalidTime`]. Returns a handle usable for
    /// cancellation.
    pub fn schedule(
        &mut self,
        now: VirtualTime,
        time: VirtualTime,
        target: NodeId,
        slot: ProtocolSlot,
        payload: Option<Payload>,
    ) -> Result<EventHandle, ScheduleError> {
        if time < now {
            return Err(ScheduleError::InvalidTime {
                requested: time,
                now,
            });
        }
        self.sequence += 1;
        let key = EventKey {
            time,
            sequence: self.sequence,
        };
        self.queue.insert(
            key,
            Pending {
                target,
                slot,
                payload,
            },
        );
        self.scheduled += 1;
        Ok(EventHandle(key))
    }

    /// Cancel a pending event.
    ///
    /// Returns `true` if the event was still pending. Cancelling an event
    /// that already fired or was already cancelled is a no-op, never an
    /// error.
    pub fn cancel(&mut self, handle: EventHandle) -> bool {
        let removed = self.queue.remove(&handle.0).is_some();
        if removed {
            self.cancelled += 1;
        }
        removed
    }

    /// Remove and return the minimum-key event.
    pub fn pop(&mut self) -> Option<ScheduledEvent> {
        self.queue.pop_first().map(|(key, pending)| ScheduledEvent {
            time: key.time,
            target: pending.target,
            slot: pending.slot,
            payload: pending.payload,
        })
    }

    /// Delivery time of the next event, if any.
    pub fn peek_time(&self) -> Option<VirtualTime> {
        self.queue.keys().next().map(|key| key.time)
    }

    /// Number of pending events.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Whether no events are pending.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Total events ever scheduled.
    pub fn scheduled_total(&self) -> u64 {
        self.scheduled
    }

    /// Total events cancelled while still pending.
    pub fn cancelled_total(&self) -> u64 {
        self.cancelled
    }
}

impl std::fmt::Debug for EventQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventQueue")
            .field("pending", &self.queue.len())
            .field("scheduled", &self.scheduled)
            .field("cancelled", &self.cancelled)
            .finish()
    }
}
