//! # Runtime events emitted by the scheduler, the runtime and managers.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Process events**: process lifecycle inside the scheduler
//! - **Runtime events**: manager startup and per-cycle effect delivery
//! - **Routing events**: messages and effects that could not be delivered
//! - **Subscriber events**: problems inside the observability fan-out
//!
//! The [`Event`] struct carries additional metadata such as timestamps, process id,
//! manager name and reasons.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use effectvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::ProcessCrashed)
//!     .with_manager("ports")
//!     .with_reason("boom");
//!
//! assert_eq!(ev.kind, EventKind::ProcessCrashed);
//! assert_eq!(ev.manager.as_deref(), Some("ports"));
//! assert_eq!(ev.reason.as_deref(), Some("boom"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

use crate::core::ProcessId;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Process events ===
    /// A process was spawned and queued for its first step.
    ///
    /// Sets: `process`
    ProcessSpawned,

    /// A process ran its control stack dry with a success.
    ///
    /// Sets: `process`
    ProcessCompleted,

    /// A process ran its control stack dry with a failure nobody handled.
    ///
    /// Sets: `process`
    ProcessFailed,

    /// A process died from an engine failure (panic, type mismatch).
    ///
    /// Sets: `process`, `reason`
    ProcessCrashed,

    /// A live process was killed; its pending cancel thunk (if any) ran.
    ///
    /// Sets: `process`
    ProcessKilled,

    /// A drain spent its step budget; the process was re-queued.
    ///
    /// Sets: `process`, `count` (budget that was spent)
    StepBudgetExhausted,

    /// A message was sent to a process that no longer exists.
    ///
    /// Sets: `process`
    MessageDropped,

    // === Runtime events ===
    /// A manager process was started by the runtime.
    ///
    /// Sets: `process`, `manager`
    ManagerStarted,

    /// An update cycle delivered effects to every manager.
    ///
    /// Sets: `count` (number of managers that received a delivery)
    EffectsDispatched,

    // === Routing events ===
    /// An effect addressed to an unregistered manager was skipped.
    ///
    /// Sets: `manager`
    EffectUnrouted,

    /// A message reached a consumer that could not accept it
    /// (wrong type, program gone, port without subscribers).
    ///
    /// Sets: `reason`, optionally `manager`
    MessageRejected,

    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets: `manager` (subscriber name), `reason` (panic info)
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets: `manager` (subscriber name), `reason`
    SubscriberOverflow,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Process the event concerns, if any.
    pub process: Option<ProcessId>,
    /// Manager (or subscriber) name, if applicable.
    pub manager: Option<Arc<str>>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
    /// Numeric detail (step budget, delivery count).
    pub count: Option<u32>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            process: None,
            manager: None,
            reason: None,
            count: None,
        }
    }

    /// Attaches a process id.
    #[inline]
    pub fn with_process(mut self, process: ProcessId) -> Self {
        self.process = Some(process);
        self
    }

    /// Attaches a manager or subscriber name.
    #[inline]
    pub fn with_manager(mut self, manager: impl Into<Arc<str>>) -> Self {
        self.manager = Some(manager.into());
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a count (saturates at `u32::MAX`).
    #[inline]
    pub fn with_count(mut self, n: usize) -> Self {
        self.count = Some(n.min(u32::MAX as usize) as u32);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_manager(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_manager(subscriber)
            .with_reason(info)
    }

    #[inline]
    pub fn is_subscriber_overflow(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberOverflow)
    }

    #[inline]
    pub fn is_subscriber_panic(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberPanicked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_numbers_increase() {
        let a = Event::new(EventKind::ProcessSpawned);
        let b = Event::new(EventKind::ProcessSpawned);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn count_saturates() {
        let ev = Event::new(EventKind::EffectsDispatched).with_count(usize::MAX);
        assert_eq!(ev.count, Some(u32::MAX));
    }

    #[test]
    fn subscriber_helpers_set_kind() {
        let ev = Event::subscriber_overflow("metrics", "full");
        assert!(ev.is_subscriber_overflow());
        assert_eq!(ev.manager.as_deref(), Some("metrics"));
        assert_eq!(ev.reason.as_deref(), Some("subscriber=metrics reason=full"));
        assert!(Event::subscriber_panicked("metrics", "oops".into()).is_subscriber_panic());
    }
}
