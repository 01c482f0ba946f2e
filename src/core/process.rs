//! # Process record.
//!
//! A [`Process`] is a scheduler-owned execution context: the current root node,
//! the control stack of pending continuations, a FIFO mailbox and the cancel
//! thunk of the binding it is suspended on (if any).
//!
//! ## Lifecycle
//! ```text
//! spawn ──► Runnable ──step──┬─► Runnable (budget spent, re-queued)
//!              ▲             ├─► Suspended{epoch} ──resolve──► Runnable
//!              │             ├─► Parked (receive, empty mailbox) ──send──► Runnable
//!              │             └─► removed (completed / failed / crashed)
//!              └── kill at any point ──► removed, cancel thunk invoked
//! ```
//!
//! ## Rules
//! - A process has at most one live root.
//! - Root, stack and mailbox are mutated only while the process is stepped,
//!   or by the scheduler on its behalf (send, resolve, kill).
//! - Removed processes are gone: later sends/kills/resolves are no-ops.

use std::collections::VecDeque;
use std::fmt;

use crate::tasks::Cancel;
use crate::tasks::node::{Cont, Frame, FrameKind, Node, Value};

/// Stable identifier of a process within one scheduler.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProcessId(pub(crate) u64);

impl ProcessId {
    /// Raw numeric id.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.0)
    }
}

/// Scheduling state of a live process.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Status {
    /// Has a root and is queued or currently being stepped.
    Runnable,
    /// Waiting on a binding; only a resolver carrying `epoch` may continue it.
    Suspended { epoch: u64 },
    /// Root is a `Receive` node and the mailbox was empty.
    Parked,
}

/// Stack of pending continuations.
///
/// Frames are pushed when the interpreter enters a `Chain`/`OnError` node and
/// popped when an outcome passes through. Frames of the non-matching kind are
/// discarded on the way ("lifted").
#[derive(Default)]
pub(crate) struct ControlStack {
    frames: Vec<Frame>,
}

impl ControlStack {
    pub(crate) fn push(&mut self, kind: FrameKind, cont: Cont) {
        self.frames.push(Frame { kind, cont });
    }

    /// Pops frames until one of `kind` is found and returns its continuation.
    ///
    /// Returns `None` when the stack runs dry; the outcome is then final.
    pub(crate) fn unwind(&mut self, kind: FrameKind) -> Option<Cont> {
        while let Some(frame) = self.frames.pop() {
            if frame.kind == kind {
                return Some(frame.cont);
            }
        }
        None
    }

    #[cfg(test)]
    pub(crate) fn depth(&self) -> usize {
        self.frames.len()
    }
}

/// Scheduler-owned execution context.
pub(crate) struct Process {
    pub(crate) root: Option<Node>,
    pub(crate) stack: ControlStack,
    pub(crate) mailbox: VecDeque<Value>,
    pub(crate) cancel: Option<Cancel>,
    pub(crate) status: Status,
    /// Whether the id currently sits in the run queue.
    pub(crate) queued: bool,
}

impl Process {
    pub(crate) fn new(root: Node) -> Self {
        Self {
            root: Some(root),
            stack: ControlStack::default(),
            mailbox: VecDeque::new(),
            cancel: None,
            status: Status::Runnable,
            queued: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::node::take;

    fn tagged(tag: u32) -> Cont {
        Box::new(move |_| Ok(Node::Succeed(Box::new(tag))))
    }

    fn tag_of(cont: Cont) -> u32 {
        match cont(Box::new(())) {
            Ok(Node::Succeed(v)) => take::<u32>(v).unwrap(),
            _ => panic!("unexpected node"),
        }
    }

    #[test]
    fn unwind_discards_non_matching_frames() {
        let mut stack = ControlStack::default();
        stack.push(FrameKind::Chain, tagged(1));
        stack.push(FrameKind::OnError, tagged(2));
        stack.push(FrameKind::OnError, tagged(3));

        let cont = stack.unwind(FrameKind::Chain).unwrap();
        assert_eq!(tag_of(cont), 1);
        assert_eq!(stack.depth(), 0);
    }

    #[test]
    fn unwind_on_empty_stack_is_final() {
        let mut stack = ControlStack::default();
        stack.push(FrameKind::Chain, tagged(1));
        assert!(stack.unwind(FrameKind::OnError).is_none());
        assert_eq!(stack.depth(), 0);
    }

    #[test]
    fn display_wraps_id() {
        assert_eq!(ProcessId(7).to_string(), "<7>");
        assert_eq!(ProcessId(7).as_u64(), 7);
    }
}
