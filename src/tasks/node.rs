//! # Untyped task tree nodes.
//!
//! [`Node`] is the closed variant set the scheduler interprets. Payloads are
//! erased to [`Value`]; the typed facade ([`Task`](crate::Task)) erases on the
//! way in and downcasts inside continuations. Every closure is `FnOnce` and every
//! node is moved into the interpreter, so a node is consumed exactly once.
//!
//! ```text
//! Succeed(v) │ Fail(e)                    leaves
//! Chain(k, inner)                         k fires on inner's success
//! OnError(h, inner)                       h fires on inner's failure
//! Binding(registrar)                      the only true suspension point
//! Receive(handler)                        parks until the mailbox is non-empty
//! ```

use std::any::{Any, type_name};

use crate::core::Resume;
use crate::error::ProcessError;
use crate::tasks::task::Cancel;

/// Erased success value, failure value or mailbox message.
pub(crate) type Value = Box<dyn Any>;

/// Continuation, failure handler or receive handler.
///
/// Returns `Err` only for engine failures (type mismatch), never for task failures.
pub(crate) type Cont = Box<dyn FnOnce(Value) -> Result<Node, ProcessError>>;

/// Binding registrar: receives the resume capability, may return a cancel thunk.
pub(crate) type Registrar = Box<dyn FnOnce(Resume) -> Option<Cancel>>;

/// A node of a task tree.
pub(crate) enum Node {
    Succeed(Value),
    Fail(Value),
    Chain(Cont, Nested),
    OnError(Cont, Nested),
    Binding(Registrar),
    Receive(Cont),
}

/// Inner task of a `Chain`/`OnError` node.
///
/// Dropping a tree that never ran walks the nesting in a loop, so tree depth
/// does not turn into stack depth.
pub(crate) struct Nested(Box<Node>);

impl Nested {
    pub(crate) fn new(node: Node) -> Self {
        Self(Box::new(node))
    }

    /// Unwraps the inner task for stepping.
    pub(crate) fn into_node(mut self) -> Node {
        self.take()
    }

    fn take(&mut self) -> Node {
        std::mem::replace(&mut *self.0, Node::Succeed(Box::new(())))
    }
}

impl Drop for Nested {
    fn drop(&mut self) {
        let mut next = self.take();
        loop {
            let inner = match &mut next {
                Node::Chain(_, nested) | Node::OnError(_, nested) => nested.take(),
                _ => break,
            };
            next = inner;
        }
    }
}

/// Which outcome a control stack frame reacts to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum FrameKind {
    /// Fires on `Succeed`.
    Chain,
    /// Fires on `Fail`.
    OnError,
}

/// A pending continuation pushed when the interpreter entered a `Chain`/`OnError` node.
pub(crate) struct Frame {
    pub(crate) kind: FrameKind,
    pub(crate) cont: Cont,
}

/// Recovers a typed value from an erased one.
pub(crate) fn take<T: 'static>(value: Value) -> Result<T, ProcessError> {
    value
        .downcast::<T>()
        .map(|b| *b)
        .map_err(|_| ProcessError::UnexpectedValue {
            expected: type_name::<T>(),
        })
}

/// Recovers a typed mailbox message from an erased one.
pub(crate) fn take_message<M: 'static>(value: Value) -> Result<M, ProcessError> {
    value
        .downcast::<M>()
        .map(|b| *b)
        .map_err(|_| ProcessError::UnexpectedMessage {
            expected: type_name::<M>(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_recovers_matching_type() {
        assert_eq!(take::<u32>(Box::new(7_u32)), Ok(7));
    }

    #[test]
    fn take_reports_mismatch() {
        let err = take::<u32>(Box::new("seven")).unwrap_err();
        assert_eq!(err, ProcessError::UnexpectedValue { expected: "u32" });

        let err = take_message::<String>(Box::new(1_i8)).unwrap_err();
        assert_eq!(err.as_label(), "process_unexpected_message");
    }

    fn deep(depth: usize) -> Node {
        (0..depth).fold(Node::Succeed(Box::new(0_u32)), |inner, i| {
            let cont: Cont = Box::new(|v| Ok(Node::Succeed(v)));
            if i % 2 == 0 {
                Node::Chain(cont, Nested::new(inner))
            } else {
                Node::OnError(cont, Nested::new(inner))
            }
        })
    }

    #[test]
    fn dropping_deep_tree_does_not_recurse() {
        drop(deep(200_000));
    }

    #[test]
    fn nested_unwraps_inner_node() {
        match Nested::new(Node::Succeed(Box::new(5_u32))).into_node() {
            Node::Succeed(v) => assert_eq!(take::<u32>(v), Ok(5)),
            _ => panic!("unexpected node"),
        }
    }
}
