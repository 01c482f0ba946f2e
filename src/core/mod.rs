//! Runtime core: scheduling, effect routing and the program loop.
//!
//! Public API from this module:
//! - [`Scheduler`]: run queue, process table and the task tree interpreter;
//! - [`Runtime`]: one process per registered manager, per-cycle effect delivery;
//! - [`Program`] / [`ProgramBuilder`]: the model/update/subscriptions loop;
//! - [`Host`] / [`TokioHost`]: where yielded drains resume.
//!
//! Internal modules:
//! - [`process`]: the per-process record (root, control stack, mailbox, cancel thunk);
//! - [`scheduler`]: stepping and draining;
//! - [`runtime`]: manager processes and `dispatch_effects`;
//! - [`program`]: dispatch, observers and the ports handle.

mod host;
mod process;
mod program;
mod runtime;
mod scheduler;

pub use host::{Host, TokioHost};
pub use process::ProcessId;
pub use program::{Program, ProgramBuilder, Unsubscribe};
pub use runtime::Runtime;
pub use scheduler::{Drain, Scheduler};

pub(crate) use scheduler::Resume;
