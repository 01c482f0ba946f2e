//! # Host loop integration.
//!
//! The scheduler never blocks and never sleeps. When a drain spends its step
//! budget it hands the rest of the run queue to a [`Host`], which decides when
//! to resume draining (the equivalent of "post a job to the event loop").
//!
//! - [`TokioHost`] resumes on the current tokio `LocalSet` after a `yield_now`.
//! - No host, drain until idle
//!   ([`Scheduler::set_drain_until_idle`](crate::Scheduler::set_drain_until_idle)):
//!   the next budget slice starts right away. Programs built without a host run this way.
//! - No host at all: the remaining work stays queued until someone calls
//!   [`Scheduler::run_pending`](crate::Scheduler::run_pending). Tests use this to
//!   single-step the scheduler deterministically.

/// Receives deferred work from the scheduler.
pub trait Host {
    /// Runs `job` later, after the host had a chance to process other work.
    fn defer(&self, job: Box<dyn FnOnce()>);
}

/// Host backed by the tokio `LocalSet` the program runs on.
///
/// `defer` must be called from within a [`tokio::task::LocalSet`]; this holds for
/// every drain started by a timer or by application code running on that set.
#[derive(Clone, Copy, Debug, Default)]
pub struct TokioHost;

impl Host for TokioHost {
    fn defer(&self, job: Box<dyn FnOnce()>) {
        tokio::task::spawn_local(async move {
            tokio::task::yield_now().await;
            job();
        });
    }
}
