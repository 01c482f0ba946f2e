//! # Timer tasks.
//!
//! Bindings backed by the tokio timer. Both must be stepped from within a
//! [`tokio::task::LocalSet`] (the program's host loop).
//!
//! Killing a process that sleeps aborts the timer.

use std::time::{Duration, SystemTime};

use crate::tasks::{Cancel, Resolver, Task};

/// Succeeds with `()` after `duration`.
pub fn sleep<E: 'static>(duration: Duration) -> Task<E, ()> {
    Task::binding(move |resolver: Resolver<E, ()>| {
        let timer = tokio::task::spawn_local(async move {
            tokio::time::sleep(duration).await;
            resolver.succeed(());
        });
        Some(Cancel::new(move || timer.abort()))
    })
}

/// Succeeds with the current wall-clock time.
pub fn now<E: 'static>() -> Task<E, SystemTime> {
    Task::from_fn(|| Ok(SystemTime::now()))
}
