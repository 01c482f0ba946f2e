//! Runtime events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to runtime events emitted by the scheduler, the runtime,
//! managers and subscriber workers.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Scheduler` (process lifecycle), `Runtime` (manager startup,
//!   effect delivery), built-in managers (rejected port values), `Program`
//!   (rejected app messages), `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: the subscriber listener spawned by `ProgramBuilder` (fans out
//!   to `SubscriberSet`) and any receiver obtained from [`Bus::subscribe`].

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
