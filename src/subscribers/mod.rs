//! # Event subscribers for the effectvisor runtime.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`] fan-out
//! and an optional built-in printer for events broadcast through the
//! [`Bus`](crate::events::Bus).
//!
//! ## Architecture
//! ```text
//! Event flow:
//!   Scheduler / Runtime / managers ── publish(Event) ──► Bus
//!                                                         │
//!                         subscriber listener (spawned by ProgramBuilder)
//!                                                         │
//!                                                         ▼
//!                                                  SubscriberSet::emit
//!                                     ┌──────────────┬────┴─────────┐
//!                                     ▼              ▼              ▼
//!                                 LogWriter       Metrics        Custom ...
//! ```
//!
//! ## Implementing custom subscribers
//! ```no_run
//! use effectvisor::{Event, EventKind, Subscribe};
//! use async_trait::async_trait;
//!
//! struct CrashCounter;
//!
//! #[async_trait]
//! impl Subscribe for CrashCounter {
//!     async fn on_event(&self, event: &Event) {
//!         if event.kind == EventKind::ProcessCrashed {
//!             // increment a counter
//!         }
//!     }
//! }
//! ```

#[cfg(feature = "logging")]
mod embedded;
mod subscriber;
mod subscriber_set;

#[cfg(feature = "logging")]
pub use embedded::LogWriter;
pub use subscriber::Subscribe;
pub use subscriber_set::SubscriberSet;
