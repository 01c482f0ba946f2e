//! # effectvisor
//!
//! **Effectvisor** is a cooperative effect-execution runtime for Rust.
//!
//! Application code stays pure: `update` and `subscriptions` only *describe*
//! side effects as [`Cmd`] and [`Sub`] values. The runtime routes those
//! descriptions to effect managers, each running as a lightweight process on a
//! single-threaded scheduler, and feeds the messages they produce back into
//! `update`.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!            dispatch(msg)
//!                 │
//! ┌───────────────▼──────────────────────────────────────────────────┐
//! │  Program                                                         │
//! │  - model (RefCell)                                               │
//! │  - update(msg, &model) ─► (model', Cmd)                          │
//! │  - subscriptions(&model') ─► Sub                                 │
//! │  - observers                                                     │
//! └───────────────┬──────────────────────────────────────────────────┘
//!                 ▼ dispatch_effects(cmd, sub)
//! ┌──────────────────────────────────────────────────────────────────┐
//! │  Runtime: gather ─► { ManagerId ─► Effects }                     │
//! └──────┬──────────────────────┬───────────────────────┬────────────┘
//!        ▼                      ▼                       ▼
//!  ┌────────────┐         ┌────────────┐          ┌────────────┐
//!  │ "task"     │         │ "ports"    │          │ custom ... │   one process each,
//!  │ process    │         │ process    │          │ process    │   one delivery per cycle
//!  └─────┬──────┘         └─────┬──────┘          └─────┬──────┘
//!        │ spawn/kill children  │ send_to_app           │ send_to_self
//!        ▼                      ▼                       ▼
//! ┌──────────────────────────────────────────────────────────────────┐
//! │  Scheduler: run queue, process table, step budget                │
//! │  publishes ─► Bus ─► SubscriberSet ─► Subscribe::on_event        │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ### Process step loop
//! ```text
//! loop {
//!   ├─► Succeed(v) ─► pop frames to the nearest Chain  ─► none left: process done
//!   ├─► Fail(e)    ─► pop frames to the nearest OnError ─► none left: ProcessFailed
//!   ├─► Chain / OnError ─► push frame, continue with the inner task
//!   ├─► Binding(reg) ─► reg(resume) ─► suspended until resume (cancel kept for kill)
//!   ├─► Receive(h)   ─► mailbox empty: park; else h(oldest message)
//!   └─► budget spent ─► re-queue at the back, hand the queue to the Host
//! }
//! ```
//!
//! ## Features
//! | Area              | Description                                                    | Key types / traits                          |
//! |-------------------|----------------------------------------------------------------|---------------------------------------------|
//! | **Tasks**         | Lazy, composable effect descriptions.                          | [`Task`], [`Resolver`], [`tasks`]           |
//! | **Scheduling**    | Processes, mailboxes, step budget, host integration.           | [`Scheduler`], [`Host`], [`TokioHost`]      |
//! | **Effects**       | Composable bags of commands and subscriptions.                 | [`Cmd`], [`Sub`], [`Message`]               |
//! | **Managers**      | Pluggable interpreters for effect bags.                        | [`Manager`], [`Router`], [`Registry`]       |
//! | **Program**       | Model/update/subscriptions driver with observers and ports.    | [`Program`], [`ProgramBuilder`], [`Ports`]  |
//! | **Subscriber API**| Runtime events for logging and metrics.                        | [`Subscribe`], [`Event`], [`EventKind`]     |
//! | **Errors**        | Engine failures and runtime misuse.                            | [`ProcessError`], [`RuntimeError`]          |
//! | **Configuration** | Step budget and bus capacity.                                  | [`Config`]                                  |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use effectvisor::{Cmd, Program, ports};
//!
//! #[derive(Clone)]
//! enum Msg {
//!     Add(u32),
//!     Report,
//! }
//!
//! let program = Program::construct(
//!     (0_u32, Cmd::none()),
//!     |msg: Msg, total: &u32| match msg {
//!         Msg::Add(n) => (total + n, Cmd::none()),
//!         Msg::Report => (*total, ports::outgoing("total", *total)),
//!     },
//!     |_| ports::incoming("add", |n: &u32| Msg::Add(*n)),
//! );
//!
//! let ports = program.ports().expect("ports manager is registered by default");
//! let _report = ports.subscribe("total", |total: &u32| println!("total = {total}"));
//!
//! ports.send("add", 5_u32);
//! program.dispatch(Msg::Add(2));
//! program.dispatch(Msg::Report);
//! assert_eq!(program.model(), 7);
//! ```

mod config;
mod core;
mod effects;
mod error;
mod events;
mod managers;
mod subscribers;
pub mod tasks;

// ---- Public re-exports ----

pub use config::Config;
pub use core::{
    Drain, Host, ProcessId, Program, ProgramBuilder, Runtime, Scheduler, TokioHost, Unsubscribe,
};
pub use effects::{Cmd, Command, EffectBag, EffectKind, Message, Sub, Subscription, Tagger};
pub use error::{ProcessError, RuntimeError};
pub use events::{Bus, Event, EventKind};
pub use managers::{
    Manager, ManagerId, ManagerKey, PortSubscription, Ports, PortsManager, Registry, Router,
    TaskManager, attempt, perform, ports,
};
pub use subscribers::{Subscribe, SubscriberSet};
pub use tasks::{Cancel, Never, Resolver, Task};

// Optional: expose a simple built-in logger subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
