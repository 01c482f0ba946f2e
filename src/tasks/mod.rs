//! # Task descriptions.
//!
//! This module provides the task-related types:
//! - [`Task`] - typed description of a suspendable computation
//! - [`Resolver`] - continues a process suspended on a binding
//! - [`Cancel`] - cleanup thunk a binding registrar may return
//! - free-function combinators ([`chain`], [`map2`], [`sequence`], ...) and
//!   process-level tasks ([`spawn`], [`kill`], [`send`], [`self_process`])
//! - [`time`] - timer-backed tasks

pub(crate) mod node;
mod task;
pub mod time;

pub use task::{
    Cancel, Never, Resolver, Task, chain, fail, kill, map, map2, on_error, self_process, send,
    sequence, spawn, succeed,
};
