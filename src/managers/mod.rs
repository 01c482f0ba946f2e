//! Effect managers: the processes that interpret commands and subscriptions.
//!
//! ## Contents
//! - [`Manager`] trait and [`Router`] (manager → application / manager → itself)
//! - [`Registry`] of the managers one program runs ([`ManagerId`], [`ManagerKey`])
//! - built-in [`TaskManager`] ([`perform`], [`attempt`])
//! - built-in ports manager ([`ports::outgoing`], [`ports::incoming`], [`Ports`])

mod manager;
pub mod ports;
mod registry;
mod task_manager;

pub use manager::{Manager, Router};
pub use ports::{PortSubscription, Ports, PortsManager};
pub use registry::{ManagerId, ManagerKey, Registry};
pub use task_manager::{TaskManager, attempt, perform};

pub(crate) use manager::AppSink;
