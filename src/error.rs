//! Error types used by the effectvisor runtime.
//!
//! Task-level failures are **not** represented here: they are ordinary values
//! of the task's own error type `E`, routed through `on_error` frames.
//! This module only covers failures outside that modeled channel:
//!
//! - [`ProcessError`]: an engine failure fatal to one process (a panicking
//!   callback, a value or message of an unexpected type).
//! - [`RuntimeError`]: misuse of the runtime surface itself (e.g. registering
//!   the same manager twice).
//!
//! Both types provide helper methods (`as_label`, `as_message`) for logging/metrics.

use thiserror::Error;

/// # Engine failures of a single process.
///
/// A process that hits one of these is removed from the scheduler; the run
/// queue and every other process keep going. There is no automatic retry.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProcessError {
    /// A user callback panicked while the process was being stepped.
    #[error("{stage} panicked: {info}")]
    Panicked {
        /// Which kind of callback panicked (`continuation`, `binding`, `receive`).
        stage: &'static str,
        /// Panic payload rendered as text.
        info: String,
    },

    /// A continuation received a value of a different type than it was built for.
    #[error("continuation expected a value of type {expected}")]
    UnexpectedValue {
        /// Type name the continuation expected.
        expected: &'static str,
    },

    /// A `receive` handler dequeued a message of a different type.
    #[error("receive expected a message of type {expected}")]
    UnexpectedMessage {
        /// Type name the handler expected.
        expected: &'static str,
    },
}

impl ProcessError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use effectvisor::ProcessError;
    ///
    /// let err = ProcessError::UnexpectedMessage { expected: "u32" };
    /// assert_eq!(err.as_label(), "process_unexpected_message");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ProcessError::Panicked { .. } => "process_panicked",
            ProcessError::UnexpectedValue { .. } => "process_unexpected_value",
            ProcessError::UnexpectedMessage { .. } => "process_unexpected_message",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            ProcessError::Panicked { stage, info } => format!("panic in {stage}: {info}"),
            ProcessError::UnexpectedValue { expected } => {
                format!("value type mismatch; expected={expected}")
            }
            ProcessError::UnexpectedMessage { expected } => {
                format!("message type mismatch; expected={expected}")
            }
        }
    }
}

/// # Errors produced by the runtime surface.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    /// A manager of this type is already present in the registry.
    #[error("manager {name} is already registered")]
    DuplicateManager {
        /// Name of the manager type.
        name: &'static str,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use effectvisor::RuntimeError;
    ///
    /// let err = RuntimeError::DuplicateManager { name: "ports" };
    /// assert_eq!(err.as_label(), "runtime_duplicate_manager");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::DuplicateManager { .. } => "runtime_duplicate_manager",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            RuntimeError::DuplicateManager { name } => {
                format!("duplicate manager registration; manager={name}")
            }
        }
    }
}

/// Renders a caught panic payload as text.
pub(crate) fn panic_info(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
