//! # Global runtime configuration.
//!
//! Provides [`Config`] centralized settings for a scheduler and the program driving it.
//!
//! Config is used in two ways:
//! 1. **Scheduler creation**: `Scheduler::new(config, bus)`
//! 2. **Program creation**: `ProgramBuilder::new(config)`
//!
//! ## Sentinel values
//! - `step_budget = 0` → clamped to 1 (a drain always makes progress)
//! - `bus_capacity = 0` → clamped to 1

/// Global configuration for the effect runtime.
///
/// ## Field semantics
/// - `step_budget`: interpreter steps one drain may execute before yielding to the host
/// - `bus_capacity`: event bus ring buffer size (min 1; clamped by Bus)
///
/// ## Notes
/// All fields are public for flexibility. Prefer using helper accessors to avoid
/// sprinkling sentinel checks (`0`) across the codebase.
#[derive(Clone, Debug)]
pub struct Config {
    /// Maximum number of interpreter steps per drain of the run queue.
    ///
    /// When a drain spends its budget, the running process is re-queued at the
    /// back and the rest of the queue is handed to the host. This bounds how long
    /// a purely synchronous chain can hold the host loop; it is never an error.
    pub step_budget: usize,

    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Slow subscribers that lag behind more than `bus_capacity` messages will
    /// receive `Lagged` and skip older items. Minimum value is 1 (enforced by Bus).
    pub bus_capacity: usize,
}

impl Config {
    /// Returns the step budget clamped to a minimum of 1.
    #[inline]
    pub fn step_budget_clamped(&self) -> usize {
        self.step_budget.max(1)
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    ///
    /// The `Bus` should use this value to avoid constructing an invalid channel.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `step_budget = 10_000`
    /// - `bus_capacity = 1024` (good baseline)
    fn default() -> Self {
        Self {
            step_budget: 10_000,
            bus_capacity: 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_values_are_clamped() {
        let cfg = Config {
            step_budget: 0,
            bus_capacity: 0,
        };
        assert_eq!(cfg.step_budget_clamped(), 1);
        assert_eq!(cfg.bus_capacity_clamped(), 1);
        assert_eq!(Config::default().step_budget_clamped(), 10_000);
    }
}
