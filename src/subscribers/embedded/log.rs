//! # LogWriter: simple event printer
//!
//! A minimal subscriber that prints incoming [`Event`]s to stdout.
//! Use it for tests or demos.
//!
//! ## Example output
//! ```text
//! [manager-started] manager="task" process=<0>
//! [effects-dispatched] managers=2
//! [budget-exhausted] process=<4> budget=10000
//! [crashed] process=<5> reason="panic in continuation: boom"
//! [rejected] manager="ports" reason="port=clicks no subscribers"
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

fn pid(e: &Event) -> String {
    e.process.map(|p| p.to_string()).unwrap_or_else(|| "-".into())
}

fn manager(e: &Event) -> &str {
    e.manager.as_deref().unwrap_or("-")
}

fn reason(e: &Event) -> &str {
    e.reason.as_deref().unwrap_or("unknown")
}

fn count(e: &Event) -> u32 {
    e.count.unwrap_or_default()
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        match e.kind {
            EventKind::ProcessSpawned => println!("[spawned] process={}", pid(e)),
            EventKind::ProcessCompleted => println!("[completed] process={}", pid(e)),
            EventKind::ProcessFailed => println!("[failed] process={}", pid(e)),
            EventKind::ProcessCrashed => {
                println!("[crashed] process={} reason={:?}", pid(e), reason(e))
            }
            EventKind::ProcessKilled => println!("[killed] process={}", pid(e)),
            EventKind::StepBudgetExhausted => {
                println!("[budget-exhausted] process={} budget={}", pid(e), count(e))
            }
            EventKind::MessageDropped => println!("[dropped] process={}", pid(e)),
            EventKind::ManagerStarted => {
                println!("[manager-started] manager={:?} process={}", manager(e), pid(e))
            }
            EventKind::EffectsDispatched => println!("[effects-dispatched] managers={}", count(e)),
            EventKind::EffectUnrouted => println!("[unrouted] manager={:?}", manager(e)),
            EventKind::MessageRejected => {
                println!("[rejected] manager={:?} reason={:?}", manager(e), reason(e))
            }
            EventKind::SubscriberOverflow => {
                println!("[subscriber-overflow] subscriber={:?} reason={:?}", manager(e), reason(e))
            }
            EventKind::SubscriberPanicked => println!(
                "[subscriber-panicked] subscriber={} info={}",
                manager(e),
                reason(e),
            ),
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
