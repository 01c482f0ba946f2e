//! # Example: counter
//!
//! A counter driven entirely through commands.
//!
//! Demonstrates how to:
//! - Build a [`Program`] on a tokio `LocalSet` with [`TokioHost`].
//! - Describe delayed work with [`perform`] and fallible work with [`attempt`].
//! - Watch the model with [`Program::subscribe`].
//!
//! ## Flow
//! ```text
//! construct(0, batch[perform(Tick after 50ms), attempt(parse "12")])
//!     ├─► "task" manager spawns one child per command
//!     ├─► attempt resolves now  ─► update(Parsed(Ok(12)))
//!     └─► timer fires at 50ms   ─► update(Tick) ─► schedules the next Tick
//! stop after 5 ticks
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example counter
//! ```

use std::time::Duration;

use effectvisor::tasks::time;
use effectvisor::{Cmd, Config, ProgramBuilder, Sub, Task, TokioHost, attempt, perform};

#[derive(Debug)]
enum Msg {
    Tick,
    Parsed(Result<u32, String>),
}

#[derive(Clone, Debug, Default)]
struct Model {
    ticks: u32,
    parsed: Option<u32>,
}

const TICKS: u32 = 5;

fn tick_later() -> Cmd<Msg> {
    perform(|()| Msg::Tick, time::sleep(Duration::from_millis(50)))
}

fn parse(raw: &'static str) -> Cmd<Msg> {
    let task = Task::from_fn(move || raw.parse::<u32>().map_err(|e| e.to_string()));
    attempt(Msg::Parsed, task)
}

fn update(msg: Msg, model: &Model) -> (Model, Cmd<Msg>) {
    match msg {
        Msg::Tick => {
            let ticks = model.ticks + 1;
            let next = if ticks < TICKS { tick_later() } else { Cmd::none() };
            (Model { ticks, ..model.clone() }, next)
        }
        Msg::Parsed(Ok(n)) => (Model { parsed: Some(n), ..model.clone() }, Cmd::none()),
        Msg::Parsed(Err(e)) => {
            println!("[counter] parse failed: {e}");
            (model.clone(), Cmd::none())
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let local = tokio::task::LocalSet::new();
    local
        .run_until(async {
            let program = ProgramBuilder::new(Config::default()).with_host(TokioHost).build(
                (Model::default(), Cmd::batch([tick_later(), parse("12"), parse("twelve")])),
                update,
                |_| Sub::none(),
            );
            let _watch = program.subscribe(|m: &Model| println!("[counter] {m:?}"));

            while program.with_model(|m| m.ticks) < TICKS {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
            anyhow::ensure!(program.model().parsed == Some(12), "parse result missing");
            println!("[counter] done after {TICKS} ticks");
            Ok(())
        })
        .await
}
