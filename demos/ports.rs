//! # Example: ports
//!
//! Talking to a program from host code through named ports, with runtime
//! events printed by the built-in [`LogWriter`].
//!
//! Demonstrates how to:
//! - Listen to an outgoing port with [`Ports::subscribe`].
//! - Feed an incoming port with [`Ports::send`].
//! - Drop a subscription from `subscriptions` and watch the port reject input.
//!
//! ## Flow
//! ```text
//! host ──send("orders", n)──► ports manager ──► update(Order(n))
//!                                                 └─► outgoing("receipts", total)
//! host ◄──subscribe("receipts")── ports manager ◄──┘
//!
//! total >= LIMIT ─► subscriptions drop "orders" ─► further sends: MessageRejected
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example ports --features logging
//! ```

use std::sync::Arc;
use std::time::Duration;

use effectvisor::{Cmd, Config, LogWriter, ProgramBuilder, Sub, Subscribe, ports};

const LIMIT: u32 = 10;

enum Msg {
    Order(u32),
}

fn update(msg: Msg, total: &u32) -> (u32, Cmd<Msg>) {
    match msg {
        Msg::Order(n) => {
            let total = total + n;
            (total, ports::outgoing("receipts", total))
        }
    }
}

fn subscriptions(total: &u32) -> Sub<Msg> {
    if *total < LIMIT {
        ports::incoming("orders", |n: &u32| Msg::Order(*n))
    } else {
        Sub::none()
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::default())];
    let program = ProgramBuilder::new(Config::default())
        .with_subscribers(subs)
        .build((0_u32, Cmd::none()), update, subscriptions);

    let ports = program
        .ports()
        .ok_or_else(|| anyhow::anyhow!("ports manager not registered"))?;
    let receipts = ports.subscribe("receipts", |total: &u32| {
        println!("[host] receipt: total={total}")
    });

    for n in [3_u32, 4, 5, 6] {
        ports.send("orders", n);
    }
    receipts.unsubscribe();

    // Let the log writer catch up.
    tokio::time::sleep(Duration::from_millis(50)).await;
    println!("[host] final total={}", program.model());
    Ok(())
}
