//! # Built-in ports manager.
//!
//! Ports are named channels between the program and the host code embedding it.
//!
//! ```text
//! outgoing:  update ─► ports::outgoing("save", v) ─► on_effects ─► listeners of "save"
//!                                                                   (Ports::subscribe)
//! incoming:  Ports::send("clicks", v) ─► self-msg Inbound ─► on_self_msg
//!                 ─► tagger(v) for each subscription to "clicks" ─► send_to_app
//!            subscriptions(model) ─► ports::incoming("clicks", tagger)
//! ```
//!
//! ## Rules
//! - Outgoing values reach every listener registered for the port name at delivery time.
//! - Incoming values reach the subscriptions of the latest cycle only.
//! - A value with no subscribers, or whose type does not match a listener or
//!   subscription, is reported as `MessageRejected`.

use std::any::{Any, type_name};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use crate::core::{ProcessId, Scheduler};
use crate::effects::{Cmd, Message, Sub, Tagger};
use crate::events::{Bus, Event, EventKind};
use crate::managers::manager::{Envelope, Manager, Router};
use crate::tasks::{Never, Task, sequence};

type Listener = Rc<dyn Fn(&dyn Any) -> bool>;
type PortTagger = Rc<dyn Fn(&dyn Any) -> Option<Message>>;

#[derive(Default)]
struct Listeners {
    next: u64,
    by_port: HashMap<String, Vec<(u64, Listener)>>,
}

/// Outgoing port command: a value for the host.
pub struct PortCmd {
    name: String,
    value: Rc<dyn Any>,
    type_name: &'static str,
}

/// Incoming port subscription: turns host values into application messages.
#[derive(Clone)]
pub struct PortSub {
    name: String,
    tagger: PortTagger,
    type_name: &'static str,
}

/// A host value posted to an incoming port.
pub struct Inbound {
    name: String,
    value: Rc<dyn Any>,
}

/// Manager behind [`outgoing`] and [`incoming`].
#[derive(Default)]
pub struct PortsManager {
    listeners: Rc<RefCell<Listeners>>,
}

impl Manager for PortsManager {
    type State = HashMap<String, Vec<PortSub>>;
    type SelfMsg = Inbound;
    type Cmd = PortCmd;
    type Sub = PortSub;

    fn name() -> &'static str {
        "ports"
    }

    fn init(&self) -> Task<Never, Self::State> {
        Task::succeed(HashMap::new())
    }

    fn on_effects(
        &self,
        router: Router<Self>,
        commands: Vec<PortCmd>,
        subscriptions: Vec<PortSub>,
        _state: Self::State,
    ) -> Task<Never, Self::State> {
        let mut next: Self::State = HashMap::new();
        for sub in subscriptions {
            next.entry(sub.name.clone()).or_default().push(sub);
        }
        if commands.is_empty() {
            return Task::succeed(next);
        }

        let listeners = Rc::clone(&self.listeners);
        let bus = router.bus().clone();
        Task::from_fn(move || {
            for cmd in &commands {
                deliver(&listeners, cmd, &bus);
            }
            Ok(next)
        })
    }

    fn on_self_msg(
        &self,
        router: Router<Self>,
        msg: Inbound,
        state: Self::State,
    ) -> Task<Never, Self::State> {
        let subs = state.get(&msg.name).map(Vec::as_slice).unwrap_or_default();
        if subs.is_empty() {
            reject(router.bus(), &msg.name, "no subscribers");
            return Task::succeed(state);
        }

        let mut messages = Vec::with_capacity(subs.len());
        for sub in subs {
            match (sub.tagger)(msg.value.as_ref()) {
                Some(m) => messages.push(m),
                None => reject(router.bus(), &msg.name, &format!("expected {}", sub.type_name)),
            }
        }
        sequence(messages.into_iter().map(|m| router.send_to_app::<Never>(m))).map(move |_| state)
    }

    fn sub_map(tagger: &Tagger, sub: PortSub) -> PortSub {
        let outer = Rc::clone(tagger);
        let inner = sub.tagger;
        PortSub {
            name: sub.name,
            tagger: Rc::new(move |value: &dyn Any| inner(value).map(|m| outer(m))),
            type_name: sub.type_name,
        }
    }
}

fn deliver(listeners: &RefCell<Listeners>, cmd: &PortCmd, bus: &Bus) {
    let targets: Vec<Listener> = listeners
        .borrow()
        .by_port
        .get(&cmd.name)
        .map(|ls| ls.iter().map(|(_, l)| Rc::clone(l)).collect())
        .unwrap_or_default();
    for listener in targets {
        if !listener(cmd.value.as_ref()) {
            reject(bus, &cmd.name, &format!("listener rejected {}", cmd.type_name));
        }
    }
}

fn reject(bus: &Bus, port: &str, why: &str) {
    bus.publish(
        Event::new(EventKind::MessageRejected)
            .with_manager("ports")
            .with_reason(format!("port={port} {why}")),
    );
}

/// Command sending `value` out through the port `name`.
pub fn outgoing<V: 'static, Msg: 'static>(name: impl Into<String>, value: V) -> Cmd<Msg> {
    Cmd::single::<PortsManager>(PortCmd {
        name: name.into(),
        value: Rc::new(value),
        type_name: type_name::<V>(),
    })
}

/// Subscription turning values posted to port `name` into messages.
pub fn incoming<V, Msg, F>(name: impl Into<String>, tagger: F) -> Sub<Msg>
where
    V: 'static,
    Msg: 'static,
    F: Fn(&V) -> Msg + 'static,
{
    Sub::single::<PortsManager>(PortSub {
        name: name.into(),
        tagger: Rc::new(move |value: &dyn Any| {
            value.downcast_ref::<V>().map(|v| Message::new(tagger(v)))
        }),
        type_name: type_name::<V>(),
    })
}

/// Host-side handle to a program's ports.
#[derive(Clone)]
pub struct Ports {
    listeners: Rc<RefCell<Listeners>>,
    scheduler: Scheduler,
    process: ProcessId,
}

impl Ports {
    pub(crate) fn new(manager: &PortsManager, scheduler: Scheduler, process: ProcessId) -> Self {
        Self {
            listeners: Rc::clone(&manager.listeners),
            scheduler,
            process,
        }
    }

    /// Posts `value` to the incoming port `name`.
    pub fn send<V: 'static>(&self, name: impl Into<String>, value: V) {
        self.scheduler.send(
            self.process,
            Envelope::<PortsManager>::SelfMsg(Inbound {
                name: name.into(),
                value: Rc::new(value),
            }),
        );
    }

    /// Listens to the outgoing port `name`.
    pub fn subscribe<V, F>(&self, name: impl Into<String>, callback: F) -> PortSubscription
    where
        V: 'static,
        F: Fn(&V) + 'static,
    {
        let name = name.into();
        let listener: Listener = Rc::new(move |value: &dyn Any| match value.downcast_ref::<V>() {
            Some(v) => {
                callback(v);
                true
            }
            None => false,
        });

        let mut listeners = self.listeners.borrow_mut();
        let id = listeners.next;
        listeners.next += 1;
        listeners.by_port.entry(name.clone()).or_default().push((id, listener));

        PortSubscription {
            listeners: Rc::downgrade(&self.listeners),
            name,
            id,
        }
    }
}

/// Handle returned by [`Ports::subscribe`].
#[must_use = "dropping the handle keeps the listener; call unsubscribe to remove it"]
pub struct PortSubscription {
    listeners: Weak<RefCell<Listeners>>,
    name: String,
    id: u64,
}

impl PortSubscription {
    /// Removes the listener.
    pub fn unsubscribe(self) {
        let Some(listeners) = self.listeners.upgrade() else {
            return;
        };
        let mut listeners = listeners.borrow_mut();
        if let Some(ls) = listeners.by_port.get_mut(&self.name) {
            ls.retain(|(id, _)| *id != self.id);
            if ls.is_empty() {
                listeners.by_port.remove(&self.name);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;

    #[test]
    fn listener_sees_only_its_port_and_type() {
        let manager = PortsManager::default();
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();

        let sched = Scheduler::new(crate::config::Config::default(), bus.clone());
        let ports = Ports::new(&manager, sched, ProcessId(0));
        let _sub = ports.subscribe("out", move |v: &u32| sink.borrow_mut().push(*v));

        let cmd = |value: Rc<dyn Any>, type_name: &'static str| PortCmd {
            name: "out".into(),
            value,
            type_name,
        };
        deliver(&manager.listeners, &cmd(Rc::new(5_u32) as Rc<dyn Any>, "u32"), &bus);
        deliver(&manager.listeners, &cmd(Rc::new("x") as Rc<dyn Any>, "&str"), &bus);

        assert_eq!(*seen.borrow(), vec![5]);
        assert_eq!(rx.try_recv().unwrap().kind, EventKind::MessageRejected);
    }

    #[test]
    fn unsubscribe_removes_listener() {
        let manager = PortsManager::default();
        let sched = Scheduler::new(crate::config::Config::default(), Bus::new(16));
        let ports = Ports::new(&manager, sched, ProcessId(0));

        let a = ports.subscribe("out", |_: &u8| {});
        let b = ports.subscribe("out", |_: &u8| {});
        a.unsubscribe();
        assert_eq!(manager.listeners.borrow().by_port["out"].len(), 1);
        b.unsubscribe();
        assert!(manager.listeners.borrow().by_port.is_empty());
    }

    #[test]
    fn sub_map_composes_taggers() {
        let plain = PortSub {
            name: "in".into(),
            tagger: Rc::new(|v: &dyn Any| v.downcast_ref::<u8>().map(|n| Message::new(*n + 1))),
            type_name: "u8",
        };
        let t: Tagger = Rc::new(|m: Message| match m.downcast::<u8>() {
            Ok(n) => Message::new(format!("{n}")),
            Err(m) => m,
        });
        let mapped = PortsManager::sub_map(&t, plain);

        let msg = (mapped.tagger)(&1_u8).unwrap();
        assert_eq!(msg.downcast::<String>().unwrap(), "2");
        assert!((mapped.tagger)(&"wrong").is_none());
    }
}
