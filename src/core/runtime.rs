//! # Runtime: one process per manager, one delivery per manager per cycle.
//!
//! ```text
//! Runtime::start(scheduler, registry, app)
//!   └─► for each manager (id order): spawn(manager.boot(app)) ─► ManagerStarted
//!
//! dispatch_effects(cmd, sub)
//!   ├─► gather cmd + sub ─► { ManagerId → Effects } (+ unrouted ─► EffectUnrouted)
//!   ├─► hold draining:
//!   │     for each manager (id order): deliver(effects or empty)
//!   └─► drain ─► EffectsDispatched{count}
//! ```
//!
//! Every manager gets a delivery each cycle, including an empty one: that is
//! how a manager learns its previous subscriptions were dropped. All deliveries
//! are queued before any manager runs, so a message a manager sends back to the
//! application mid-cycle starts a new cycle whose deliveries line up behind
//! this one in every mailbox.

use std::collections::BTreeMap;

use crate::core::{ProcessId, Scheduler};
use crate::effects::{Cmd, Gathered, Sub};
use crate::events::{Bus, Event, EventKind};
use crate::managers::{AppSink, Manager, ManagerId, Registry};

/// Manager processes of one program.
pub struct Runtime {
    scheduler: Scheduler,
    registry: Registry,
    processes: BTreeMap<ManagerId, ProcessId>,
}

impl Runtime {
    /// Spawns one process per registered manager.
    pub(crate) fn start(scheduler: Scheduler, registry: Registry, app: AppSink) -> Self {
        let bus = scheduler.bus().clone();
        let mut processes = BTreeMap::new();
        for (id, manager) in registry.iter() {
            let pid = scheduler.spawn(manager.clone().boot(app.clone(), bus.clone()));
            bus.publish(
                Event::new(EventKind::ManagerStarted)
                    .with_process(pid)
                    .with_manager(manager.name()),
            );
            processes.insert(id, pid);
        }
        Self {
            scheduler,
            registry,
            processes,
        }
    }

    /// Routes one cycle's commands and subscriptions to every manager.
    pub fn dispatch_effects<Msg: 'static>(&self, cmd: Cmd<Msg>, sub: Sub<Msg>) {
        let mut gathered = Gathered::default();
        cmd.gather(&self.registry, &mut gathered);
        sub.gather(&self.registry, &mut gathered);

        let bus = self.bus();
        for name in gathered.unrouted.drain(..) {
            bus.publish(Event::new(EventKind::EffectUnrouted).with_manager(name));
        }

        self.scheduler.hold(|| {
            for (id, manager) in self.registry.iter() {
                let Some(&pid) = self.processes.get(&id) else {
                    continue;
                };
                let effects = gathered.effects.remove(&id).unwrap_or_default();
                manager.deliver(&self.scheduler, pid, effects);
            }
        });
        bus.publish(Event::new(EventKind::EffectsDispatched).with_count(self.processes.len()));
    }

    /// Process running manager `M`.
    pub fn process_of<M: Manager>(&self) -> Option<ProcessId> {
        let id = self.registry.id_of::<M>()?;
        self.processes.get(&id).copied()
    }

    /// Managers this runtime runs.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Scheduler the manager processes live on.
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Event bus.
    pub fn bus(&self) -> &Bus {
        self.scheduler.bus()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::config::Config;
    use crate::effects::Message;
    use crate::managers::{Router, TaskManager, perform, ports};
    use crate::tasks::{Never, Task};

    /// Logs each delivery as `(commands, subscriptions)`.
    struct Tally {
        log: Rc<RefCell<Vec<(usize, usize)>>>,
    }

    impl Manager for Tally {
        type State = ();
        type SelfMsg = ();
        type Cmd = ();
        type Sub = ();

        fn name() -> &'static str {
            "tally"
        }

        fn init(&self) -> Task<Never, ()> {
            Task::succeed(())
        }

        fn on_effects(
            &self,
            _: Router<Self>,
            cmds: Vec<()>,
            subs: Vec<()>,
            state: (),
        ) -> Task<Never, ()> {
            self.log.borrow_mut().push((cmds.len(), subs.len()));
            Task::succeed(state)
        }

        fn on_self_msg(&self, _: Router<Self>, _: (), state: ()) -> Task<Never, ()> {
            Task::succeed(state)
        }
    }

    fn runtime(log: Rc<RefCell<Vec<(usize, usize)>>>, app: AppSink) -> Runtime {
        let mut registry = Registry::new();
        registry.register(Tally { log }).unwrap();
        Runtime::start(Scheduler::new(Config::default(), Bus::new(64)), registry, app)
    }

    #[test]
    fn every_manager_gets_one_delivery_per_cycle() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let rt = runtime(log.clone(), Rc::new(|_| {}));
        let mut rx = rt.bus().subscribe();

        rt.dispatch_effects::<()>(
            Cmd::batch([Cmd::single::<Tally>(()), Cmd::single::<Tally>(())]),
            Sub::single::<Tally>(()),
        );
        rt.dispatch_effects::<()>(Cmd::none(), Sub::none());
        rt.dispatch_effects::<()>(ports::outgoing("unheard", 1_u8), Sub::none());

        assert_eq!(*log.borrow(), vec![(2, 1), (0, 0), (0, 0)]);

        let dispatched: Vec<Option<u32>> = std::iter::from_fn(|| rx.try_recv().ok())
            .filter(|ev| ev.kind == EventKind::EffectsDispatched)
            .map(|ev| ev.count)
            .collect();
        assert_eq!(dispatched, vec![Some(3); 3]);
    }

    #[test]
    fn managers_are_spawned_in_id_order() {
        let rt = runtime(Rc::new(RefCell::new(Vec::new())), Rc::new(|_| {}));
        let task = rt.process_of::<TaskManager>().unwrap();
        let tally = rt.process_of::<Tally>().unwrap();
        assert!(task < tally);
        assert!(rt.scheduler().is_alive(tally));
    }

    #[test]
    fn mid_cycle_messages_queue_behind_the_current_cycle() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let rt = Rc::new_cyclic(|weak: &std::rc::Weak<Runtime>| {
            let weak = weak.clone();
            let app: AppSink = Rc::new(move |m: Message| {
                if let (Some(rt), Ok(n)) = (weak.upgrade(), m.downcast::<usize>()) {
                    let cmds = (0..n).map(|_| Cmd::single::<Tally>(()));
                    rt.dispatch_effects::<()>(Cmd::batch(cmds), Sub::none());
                }
            });
            runtime(log.clone(), app)
        });

        rt.dispatch_effects::<usize>(
            Cmd::batch([perform(|()| 3_usize, Task::succeed(())), Cmd::single::<Tally>(())]),
            Sub::none(),
        );
        assert_eq!(*log.borrow(), vec![(1, 0), (3, 0)]);
    }
}
