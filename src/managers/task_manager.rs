//! # Built-in task manager.
//!
//! Turns tasks into commands. Each command runs in its own process; its
//! result is tagged into an application message and dispatched back.
//!
//! ```text
//! perform(tag, task) ─► Cmd ─► on_effects ─► spawn(task.and_then(send_to_app)) per command
//! ```
//!
//! Commands of one cycle are spawned in order; the spawned processes then run
//! independently (a sleeping one does not hold back the others).

use std::rc::Rc;

use crate::effects::{Cmd, Message, Tagger};
use crate::managers::manager::{Manager, Router};
use crate::tasks::{Never, Task, sequence, spawn};

/// Manager behind [`perform`] and [`attempt`].
#[derive(Debug, Default)]
pub struct TaskManager;

impl Manager for TaskManager {
    type State = ();
    type SelfMsg = Never;
    type Cmd = Task<Never, Message>;
    type Sub = Never;

    fn name() -> &'static str {
        "task"
    }

    fn init(&self) -> Task<Never, ()> {
        Task::succeed(())
    }

    fn on_effects(
        &self,
        router: Router<Self>,
        commands: Vec<Task<Never, Message>>,
        _subscriptions: Vec<Never>,
        state: (),
    ) -> Task<Never, ()> {
        let spawns = commands.into_iter().map(|task| {
            let router = router.clone();
            spawn::<Never, ()>(task.and_then(move |msg| router.send_to_app(msg)))
        });
        sequence(spawns).map(move |_| state)
    }

    fn on_self_msg(&self, _router: Router<Self>, msg: Never, _state: ()) -> Task<Never, ()> {
        match msg {}
    }

    fn cmd_map(tagger: &Tagger, cmd: Task<Never, Message>) -> Task<Never, Message> {
        let tagger = Rc::clone(tagger);
        cmd.map(move |msg| tagger(msg))
    }
}

/// Runs `task` and turns its result into a message.
pub fn perform<A, Msg, F>(tag: F, task: Task<Never, A>) -> Cmd<Msg>
where
    A: 'static,
    Msg: 'static,
    F: FnOnce(A) -> Msg + 'static,
{
    Cmd::single::<TaskManager>(task.map(move |value| Message::new(tag(value))))
}

/// Runs a fallible `task` and turns its outcome into a message.
pub fn attempt<E, A, Msg, F>(tag: F, task: Task<E, A>) -> Cmd<Msg>
where
    E: 'static,
    A: 'static,
    Msg: 'static,
    F: FnOnce(Result<A, E>) -> Msg + 'static,
{
    let settled = task
        .map(Ok)
        .on_error(|error| Task::<Never, Result<A, E>>::succeed(Err(error)));
    Cmd::single::<TaskManager>(settled.map(move |outcome| Message::new(tag(outcome))))
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::config::Config;
    use crate::core::Scheduler;
    use crate::effects::Gathered;
    use crate::events::Bus;
    use crate::managers::Registry;
    use crate::managers::manager::AnyManager;

    fn run_cmd(cmd: Cmd<String>) -> Vec<String> {
        let registry = Registry::new();
        let mut gathered = Gathered::default();
        cmd.gather(&registry, &mut gathered);

        let sched = Scheduler::new(Config::default(), Bus::new(16));
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let manager: Rc<dyn AnyManager> = registry.get::<TaskManager>().unwrap();
        let pid = sched.spawn(manager.clone().boot(
            Rc::new(move |m: Message| {
                if let Ok(s) = m.downcast::<String>() {
                    sink.borrow_mut().push(s);
                }
            }),
            Bus::new(16),
        ));

        let id = registry.id_of::<TaskManager>().unwrap();
        let effects = gathered.effects.remove(&id).unwrap_or_default();
        manager.deliver(&sched, pid, effects);
        seen.take()
    }

    #[test]
    fn perform_tags_result() {
        let cmd = perform(|n: u32| format!("got {n}"), Task::succeed(7));
        assert_eq!(run_cmd(cmd), vec!["got 7"]);
    }

    #[test]
    fn attempt_tags_both_outcomes() {
        let ok = attempt(|r: Result<u8, String>| format!("{r:?}"), Task::succeed(1));
        let err = attempt(|r: Result<u8, String>| format!("{r:?}"), Task::fail("no".to_string()));
        assert_eq!(run_cmd(Cmd::batch([ok, err])), vec!["Ok(1)", "Err(\"no\")"]);
    }

    #[test]
    fn mapped_commands_are_retagged() {
        let cmd = perform(|n: u32| n * 2, Task::succeed(5)).map(|n| format!("n={n}"));
        assert_eq!(run_cmd(cmd), vec!["n=10"]);
    }
}
