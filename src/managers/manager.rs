//! # Manager: a pluggable interpreter of one kind of effect.
//!
//! A manager owns a private state and runs as one process inside the
//! scheduler. Every update cycle it receives exactly one delivery with the
//! commands and subscriptions addressed to it (possibly empty), and it may
//! also receive self-messages it posted through its [`Router`].
//!
//! ## Actor loop
//! ```text
//! boot (binding, resolves at once with its own pid)
//!   └─► Router { process, app, bus }
//!         └─► init() ──► state
//!               loop {
//!                 receive(Envelope<M>)
//!                   ├─ Effects { commands, subscriptions }
//!                   │     └─► on_effects(router, commands, subscriptions, state)
//!                   └─ SelfMsg(msg)
//!                         └─► on_self_msg(router, msg, state)
//!                 ──► state'
//!               }
//! ```
//!
//! ## Rules
//! - Handlers return tasks; the loop only receives the next envelope once the
//!   previous task produced the new state.
//! - Handler tasks cannot fail (`Never`): recover inside the manager.
//! - Messages sent to the application are type-erased ([`Message`]); the program
//!   rejects types other than its own message type.

use std::any::type_name;
use std::marker::PhantomData;
use std::rc::Rc;

use crate::core::{ProcessId, Scheduler};
use crate::effects::{Effects, Message, Tagger};
use crate::events::Bus;
use crate::tasks::{Never, Resolver, Task};

/// Erased sink feeding messages back into the program.
pub(crate) type AppSink = Rc<dyn Fn(Message)>;

/// An effect manager.
///
/// # Example
/// ```rust
/// use effectvisor::{Manager, Never, Router, Task};
///
/// /// Counts how many commands it has seen.
/// struct Counter;
///
/// impl Manager for Counter {
///     type State = usize;
///     type SelfMsg = ();
///     type Cmd = ();
///     type Sub = Never;
///
///     fn init(&self) -> Task<Never, usize> {
///         Task::succeed(0)
///     }
///
///     fn on_effects(
///         &self,
///         _router: Router<Self>,
///         cmds: Vec<()>,
///         _subs: Vec<Never>,
///         seen: usize,
///     ) -> Task<Never, usize> {
///         Task::succeed(seen + cmds.len())
///     }
///
///     fn on_self_msg(&self, _router: Router<Self>, _msg: (), seen: usize) -> Task<Never, usize> {
///         Task::succeed(seen)
///     }
/// }
/// ```
pub trait Manager: Sized + 'static {
    /// Private state threaded through the handlers.
    type State: 'static;
    /// Messages the manager posts to itself.
    type SelfMsg: 'static;
    /// Command payload.
    type Cmd: 'static;
    /// Subscription payload.
    type Sub: 'static;

    /// Name used in events and diagnostics.
    fn name() -> &'static str {
        type_name::<Self>()
    }

    /// Initial state; runs once when the runtime starts.
    fn init(&self) -> Task<Never, Self::State>;

    /// Handles one cycle's commands and subscriptions.
    fn on_effects(
        &self,
        router: Router<Self>,
        commands: Vec<Self::Cmd>,
        subscriptions: Vec<Self::Sub>,
        state: Self::State,
    ) -> Task<Never, Self::State>;

    /// Handles a message the manager posted to itself.
    fn on_self_msg(
        &self,
        router: Router<Self>,
        msg: Self::SelfMsg,
        state: Self::State,
    ) -> Task<Never, Self::State>;

    /// Applies a message transformer to a command. Identity by default, which
    /// is only correct for commands that never produce messages.
    fn cmd_map(tagger: &Tagger, cmd: Self::Cmd) -> Self::Cmd {
        let _ = tagger;
        cmd
    }

    /// Applies a message transformer to a subscription. Identity by default.
    fn sub_map(tagger: &Tagger, sub: Self::Sub) -> Self::Sub {
        let _ = tagger;
        sub
    }
}

/// Handle a manager uses to talk to the application and to itself.
pub struct Router<M: Manager> {
    process: ProcessId,
    app: AppSink,
    bus: Bus,
    _m: PhantomData<fn() -> M>,
}

impl<M: Manager> Clone for Router<M> {
    fn clone(&self) -> Self {
        Self {
            process: self.process,
            app: Rc::clone(&self.app),
            bus: self.bus.clone(),
            _m: PhantomData,
        }
    }
}

impl<M: Manager> Router<M> {
    fn new(process: ProcessId, app: AppSink, bus: Bus) -> Self {
        Self {
            process,
            app,
            bus,
            _m: PhantomData,
        }
    }

    /// Dispatches `msg` to the application when the task runs.
    pub fn send_to_app<X: 'static>(&self, msg: Message) -> Task<X, ()> {
        let app = Rc::clone(&self.app);
        Task::from_fn(move || {
            app(msg);
            Ok(())
        })
    }

    /// Posts `msg` to this manager's own mailbox; it arrives through `on_self_msg`.
    pub fn send_to_self<X: 'static>(&self, msg: M::SelfMsg) -> Task<X, ()> {
        crate::tasks::send(self.process, Envelope::<M>::SelfMsg(msg))
    }

    /// Process running this manager.
    pub fn process(&self) -> ProcessId {
        self.process
    }

    /// Event bus, for diagnostics the manager wants to report.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }
}

/// What a manager process receives.
pub(crate) enum Envelope<M: Manager> {
    Effects {
        commands: Vec<M::Cmd>,
        subscriptions: Vec<M::Sub>,
    },
    SelfMsg(M::SelfMsg),
}

/// Object-safe view of a manager, used by the registry and the runtime.
pub(crate) trait AnyManager {
    fn name(&self) -> &'static str;

    /// Root task of the manager process.
    fn boot(self: Rc<Self>, app: AppSink, bus: Bus) -> Task<Never, Never>;

    /// Sends one cycle's gathered effects to the manager process.
    fn deliver(&self, scheduler: &Scheduler, process: ProcessId, effects: Effects);
}

impl<M: Manager> AnyManager for M {
    fn name(&self) -> &'static str {
        <M as Manager>::name()
    }

    fn boot(self: Rc<Self>, app: AppSink, bus: Bus) -> Task<Never, Never> {
        Task::binding(move |resolver: Resolver<Never, Never>| {
            let router = Router::<M>::new(resolver.process(), app, bus);
            let manager = self;
            let init = manager.init();
            resolver.resolve(init.and_then(move |state| serve(manager, router, state)));
            None
        })
    }

    fn deliver(&self, scheduler: &Scheduler, process: ProcessId, effects: Effects) {
        let commands = effects
            .commands
            .into_iter()
            .filter_map(|c| c.downcast::<M::Cmd>().ok().map(|c| *c))
            .collect();
        let subscriptions = effects
            .subscriptions
            .into_iter()
            .filter_map(|s| s.downcast::<M::Sub>().ok().map(|s| *s))
            .collect();
        scheduler.send(
            process,
            Envelope::<M>::Effects {
                commands,
                subscriptions,
            },
        );
    }
}

fn serve<M: Manager>(manager: Rc<M>, router: Router<M>, state: M::State) -> Task<Never, Never> {
    Task::receive(move |envelope: Envelope<M>| {
        let next = match envelope {
            Envelope::Effects {
                commands,
                subscriptions,
            } => manager.on_effects(router.clone(), commands, subscriptions, state),
            Envelope::SelfMsg(msg) => manager.on_self_msg(router.clone(), msg, state),
        };
        next.and_then(move |state| serve(manager, router, state))
    })
}
