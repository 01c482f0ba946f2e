//! # Program: the model/update/subscriptions driver loop.
//!
//! ```text
//! construct(init, update, subscriptions)
//!   ├─► (model0, cmd0) = init
//!   ├─► Runtime::start (one process per manager)
//!   └─► dispatch_effects(cmd0, subscriptions(model0))
//!
//! dispatch(msg)                                 ◄── also the target of Router::send_to_app
//!   ├─► (model', cmd') = update(msg, &model)
//!   ├─► model = model'
//!   ├─► dispatch_effects(cmd', subscriptions(&model'))
//!   └─► notify observers(&model')
//! ```
//!
//! ## Rules
//! - `update` and `subscriptions` are pure: they only describe effects.
//! - Managers may dispatch back into the program while a cycle is running; the
//!   nested cycle's deliveries queue behind the current one.
//! - Observers receive a snapshot of the model and may dispatch from inside the callback.
//! - Messages of a type other than `Msg` are rejected (`MessageRejected`), never panicked on.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::config::Config;
use crate::core::{Host, Runtime, Scheduler};
use crate::effects::{Cmd, Message, Sub, expected};
use crate::events::{Bus, Event, EventKind};
use crate::managers::{AppSink, Ports, PortsManager, Registry};
use crate::subscribers::{Subscribe, SubscriberSet};

type Update<Model, Msg> = Box<dyn Fn(Msg, &Model) -> (Model, Cmd<Msg>)>;
type Subscriptions<Model, Msg> = Box<dyn Fn(&Model) -> Sub<Msg>>;
type Observer<Model> = Rc<dyn Fn(&Model)>;

/// A running program: model, update function and effect runtime.
///
/// Cheap to clone; clones drive the same program.
pub struct Program<Model, Msg> {
    inner: Rc<ProgramInner<Model, Msg>>,
}

impl<Model, Msg> Clone for Program<Model, Msg> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

struct ProgramInner<Model, Msg> {
    model: RefCell<Model>,
    update: Update<Model, Msg>,
    subscriptions: Subscriptions<Model, Msg>,
    runtime: Runtime,
    observers: RefCell<Vec<(u64, Observer<Model>)>>,
    next_observer: Cell<u64>,
    listener: Option<JoinHandle<()>>,
}

impl<Model, Msg> Drop for ProgramInner<Model, Msg> {
    fn drop(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
    }
}

impl<Model: Clone + 'static, Msg: 'static> Program<Model, Msg> {
    /// Starts a program with the default configuration and the built-in managers.
    ///
    /// # Example
    /// ```rust
    /// use effectvisor::{Cmd, Program, Sub, Task, perform};
    ///
    /// let program = Program::construct(
    ///     (0_u32, perform(|()| 1_u32, Task::succeed(()))),
    ///     |step: u32, model: &u32| (model + step, Cmd::none()),
    ///     |_| Sub::none(),
    /// );
    /// assert_eq!(program.model(), 1);
    /// ```
    pub fn construct<U, S>(init: (Model, Cmd<Msg>), update: U, subscriptions: S) -> Self
    where
        U: Fn(Msg, &Model) -> (Model, Cmd<Msg>) + 'static,
        S: Fn(&Model) -> Sub<Msg> + 'static,
    {
        ProgramBuilder::new(Config::default()).build(init, update, subscriptions)
    }

    /// Feeds `msg` through `update` and runs the resulting effects.
    pub fn dispatch(&self, msg: Msg) {
        let (next, cmd) = {
            let model = self.inner.model.borrow();
            (self.inner.update)(msg, &model)
        };
        let previous = self.inner.model.replace(next);
        drop(previous);

        let sub = self.with_model(|model| (self.inner.subscriptions)(model));
        self.inner.runtime.dispatch_effects(cmd, sub);
        self.notify();
    }

    /// Snapshot of the current model.
    pub fn model(&self) -> Model {
        self.inner.model.borrow().clone()
    }

    /// Reads the current model without cloning it.
    ///
    /// `f` must not dispatch.
    pub fn with_model<R>(&self, f: impl FnOnce(&Model) -> R) -> R {
        f(&self.inner.model.borrow())
    }

    /// Calls `observer` with the model after every dispatch.
    pub fn subscribe(&self, observer: impl Fn(&Model) + 'static) -> Unsubscribe {
        let id = self.inner.next_observer.get();
        self.inner.next_observer.set(id + 1);
        self.inner
            .observers
            .borrow_mut()
            .push((id, Rc::new(observer)));

        let program = Rc::downgrade(&self.inner);
        Unsubscribe {
            detach: Box::new(move || {
                if let Some(inner) = program.upgrade() {
                    inner.observers.borrow_mut().retain(|(i, _)| *i != id);
                }
            }),
        }
    }

    /// Host-side handle to the ports manager; `None` if the registry has none.
    pub fn ports(&self) -> Option<Ports> {
        let runtime = &self.inner.runtime;
        let manager = runtime.registry().get::<PortsManager>()?;
        let process = runtime.process_of::<PortsManager>()?;
        Some(Ports::new(&manager, runtime.scheduler().clone(), process))
    }

    /// Scheduler running the program's processes.
    pub fn scheduler(&self) -> &Scheduler {
        self.inner.runtime.scheduler()
    }

    /// Effect runtime.
    pub fn runtime(&self) -> &Runtime {
        &self.inner.runtime
    }

    /// Event bus.
    pub fn bus(&self) -> &Bus {
        self.inner.runtime.bus()
    }

    fn notify(&self) {
        let observers: Vec<Observer<Model>> = self
            .inner
            .observers
            .borrow()
            .iter()
            .map(|(_, o)| Rc::clone(o))
            .collect();
        if observers.is_empty() {
            return;
        }
        let snapshot = self.model();
        for observer in observers {
            observer(&snapshot);
        }
    }
}

/// Routes erased messages from managers into `dispatch`.
fn app_sink<Model: Clone + 'static, Msg: 'static>(
    program: Weak<ProgramInner<Model, Msg>>,
    bus: Bus,
) -> AppSink {
    Rc::new(move |message: Message| {
        let Some(inner) = program.upgrade() else {
            bus.publish(
                Event::new(EventKind::MessageRejected).with_reason("program is not running"),
            );
            return;
        };
        match message.downcast::<Msg>() {
            Ok(msg) => Program { inner }.dispatch(msg),
            Err(_) => bus.publish(
                Event::new(EventKind::MessageRejected)
                    .with_reason(format!("expected message of type {}", expected::<Msg>())),
            ),
        }
    })
}

/// Handle returned by [`Program::subscribe`].
#[must_use = "dropping the handle keeps the observer; call unsubscribe to remove it"]
pub struct Unsubscribe {
    detach: Box<dyn FnOnce()>,
}

impl Unsubscribe {
    /// Removes the observer.
    pub fn unsubscribe(self) {
        (self.detach)()
    }
}

impl fmt::Debug for Unsubscribe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Unsubscribe")
    }
}

/// Builder for a [`Program`] with optional registry, host and subscribers.
pub struct ProgramBuilder {
    cfg: Config,
    registry: Option<Registry>,
    host: Option<Rc<dyn Host>>,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl ProgramBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            registry: None,
            host: None,
            subscribers: Vec::new(),
        }
    }

    /// Uses `registry` instead of the default one (built-in managers only).
    pub fn with_registry(mut self, registry: Registry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Sets the host that resumes drains which spent their step budget.
    ///
    /// Without a host every call drains until the run queue is idle, one
    /// budget slice after another.
    pub fn with_host(mut self, host: impl Host + 'static) -> Self {
        self.host = Some(Rc::new(host));
        self
    }

    /// Sets event subscribers for observability.
    ///
    /// With a non-empty list, `build` must run inside a tokio runtime: it spawns
    /// one worker per subscriber plus a bus listener.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Builds the program and runs the initial cycle.
    pub fn build<Model, Msg, U, S>(
        self,
        init: (Model, Cmd<Msg>),
        update: U,
        subscriptions: S,
    ) -> Program<Model, Msg>
    where
        Model: Clone + 'static,
        Msg: 'static,
        U: Fn(Msg, &Model) -> (Model, Cmd<Msg>) + 'static,
        S: Fn(&Model) -> Sub<Msg> + 'static,
    {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let listener = if self.subscribers.is_empty() {
            None
        } else {
            let set = Arc::new(SubscriberSet::new(self.subscribers, bus.clone()));
            Some(set.listen())
        };

        let scheduler = Scheduler::new(self.cfg, bus.clone());
        match self.host {
            Some(host) => scheduler.set_host(host),
            None => scheduler.set_drain_until_idle(true),
        }
        let registry = self.registry.unwrap_or_default();
        let (model, cmd) = init;

        let inner = Rc::new_cyclic(|weak: &Weak<ProgramInner<Model, Msg>>| ProgramInner {
            model: RefCell::new(model),
            update: Box::new(update),
            subscriptions: Box::new(subscriptions),
            runtime: Runtime::start(scheduler, registry, app_sink(weak.clone(), bus.clone())),
            observers: RefCell::new(Vec::new()),
            next_observer: Cell::new(0),
            listener,
        });

        let program = Program { inner };
        let sub = program.with_model(|model| (program.inner.subscriptions)(model));
        program.inner.runtime.dispatch_effects(cmd, sub);
        program
    }
}
