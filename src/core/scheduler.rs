//! # Scheduler: run queue and task tree interpreter.
//!
//! The [`Scheduler`] owns every process of one program and interprets their task
//! trees on the calling thread. It is cooperative: a process runs until it
//! suspends on a binding, parks on an empty mailbox, finishes, or the drain spends
//! its step budget.
//!
//! ## Stepping loop
//! ```text
//! loop {
//!   root = process.root.take()
//!   ├─ Succeed(v)     ─► unwind stack to next Chain frame ─► root = k(v)
//!   │                    (stack dry → process completed, removed)
//!   ├─ Fail(e)        ─► unwind stack to next OnError frame ─► root = h(e)
//!   │                    (stack dry → process failed, removed)
//!   ├─ Chain(k, t)    ─► push Chain frame,   root = t
//!   ├─ OnError(h, t)  ─► push OnError frame, root = t
//!   ├─ Binding(reg)   ─► Suspended{epoch}; cancel = reg(resume); STOP
//!   └─ Receive(h)     ─► mailbox empty? Parked; STOP
//!                        else root = h(mailbox.pop_front())
//! }
//! ```
//!
//! ## Draining
//! ```text
//! enqueue(pid) ──► run queue (FIFO, each pid at most once)
//!                     │
//!        not working? └──► run_pending(): step queued processes
//!                             ├─ queue empty      → Drain::Idle
//!                             └─ budget exhausted → re-queue current process, then
//!                                  ├─ host set       → Host::defer(run_pending), Drain::Yielded
//!                                  ├─ until idle     → next slice right away
//!                                  └─ otherwise      → Drain::Yielded, work stays queued
//! ```
//!
//! ## Rules
//! - **Single-threaded**: handles are `Rc`-based; nothing here is `Send`.
//! - **Re-entrancy**: enqueueing while a drain runs only queues; the running drain picks it up.
//! - **Isolation**: a panicking callback or a type mismatch crashes its own process only
//!   (`ProcessCrashed`); the queue keeps draining.
//! - **No-ops**: sending to, killing, or resolving a removed process does nothing.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::{Rc, Weak};

use crate::config::Config;
use crate::core::host::Host;
use crate::core::process::{Process, ProcessId, Status};
use crate::error::{ProcessError, panic_info};
use crate::events::{Bus, Event, EventKind};
use crate::tasks::node::{Cont, FrameKind, Node, Registrar, Value};
use crate::tasks::{Cancel, Task};

/// Result of one call to [`Scheduler::run_pending`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Drain {
    /// The run queue is empty.
    Idle,
    /// The step budget ran out with work left; it was handed to the host
    /// (or stays queued when no host is configured).
    Yielded,
    /// A drain is already running further up the call stack; it will pick the work up.
    Busy,
}

/// How a process ran its control stack dry.
enum Outcome {
    Succeeded,
    Failed,
}

/// Single-threaded cooperative scheduler.
///
/// Cheap to clone: clones share the same run queue and process table.
#[derive(Clone)]
pub struct Scheduler {
    inner: Rc<Inner>,
}

struct Inner {
    cfg: Config,
    bus: Bus,
    host: RefCell<Option<Rc<dyn Host>>>,
    table: RefCell<HashMap<ProcessId, Process>>,
    queue: RefCell<VecDeque<ProcessId>>,
    working: Cell<bool>,
    until_idle: Cell<bool>,
    next_id: Cell<u64>,
    next_epoch: Cell<u64>,
}

/// Marks a drain in progress; clears the flag even if a drain unwinds.
struct WorkingGuard<'a>(&'a Inner);

impl<'a> WorkingGuard<'a> {
    fn enter(inner: &'a Inner) -> Self {
        inner.working.set(true);
        Self(inner)
    }
}

impl Drop for WorkingGuard<'_> {
    fn drop(&mut self) {
        self.0.working.set(false);
    }
}

/// Untyped capability to continue a process suspended on a binding.
pub(crate) struct Resume {
    scheduler: Weak<Inner>,
    process: ProcessId,
    epoch: u64,
}

impl Resume {
    pub(crate) fn resume(self, node: Node) {
        if let Some(inner) = self.scheduler.upgrade() {
            Scheduler { inner }.resume(self.process, self.epoch, node);
        }
    }

    pub(crate) fn process(&self) -> ProcessId {
        self.process
    }

    pub(crate) fn scheduler(&self) -> Option<Scheduler> {
        self.scheduler.upgrade().map(|inner| Scheduler { inner })
    }
}

impl Scheduler {
    /// Creates a scheduler without a host: budget-exhausted work stays queued
    /// until [`run_pending`](Self::run_pending) is called again.
    pub fn new(cfg: Config, bus: Bus) -> Self {
        Self {
            inner: Rc::new(Inner {
                cfg,
                bus,
                host: RefCell::new(None),
                table: RefCell::new(HashMap::new()),
                queue: RefCell::new(VecDeque::new()),
                working: Cell::new(false),
                until_idle: Cell::new(false),
                next_id: Cell::new(0),
                next_epoch: Cell::new(0),
            }),
        }
    }

    /// Installs the host that resumes yielded drains.
    pub fn set_host(&self, host: Rc<dyn Host>) {
        *self.inner.host.borrow_mut() = Some(host);
    }

    /// Without a host, keeps draining until the queue is empty instead of
    /// stopping at the first spent budget.
    ///
    /// Budget slices still apply: each one re-queues the running process at the
    /// back and publishes `StepBudgetExhausted`. An installed host takes precedence.
    pub fn set_drain_until_idle(&self, on: bool) {
        self.inner.until_idle.set(on);
    }

    /// Event bus this scheduler publishes to.
    pub fn bus(&self) -> &Bus {
        &self.inner.bus
    }

    /// Configuration this scheduler was built with.
    pub fn config(&self) -> &Config {
        &self.inner.cfg
    }

    /// Installs `task` as the root of a new process and queues it.
    ///
    /// The returned id is valid for [`send`](Self::send)/[`kill`](Self::kill)
    /// right away. When no drain is running, the process is stepped before
    /// `spawn` returns.
    pub fn spawn<E: 'static, T: 'static>(&self, task: Task<E, T>) -> ProcessId {
        let id = self.inner.next_id.get();
        self.inner.next_id.set(id + 1);
        let pid = ProcessId(id);

        self.inner
            .table
            .borrow_mut()
            .insert(pid, Process::new(task.into_node()));
        self.publish(Event::new(EventKind::ProcessSpawned).with_process(pid));
        self.enqueue(pid);
        pid
    }

    /// Appends `msg` to the mailbox of `pid`, waking it if it is parked on `receive`.
    ///
    /// Delivery order per process is FIFO. Sending to a removed process publishes
    /// `MessageDropped` and otherwise does nothing.
    pub fn send<M: 'static>(&self, pid: ProcessId, msg: M) {
        let wake = {
            let mut table = self.inner.table.borrow_mut();
            table.get_mut(&pid).map(|p| {
                p.mailbox.push_back(Box::new(msg));
                if p.status == Status::Parked {
                    p.status = Status::Runnable;
                    true
                } else {
                    false
                }
            })
        };
        match wake {
            Some(true) => self.enqueue(pid),
            Some(false) => {}
            None => self.publish(Event::new(EventKind::MessageDropped).with_process(pid)),
        }
    }

    /// Kills `pid`: drops its root, stack and mailbox and runs the cancel thunk of
    /// the binding it is suspended on. Idempotent.
    pub fn kill(&self, pid: ProcessId) {
        let removed = self.inner.table.borrow_mut().remove(&pid);
        let Some(mut process) = removed else {
            return;
        };
        let cancel = process.cancel.take();
        drop(process);

        if let Some(cancel) = cancel {
            cancel.run();
        }
        self.publish(Event::new(EventKind::ProcessKilled).with_process(pid));
    }

    /// Whether `pid` still exists (queued, suspended or parked).
    pub fn is_alive(&self, pid: ProcessId) -> bool {
        self.inner.table.borrow().contains_key(&pid)
    }

    /// Number of live processes.
    pub fn process_count(&self) -> usize {
        self.inner.table.borrow().len()
    }

    /// Whether the run queue holds work.
    pub fn has_pending(&self) -> bool {
        !self.inner.queue.borrow().is_empty()
    }

    /// Steps queued processes until the queue is empty or the step budget is spent.
    ///
    /// With [`set_drain_until_idle`](Self::set_drain_until_idle) and no host, a
    /// spent budget starts the next slice instead of returning.
    pub fn run_pending(&self) -> Drain {
        if self.inner.working.get() {
            return Drain::Busy;
        }
        loop {
            let drain = {
                let _working = WorkingGuard::enter(&self.inner);
                self.drain_queue()
            };
            if drain != Drain::Yielded || self.defer_rest() || !self.inner.until_idle.get() {
                return drain;
            }
        }
    }

    /// Runs `f` with draining held back, then drains once.
    ///
    /// Every process woken inside `f` is queued before any of them is stepped.
    pub(crate) fn hold<R>(&self, f: impl FnOnce() -> R) -> R {
        if self.inner.working.get() {
            return f();
        }
        let out = {
            let _working = WorkingGuard::enter(&self.inner);
            f()
        };
        self.run_pending();
        out
    }

    fn drain_queue(&self) -> Drain {
        let mut budget = self.inner.cfg.step_budget_clamped();
        loop {
            let next = self.inner.queue.borrow_mut().pop_front();
            let Some(pid) = next else {
                return Drain::Idle;
            };
            let live = match self.inner.table.borrow_mut().get_mut(&pid) {
                Some(p) => {
                    p.queued = false;
                    true
                }
                None => false,
            };
            if !live {
                continue;
            }

            self.step(pid, &mut budget);
            if budget == 0 && self.has_pending() {
                return Drain::Yielded;
            }
        }
    }

    /// Hands the rest of the queue to the host; `false` when there is none.
    fn defer_rest(&self) -> bool {
        let host = self.inner.host.borrow().clone();
        let Some(host) = host else {
            return false;
        };
        let weak = Rc::downgrade(&self.inner);
        host.defer(Box::new(move || {
            if let Some(inner) = weak.upgrade() {
                Scheduler { inner }.run_pending();
            }
        }));
        true
    }

    /// Queues `pid` unless already queued; starts a drain when none is running.
    fn enqueue(&self, pid: ProcessId) {
        let fresh = match self.inner.table.borrow_mut().get_mut(&pid) {
            Some(p) if !p.queued => {
                p.queued = true;
                true
            }
            _ => false,
        };
        if fresh {
            self.inner.queue.borrow_mut().push_back(pid);
        }
        if !self.inner.working.get() {
            self.run_pending();
        }
    }

    fn step(&self, pid: ProcessId, budget: &mut usize) {
        loop {
            if *budget == 0 {
                self.publish(
                    Event::new(EventKind::StepBudgetExhausted)
                        .with_process(pid)
                        .with_count(self.inner.cfg.step_budget_clamped()),
                );
                self.enqueue(pid);
                return;
            }
            let Some(node) = self.take_root(pid) else {
                return;
            };
            *budget -= 1;

            let next = match node {
                Node::Succeed(value) => match self.unwind(pid, FrameKind::Chain) {
                    Some(cont) => invoke("continuation", cont, value),
                    None => return self.finish(pid, Outcome::Succeeded),
                },
                Node::Fail(error) => match self.unwind(pid, FrameKind::OnError) {
                    Some(handler) => invoke("continuation", handler, error),
                    None => return self.finish(pid, Outcome::Failed),
                },
                Node::Chain(cont, inner) => {
                    self.push_frame(pid, FrameKind::Chain, cont);
                    Ok(inner.into_node())
                }
                Node::OnError(handler, inner) => {
                    self.push_frame(pid, FrameKind::OnError, handler);
                    Ok(inner.into_node())
                }
                Node::Binding(registrar) => return self.suspend(pid, registrar),
                Node::Receive(handler) => match self.next_message(pid) {
                    Some(msg) => invoke("receive", handler, msg),
                    None => return self.park(pid, handler),
                },
            };

            match next {
                Ok(node) => {
                    if !self.install(pid, node) {
                        return;
                    }
                }
                Err(err) => return self.crash(pid, err),
            }
        }
    }

    fn take_root(&self, pid: ProcessId) -> Option<Node> {
        self.inner
            .table
            .borrow_mut()
            .get_mut(&pid)
            .and_then(|p| p.root.take())
    }

    fn unwind(&self, pid: ProcessId, kind: FrameKind) -> Option<Cont> {
        self.inner
            .table
            .borrow_mut()
            .get_mut(&pid)
            .and_then(|p| p.stack.unwind(kind))
    }

    fn push_frame(&self, pid: ProcessId, kind: FrameKind, cont: Cont) {
        if let Some(p) = self.inner.table.borrow_mut().get_mut(&pid) {
            p.stack.push(kind, cont);
        }
    }

    fn next_message(&self, pid: ProcessId) -> Option<Value> {
        self.inner
            .table
            .borrow_mut()
            .get_mut(&pid)
            .and_then(|p| p.mailbox.pop_front())
    }

    /// Stores the next root; `false` if the process was killed meanwhile.
    fn install(&self, pid: ProcessId, node: Node) -> bool {
        let orphan = match self.inner.table.borrow_mut().get_mut(&pid) {
            Some(p) => {
                p.root = Some(node);
                None
            }
            None => Some(node),
        };
        orphan.is_none()
    }

    fn park(&self, pid: ProcessId, handler: Cont) {
        if let Some(p) = self.inner.table.borrow_mut().get_mut(&pid) {
            p.root = Some(Node::Receive(handler));
            p.status = Status::Parked;
        }
    }

    fn suspend(&self, pid: ProcessId, registrar: Registrar) {
        let epoch = self.inner.next_epoch.get();
        self.inner.next_epoch.set(epoch + 1);

        match self.inner.table.borrow_mut().get_mut(&pid) {
            Some(p) => p.status = Status::Suspended { epoch },
            None => return,
        }

        let resume = Resume {
            scheduler: Rc::downgrade(&self.inner),
            process: pid,
            epoch,
        };
        match catch_unwind(AssertUnwindSafe(move || registrar(resume))) {
            Ok(cancel) => self.arm(pid, epoch, cancel),
            Err(payload) => self.crash(
                pid,
                ProcessError::Panicked {
                    stage: "binding",
                    info: panic_info(payload),
                },
            ),
        }
    }

    /// Stores the cancel thunk of a binding that is still pending.
    ///
    /// A thunk for a binding that already resolved is dropped unused; one for a
    /// process killed during registration runs immediately.
    fn arm(&self, pid: ProcessId, epoch: u64, cancel: Option<Cancel>) {
        let Some(cancel) = cancel else {
            return;
        };
        let orphan = match self.inner.table.borrow_mut().get_mut(&pid) {
            Some(p) if p.status == (Status::Suspended { epoch }) => {
                p.cancel = Some(cancel);
                None
            }
            Some(_) => None,
            None => Some(cancel),
        };
        if let Some(cancel) = orphan {
            cancel.run();
        }
    }

    fn resume(&self, pid: ProcessId, epoch: u64, node: Node) {
        let (accepted, stale) = match self.inner.table.borrow_mut().get_mut(&pid) {
            Some(p) if p.status == (Status::Suspended { epoch }) => {
                p.root = Some(node);
                p.status = Status::Runnable;
                (true, p.cancel.take())
            }
            _ => (false, None),
        };
        drop(stale);
        if accepted {
            self.enqueue(pid);
        }
    }

    fn finish(&self, pid: ProcessId, outcome: Outcome) {
        let removed = self.inner.table.borrow_mut().remove(&pid);
        if removed.is_some() {
            let kind = match outcome {
                Outcome::Succeeded => EventKind::ProcessCompleted,
                Outcome::Failed => EventKind::ProcessFailed,
            };
            self.publish(Event::new(kind).with_process(pid));
        }
    }

    fn crash(&self, pid: ProcessId, err: ProcessError) {
        let removed = self.inner.table.borrow_mut().remove(&pid);
        if removed.is_some() {
            self.publish(
                Event::new(EventKind::ProcessCrashed)
                    .with_process(pid)
                    .with_reason(err.as_message()),
            );
        }
    }

    fn publish(&self, ev: Event) {
        self.inner.bus.publish(ev);
    }
}

/// Runs a continuation, turning a panic into a process error.
fn invoke(stage: &'static str, cont: Cont, value: Value) -> Result<Node, ProcessError> {
    catch_unwind(AssertUnwindSafe(move || cont(value))).unwrap_or_else(|payload| {
        Err(ProcessError::Panicked {
            stage,
            info: panic_info(payload),
        })
    })
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use tokio::sync::broadcast::Receiver;

    use super::*;
    use crate::core::host::TokioHost;
    use crate::tasks::{Never, Resolver};

    fn scheduler(step_budget: usize) -> Scheduler {
        Scheduler::new(
            Config {
                step_budget,
                ..Config::default()
            },
            Bus::new(256),
        )
    }

    fn kinds(rx: &mut Receiver<Event>) -> Vec<EventKind> {
        let mut out = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            out.push(ev.kind);
        }
        out
    }

    /// Receives `n` messages, appending each to `log`.
    fn collector(n: usize, log: Rc<RefCell<Vec<&'static str>>>) -> Task<Never, ()> {
        if n == 0 {
            return Task::succeed(());
        }
        Task::receive(move |msg: &'static str| {
            log.borrow_mut().push(msg);
            collector(n - 1, log)
        })
    }

    #[test]
    fn mailbox_is_fifo_for_parked_receiver() {
        let sched = scheduler(10_000);
        let log = Rc::new(RefCell::new(Vec::new()));
        let pid = sched.spawn(collector(3, log.clone()));
        assert!(sched.is_alive(pid));

        sched.send(pid, "m1");
        sched.send(pid, "m2");
        sched.send(pid, "m3");

        assert_eq!(*log.borrow(), vec!["m1", "m2", "m3"]);
        assert!(!sched.is_alive(pid));
    }

    #[test]
    fn messages_sent_before_first_receive_are_kept() {
        let sched = scheduler(10_000);
        let log = Rc::new(RefCell::new(Vec::new()));
        let slot: Rc<RefCell<Option<Resolver<Never, ()>>>> = Rc::new(RefCell::new(None));
        let hold = slot.clone();

        let gate = Task::binding(move |r| {
            *hold.borrow_mut() = Some(r);
            None
        });
        let pid = sched.spawn(gate.and_then({
            let log = log.clone();
            move |()| collector(2, log)
        }));

        sched.send(pid, "early-1");
        sched.send(pid, "early-2");
        assert!(log.borrow().is_empty());

        slot.borrow_mut().take().unwrap().succeed(());
        assert_eq!(*log.borrow(), vec!["early-1", "early-2"]);
    }

    #[test]
    fn binding_suspends_until_resolved() {
        let sched = scheduler(10_000);
        let slot: Rc<RefCell<Option<Resolver<String, u32>>>> = Rc::new(RefCell::new(None));
        let hold = slot.clone();
        let seen = Rc::new(Cell::new(0));
        let out = seen.clone();

        let task = Task::binding(move |r| {
            *hold.borrow_mut() = Some(r);
            None
        })
        .map(|n: u32| n + 1)
        .on_error(|_| Task::<Never, u32>::succeed(0))
        .map(move |n| out.set(n));

        let pid = sched.spawn(task);
        assert!(sched.is_alive(pid));
        assert_eq!(seen.get(), 0);

        let resolver = slot.borrow_mut().take().unwrap();
        assert_eq!(resolver.process(), pid);
        resolver.succeed(41);

        assert_eq!(seen.get(), 42);
        assert!(!sched.is_alive(pid));
    }

    #[test]
    fn kill_runs_cancel_exactly_once() {
        let sched = scheduler(10_000);
        let mut rx = sched.bus().subscribe();
        let cancels = Rc::new(Cell::new(0));
        let counter = cancels.clone();
        let slot: Rc<RefCell<Option<Resolver<Never, ()>>>> = Rc::new(RefCell::new(None));
        let hold = slot.clone();
        let continued = Rc::new(Cell::new(false));
        let flag = continued.clone();

        let task = Task::binding(move |r| {
            *hold.borrow_mut() = Some(r);
            Some(Cancel::new(move || counter.set(counter.get() + 1)))
        })
        .map(move |()| flag.set(true));

        let pid = sched.spawn(task);
        sched.kill(pid);
        sched.kill(pid);
        assert_eq!(cancels.get(), 1);
        assert!(!sched.is_alive(pid));

        slot.borrow_mut().take().unwrap().succeed(());
        sched.send(pid, "late");
        assert!(!continued.get());

        let seen = kinds(&mut rx);
        assert_eq!(
            seen,
            vec![
                EventKind::ProcessSpawned,
                EventKind::ProcessKilled,
                EventKind::MessageDropped
            ]
        );
    }

    #[test]
    fn synchronous_resolve_drops_cancel_unused() {
        let sched = scheduler(10_000);
        let cancelled = Rc::new(Cell::new(false));
        let flag = cancelled.clone();

        let task = Task::<Never, u8>::binding(move |r| {
            r.succeed(1);
            Some(Cancel::new(move || flag.set(true)))
        });
        let pid = sched.spawn(task);

        assert!(!sched.is_alive(pid));
        assert!(!cancelled.get());
    }

    #[test]
    fn kill_during_registration_runs_returned_cancel() {
        let sched = scheduler(10_000);
        let cancelled = Rc::new(Cell::new(false));
        let flag = cancelled.clone();

        let task = Task::<Never, ()>::binding(move |r| {
            let me = r.process();
            r.scheduler().unwrap().kill(me);
            Some(Cancel::new(move || flag.set(true)))
        });
        let pid = sched.spawn(task);

        assert!(!sched.is_alive(pid));
        assert!(cancelled.get());
    }

    #[test]
    fn budget_exhaustion_yields_and_requeues() {
        let sched = scheduler(10);
        let mut rx = sched.bus().subscribe();
        let result = Rc::new(Cell::new(0_u32));
        let out = result.clone();

        let mut task = Task::<Never, u32>::succeed(0);
        for _ in 0..100 {
            task = task.map(|n| n + 1);
        }
        let pid = sched.spawn(task.map(move |n| out.set(n)));

        assert!(sched.is_alive(pid));
        assert!(sched.has_pending());

        let mut yields = 0;
        while sched.run_pending() == Drain::Yielded {
            yields += 1;
        }
        assert!(yields > 10);
        assert_eq!(result.get(), 100);
        assert!(!sched.is_alive(pid));
        assert!(kinds(&mut rx).contains(&EventKind::StepBudgetExhausted));
    }

    #[test]
    fn drain_until_idle_finishes_long_chains_in_one_call() {
        let sched = scheduler(10);
        sched.set_drain_until_idle(true);
        let mut rx = sched.bus().subscribe();
        let result = Rc::new(Cell::new(0_u32));
        let out = result.clone();

        let mut task = Task::<Never, u32>::succeed(0);
        for _ in 0..100 {
            task = task.map(|n| n + 1);
        }
        let pid = sched.spawn(task.map(move |n| out.set(n)));

        assert_eq!(result.get(), 100);
        assert!(!sched.is_alive(pid));
        assert!(!sched.has_pending());
        let exhausted = kinds(&mut rx)
            .into_iter()
            .filter(|k| *k == EventKind::StepBudgetExhausted)
            .count();
        assert!(exhausted > 10);
    }

    #[test]
    fn killing_an_unstepped_deep_process_is_safe() {
        let sched = scheduler(10_000);
        let deep = crate::tasks::sequence((0..200_000_u32).map(Task::<Never, u32>::succeed));
        sched.hold(|| {
            let pid = sched.spawn(deep);
            sched.kill(pid);
        });
        assert_eq!(sched.process_count(), 0);
    }

    #[test]
    fn exhausted_process_goes_to_back_of_queue() {
        let sched = scheduler(3);
        let order = Rc::new(RefCell::new(Vec::new()));

        let long = {
            let order = order.clone();
            Task::<Never, u8>::succeed(0)
                .map(|n| n)
                .map(|n| n)
                .map(|n| n)
                .map(move |_| order.borrow_mut().push("long"))
        };
        let short = {
            let order = order.clone();
            Task::<Never, ()>::from_fn(move || {
                order.borrow_mut().push("short");
                Ok(())
            })
        };

        // Queue both before draining so they share one budget.
        let gate = Task::<Never, ()>::from_fn(|| Ok(()));
        let sched2 = sched.clone();
        sched.spawn(gate.and_then(move |()| {
            sched2.spawn(long);
            sched2.spawn(short);
            Task::succeed(())
        }));
        while sched.run_pending() == Drain::Yielded {}

        assert_eq!(*order.borrow(), vec!["short", "long"]);
    }

    #[test]
    fn panic_crashes_only_the_offending_process() {
        let sched = scheduler(10_000);
        let mut rx = sched.bus().subscribe();

        let bad = sched.spawn(Task::<Never, u8>::succeed(1).map(|_| -> u8 {
            panic!("kaboom")
        }));
        let survived = Rc::new(Cell::new(false));
        let flag = survived.clone();
        let good = sched.spawn(Task::<Never, ()>::from_fn(move || {
            flag.set(true);
            Ok(())
        }));

        assert!(!sched.is_alive(bad));
        assert!(!sched.is_alive(good));
        assert!(survived.get());

        let crash = std::iter::from_fn(|| rx.try_recv().ok())
            .find(|ev| ev.kind == EventKind::ProcessCrashed)
            .unwrap();
        assert_eq!(crash.process, Some(bad));
        assert_eq!(crash.reason.as_deref(), Some("panic in continuation: kaboom"));
    }

    #[test]
    fn panicking_registrar_is_fatal_to_its_process() {
        let sched = scheduler(10_000);
        let pid = sched.spawn(Task::<Never, ()>::binding(|_r| panic!("registrar")));
        assert!(!sched.is_alive(pid));
        assert_eq!(sched.process_count(), 0);
    }

    #[test]
    fn unexpected_message_type_crashes_receiver() {
        let sched = scheduler(10_000);
        let mut rx = sched.bus().subscribe();
        let pid = sched.spawn(Task::<Never, ()>::receive(|_: String| Task::succeed(())));
        sched.send(pid, 5_u64);

        assert!(!sched.is_alive(pid));
        assert!(kinds(&mut rx).contains(&EventKind::ProcessCrashed));
    }

    #[test]
    fn uncaught_failure_is_reported() {
        let sched = scheduler(10_000);
        let mut rx = sched.bus().subscribe();
        sched.spawn(Task::<&str, ()>::fail("unhandled"));
        assert!(kinds(&mut rx).contains(&EventKind::ProcessFailed));
    }

    #[test]
    fn run_pending_inside_a_step_is_busy() {
        let sched = scheduler(10_000);
        let inner = sched.clone();
        let seen = Rc::new(Cell::new(None));
        let out = seen.clone();
        sched.spawn(Task::<Never, ()>::from_fn(move || {
            out.set(Some(inner.run_pending()));
            Ok(())
        }));
        assert_eq!(seen.get(), Some(Drain::Busy));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn tokio_host_resumes_yielded_work() {
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let sched = scheduler(5);
                sched.set_host(Rc::new(TokioHost));
                let done = Rc::new(Cell::new(false));
                let flag = done.clone();

                let mut task = Task::<Never, u32>::succeed(0);
                for _ in 0..50 {
                    task = task.map(|n| n + 1);
                }
                sched.spawn(task.map(move |n| flag.set(n == 50)));
                assert!(!done.get());

                for _ in 0..200 {
                    if done.get() {
                        break;
                    }
                    tokio::task::yield_now().await;
                }
                assert!(done.get());
            })
            .await;
    }
}
