//! # Typed task descriptions and combinators.
//!
//! [`Task<E, T>`] describes a suspendable computation that either fails with `E`
//! or succeeds with `T`. Building a task never runs anything: side effects only
//! happen while the [`Scheduler`] is stepping the process that owns the task.
//!
//! ```text
//! Task::succeed(1)                      ──► Succeed
//!     .and_then(|n| Task::fail(n))      ──► Chain(k, ·)
//!     .on_error(|e| Task::succeed(e))   ──► OnError(h, ·)
//! ```
//!
//! The only suspension points are [`Task::binding`] (waiting on an external
//! callback) and [`Task::receive`] (waiting on mailbox input). Everything else
//! runs to completion within one scheduler turn, bounded by the step budget.
//!
//! ## Example
//! ```rust
//! use effectvisor::{Bus, Config, Scheduler, Task};
//!
//! let scheduler = Scheduler::new(Config::default(), Bus::new(16));
//! let task: Task<String, u32> = Task::succeed(20)
//!     .map(|n| n + 1)
//!     .and_then(|n| if n > 100 { Task::fail("too big".into()) } else { Task::succeed(n * 2) });
//!
//! let pid = scheduler.spawn(task);
//! assert!(!scheduler.is_alive(pid)); // ran to completion synchronously
//! ```

use std::fmt;
use std::marker::PhantomData;

use crate::core::{ProcessId, Resume, Scheduler};
use crate::tasks::node::{Nested, Node, take, take_message};

/// Error type of tasks that cannot fail.
pub type Never = std::convert::Infallible;

/// Cancel thunk returned by a binding registrar.
///
/// Invoked at most once, when the process suspended on the binding is killed.
pub struct Cancel(Box<dyn FnOnce()>);

impl Cancel {
    /// Wraps a cleanup closure.
    pub fn new(f: impl FnOnce() + 'static) -> Self {
        Self(Box::new(f))
    }

    pub(crate) fn run(self) {
        (self.0)()
    }
}

impl fmt::Debug for Cancel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Cancel")
    }
}

/// Description of a computation failing with `E` or succeeding with `T`.
#[must_use = "tasks do nothing unless spawned or returned to the runtime"]
pub struct Task<E, T> {
    node: Node,
    _ty: PhantomData<fn() -> (E, T)>,
}

impl<E: 'static, T: 'static> Task<E, T> {
    pub(crate) fn from_node(node: Node) -> Self {
        Self {
            node,
            _ty: PhantomData,
        }
    }

    pub(crate) fn into_node(self) -> Node {
        self.node
    }

    /// A task that immediately succeeds with `value`.
    pub fn succeed(value: T) -> Self {
        Self::from_node(Node::Succeed(Box::new(value)))
    }

    /// A task that immediately fails with `error`.
    pub fn fail(error: E) -> Self {
        Self::from_node(Node::Fail(Box::new(error)))
    }

    /// Continues with `f` once this task succeeds; failures skip `f`.
    pub fn and_then<U, F>(self, f: F) -> Task<E, U>
    where
        U: 'static,
        F: FnOnce(T) -> Task<E, U> + 'static,
    {
        let cont = Box::new(move |value| Ok(f(take::<T>(value)?).node));
        Task::from_node(Node::Chain(cont, Nested::new(self.node)))
    }

    /// Transforms the success value.
    pub fn map<U, F>(self, f: F) -> Task<E, U>
    where
        U: 'static,
        F: FnOnce(T) -> U + 'static,
    {
        self.and_then(move |value| Task::succeed(f(value)))
    }

    /// Recovers from a failure with `f`; successes skip `f`.
    pub fn on_error<E2, F>(self, f: F) -> Task<E2, T>
    where
        E2: 'static,
        F: FnOnce(E) -> Task<E2, T> + 'static,
    {
        let handler = Box::new(move |error| Ok(f(take::<E>(error)?).node));
        Task::from_node(Node::OnError(handler, Nested::new(self.node)))
    }

    /// Transforms the failure value.
    pub fn map_err<E2, F>(self, f: F) -> Task<E2, T>
    where
        E2: 'static,
        F: FnOnce(E) -> E2 + 'static,
    {
        self.on_error(move |error| Task::fail(f(error)))
    }

    /// Suspends on an external callback.
    ///
    /// `registrar` is invoked while the owning process is stepped. It receives a
    /// [`Resolver`] that continues the process later, and may return a [`Cancel`]
    /// thunk which runs if the process is killed while still waiting.
    pub fn binding<F>(registrar: F) -> Self
    where
        F: FnOnce(Resolver<E, T>) -> Option<Cancel> + 'static,
    {
        Self::from_node(Node::Binding(Box::new(move |resume| {
            registrar(Resolver::new(resume))
        })))
    }

    /// Waits for the next message in the owning process's mailbox.
    ///
    /// A message of a type other than `M` is an engine failure: the process crashes.
    pub fn receive<M, F>(handler: F) -> Self
    where
        M: 'static,
        F: FnOnce(M) -> Task<E, T> + 'static,
    {
        Self::from_node(Node::Receive(Box::new(move |msg| {
            Ok(handler(take_message::<M>(msg)?).node)
        })))
    }

    /// Runs a synchronous side effect as a binding that resolves immediately.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: FnOnce() -> Result<T, E> + 'static,
    {
        Self::binding(move |resolver| {
            match f() {
                Ok(value) => resolver.succeed(value),
                Err(error) => resolver.fail(error),
            }
            None
        })
    }
}

impl<T: 'static> Task<Never, T> {
    /// Reinterprets a task that cannot fail as one with any error type.
    pub fn lift<X: 'static>(self) -> Task<X, T> {
        Task::from_node(self.node)
    }
}

/// Capability to continue a process suspended on a [`Task::binding`].
///
/// Consumed by the first call to [`resolve`](Self::resolve). Resolving after the
/// process was killed, or after it already moved on, does nothing.
pub struct Resolver<E, T> {
    resume: Resume,
    _ty: PhantomData<fn() -> (E, T)>,
}

impl<E: 'static, T: 'static> Resolver<E, T> {
    fn new(resume: Resume) -> Self {
        Self {
            resume,
            _ty: PhantomData,
        }
    }

    /// Continues the suspended process with `task` as its new root.
    pub fn resolve(self, task: Task<E, T>) {
        self.resume.resume(task.node);
    }

    /// Continues the suspended process with a success.
    pub fn succeed(self, value: T) {
        self.resolve(Task::succeed(value));
    }

    /// Continues the suspended process with a failure.
    pub fn fail(self, error: E) {
        self.resolve(Task::fail(error));
    }

    /// Id of the suspended process.
    pub fn process(&self) -> ProcessId {
        self.resume.process()
    }

    /// Scheduler the process lives on, unless it was dropped.
    pub fn scheduler(&self) -> Option<Scheduler> {
        self.resume.scheduler()
    }
}

/// Free-function form of [`Task::succeed`].
pub fn succeed<E: 'static, T: 'static>(value: T) -> Task<E, T> {
    Task::succeed(value)
}

/// Free-function form of [`Task::fail`].
pub fn fail<E: 'static, T: 'static>(error: E) -> Task<E, T> {
    Task::fail(error)
}

/// `chain(f, task)`: free-function form of [`Task::and_then`].
pub fn chain<E, T, U, F>(f: F, task: Task<E, T>) -> Task<E, U>
where
    E: 'static,
    T: 'static,
    U: 'static,
    F: FnOnce(T) -> Task<E, U> + 'static,
{
    task.and_then(f)
}

/// `map(f, task)`: free-function form of [`Task::map`].
pub fn map<E, T, U, F>(f: F, task: Task<E, T>) -> Task<E, U>
where
    E: 'static,
    T: 'static,
    U: 'static,
    F: FnOnce(T) -> U + 'static,
{
    task.map(f)
}

/// `on_error(f, task)`: free-function form of [`Task::on_error`].
pub fn on_error<E, E2, T, F>(f: F, task: Task<E, T>) -> Task<E2, T>
where
    E: 'static,
    E2: 'static,
    T: 'static,
    F: FnOnce(E) -> Task<E2, T> + 'static,
{
    task.on_error(f)
}

/// Runs `a` then `b` and combines their results; the first failure wins.
pub fn map2<E, A, B, C, F>(f: F, a: Task<E, A>, b: Task<E, B>) -> Task<E, C>
where
    E: 'static,
    A: 'static,
    B: 'static,
    C: 'static,
    F: FnOnce(A, B) -> C + 'static,
{
    a.and_then(move |x| b.map(move |y| f(x, y)))
}

/// Runs tasks left to right, collecting results; stops at the first failure.
pub fn sequence<E, T, I>(tasks: I) -> Task<E, Vec<T>>
where
    E: 'static,
    T: 'static,
    I: IntoIterator<Item = Task<E, T>>,
{
    tasks
        .into_iter()
        .fold(Task::succeed(Vec::new()), |acc, task| {
            acc.and_then(move |mut done| {
                task.map(move |value| {
                    done.push(value);
                    done
                })
            })
        })
}

/// Spawns `task` as a new process and succeeds with its id.
///
/// The task must be total: eliminate its error with `on_error` first.
pub fn spawn<X: 'static, T: 'static>(task: Task<Never, T>) -> Task<X, ProcessId> {
    Task::binding(move |resolver: Resolver<X, ProcessId>| {
        if let Some(scheduler) = resolver.scheduler() {
            let pid = scheduler.spawn(task);
            resolver.succeed(pid);
        }
        None
    })
}

/// Kills a process. Killing a dead process is a no-op.
pub fn kill<X: 'static>(process: ProcessId) -> Task<X, ()> {
    Task::binding(move |resolver: Resolver<X, ()>| {
        if let Some(scheduler) = resolver.scheduler() {
            scheduler.kill(process);
            resolver.succeed(());
        }
        None
    })
}

/// Appends `msg` to a process's mailbox. Sending to a dead process is a no-op.
pub fn send<X: 'static, M: 'static>(process: ProcessId, msg: M) -> Task<X, ()> {
    Task::binding(move |resolver: Resolver<X, ()>| {
        if let Some(scheduler) = resolver.scheduler() {
            scheduler.send(process, msg);
            resolver.succeed(());
        }
        None
    })
}

/// Succeeds with the id of the process running this task.
pub fn self_process<X: 'static>() -> Task<X, ProcessId> {
    Task::binding(|resolver: Resolver<X, ProcessId>| {
        let pid = resolver.process();
        resolver.succeed(pid);
        None
    })
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use super::*;
    use crate::test_support::run;

    #[test]
    fn left_identity() {
        let f = |n: u32| Task::<String, u32>::succeed(n * 3);
        assert_eq!(run(chain(f, Task::succeed(4))), Some(Ok(12)));
        assert_eq!(run(f(4)), Some(Ok(12)));
    }

    #[test]
    fn right_identity() {
        let t = || Task::<String, u32>::succeed(9).map(|n| n + 1);
        assert_eq!(run(chain(Task::succeed, t())), run(t()));

        let failing = || Task::<String, u32>::fail("nope".into());
        assert_eq!(run(chain(Task::succeed, failing())), run(failing()));
    }

    #[test]
    fn associativity() {
        let f = |n: u32| Task::<String, u32>::succeed(n + 1);
        let g = |n: u32| {
            if n > 10 {
                Task::<String, u32>::fail(format!("{n} too big"))
            } else {
                Task::succeed(n * 2)
            }
        };
        for start in [1_u32, 10] {
            let left = chain(g, chain(f, Task::succeed(start)));
            let right = chain(move |v| chain(g, f(v)), Task::succeed(start));
            assert_eq!(run(left), run(right));
        }
    }

    #[test]
    fn failure_short_circuits_chain() {
        let called = Rc::new(Cell::new(false));
        let flag = called.clone();
        let task = Task::<&str, u32>::fail("boom").and_then(move |n| {
            flag.set(true);
            Task::succeed(n)
        });
        assert_eq!(run(task), Some(Err("boom")));
        assert!(!called.get());
    }

    #[test]
    fn success_short_circuits_on_error() {
        let called = Rc::new(Cell::new(false));
        let flag = called.clone();
        let task = Task::<&str, u32>::succeed(5).on_error(move |_| {
            flag.set(true);
            Task::<&str, u32>::succeed(0)
        });
        assert_eq!(run(task), Some(Ok(5)));
        assert!(!called.get());
    }

    #[test]
    fn success_lifts_past_error_handler() {
        let called = Rc::new(Cell::new(false));
        let flag = called.clone();
        let inner = Task::<&str, u32>::succeed(7).on_error(move |_| {
            flag.set(true);
            Task::<&str, u32>::succeed(0)
        });
        let task = chain(|v| Task::succeed(v * 10), inner);
        assert_eq!(run(task), Some(Ok(70)));
        assert!(!called.get());
    }

    #[test]
    fn failure_lifts_past_chains_to_handler() {
        let task = Task::<String, u32>::fail("deep".into())
            .map(|n| n + 1)
            .and_then(|n| Task::succeed(n * 2))
            .map_err(|e| e.len())
            .on_error(|len| Task::<Never, u32>::succeed(len as u32));
        assert_eq!(run(task), Some(Ok(4)));
    }

    #[test]
    fn sequence_preserves_order_and_stops_on_failure() {
        let all = sequence((1..=4).map(Task::<&str, u32>::succeed));
        assert_eq!(run(all), Some(Ok(vec![1, 2, 3, 4])));

        let seen = Rc::new(RefCell::new(Vec::new()));
        let tasks = (1..=4).map(|n| {
            let seen = seen.clone();
            Task::<&str, u32>::from_fn(move || {
                seen.borrow_mut().push(n);
                if n == 2 { Err("two") } else { Ok(n) }
            })
        });
        assert_eq!(run(sequence(tasks)), Some(Err("two")));
        assert_eq!(*seen.borrow(), vec![1, 2]);
    }

    #[test]
    fn unrun_deep_sequence_drops_cleanly() {
        let tasks = sequence((0..200_000_u32).map(Task::<Never, u32>::succeed));
        drop(tasks);
    }

    #[test]
    fn map2_combines_in_order() {
        let task = map2(
            |a: u32, b: &str| format!("{a}{b}"),
            Task::<(), u32>::succeed(1),
            Task::succeed("x"),
        );
        assert_eq!(run(task), Some(Ok("1x".to_string())));
    }

    #[test]
    fn from_fn_defers_side_effect_until_stepped() {
        let ran = Rc::new(Cell::new(false));
        let flag = ran.clone();
        let task = Task::<(), ()>::from_fn(move || {
            flag.set(true);
            Ok(())
        });
        assert!(!ran.get());
        assert_eq!(run(task), Some(Ok(())));
        assert!(ran.get());
    }

    #[test]
    fn lift_widens_infallible_error() {
        let task: Task<String, u8> = Task::<Never, u8>::succeed(3).lift();
        assert_eq!(run(task), Some(Ok(3)));
    }
}
