//! # Effect bags.
//!
//! An [`EffectBag`] is a tree of manager-addressed effects: commands
//! ([`Cmd`]) or subscriptions ([`Sub`]). `update` returns a command bag and
//! `subscriptions` a subscription bag; the runtime gathers both once per cycle
//! and hands every manager its share.
//!
//! ```text
//! batch ─┬─ single(task, perform …)          gather (depth-first, left to right)
//!        ├─ none                       ──►   ManagerId(0) → commands [a, c]
//!        └─ batch ─┬─ single(ports, a)       ManagerId(1) → commands [b]
//!                  └─ single(task, c)
//! ```
//!
//! ## Rules
//! - `batch([])` is `none()`, `batch([x])` is `x`; empty children are dropped.
//! - `map(f)` rewrites every leaf eagerly through its manager's
//!   `cmd_map`/`sub_map`, so gathering a mapped bag equals mapping each gathered leaf.
//! - Leaves addressed to a manager missing from the registry are reported and skipped.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;

use crate::effects::message::{Tagger, tagger};
use crate::managers::{Manager, ManagerId, ManagerKey, Registry};

mod sealed {
    pub trait Sealed {
        const COMMANDS: bool;
    }
}

/// Marker distinguishing command bags from subscription bags.
pub trait EffectKind: sealed::Sealed + 'static {}

/// Commands: one-shot effects produced by `update`.
#[derive(Debug)]
pub enum Command {}

/// Subscriptions: standing interest recomputed from the model every cycle.
#[derive(Debug)]
pub enum Subscription {}

impl sealed::Sealed for Command {
    const COMMANDS: bool = true;
}
impl sealed::Sealed for Subscription {
    const COMMANDS: bool = false;
}
impl EffectKind for Command {}
impl EffectKind for Subscription {}

/// Commands producing messages of type `Msg`.
pub type Cmd<Msg> = EffectBag<Command, Msg>;

/// Subscriptions producing messages of type `Msg`.
pub type Sub<Msg> = EffectBag<Subscription, Msg>;

/// Rewrites an erased leaf payload through a tagger.
type LeafMap = fn(Box<dyn Any>, &Tagger) -> Box<dyn Any>;

struct Leaf {
    key: ManagerKey,
    payload: Box<dyn Any>,
    map: LeafMap,
}

enum Bag {
    None,
    Single(Leaf),
    Batch(Vec<Bag>),
}

/// Tree of effects addressed to managers, producing messages of type `Msg`.
#[must_use = "effects do nothing unless returned to the runtime"]
pub struct EffectBag<K: EffectKind, Msg> {
    bag: Bag,
    _ty: PhantomData<fn() -> (K, Msg)>,
}

fn map_cmd<M: Manager>(payload: Box<dyn Any>, tagger: &Tagger) -> Box<dyn Any> {
    match payload.downcast::<M::Cmd>() {
        Ok(cmd) => Box::new(M::cmd_map(tagger, *cmd)),
        Err(other) => other,
    }
}

fn map_sub<M: Manager>(payload: Box<dyn Any>, tagger: &Tagger) -> Box<dyn Any> {
    match payload.downcast::<M::Sub>() {
        Ok(sub) => Box::new(M::sub_map(tagger, *sub)),
        Err(other) => other,
    }
}

impl<Msg: 'static> EffectBag<Command, Msg> {
    /// A single command for manager `M`.
    pub fn single<M: Manager>(cmd: M::Cmd) -> Self {
        Self::leaf(Leaf {
            key: ManagerKey::of::<M>(),
            payload: Box::new(cmd),
            map: map_cmd::<M>,
        })
    }
}

impl<Msg: 'static> EffectBag<Subscription, Msg> {
    /// A single subscription for manager `M`.
    pub fn single<M: Manager>(sub: M::Sub) -> Self {
        Self::leaf(Leaf {
            key: ManagerKey::of::<M>(),
            payload: Box::new(sub),
            map: map_sub::<M>,
        })
    }
}

impl<K: EffectKind, Msg: 'static> EffectBag<K, Msg> {
    fn leaf(leaf: Leaf) -> Self {
        Self::wrap(Bag::Single(leaf))
    }

    fn wrap(bag: Bag) -> Self {
        Self {
            bag,
            _ty: PhantomData,
        }
    }

    /// The empty bag.
    pub fn none() -> Self {
        Self::wrap(Bag::None)
    }

    /// Combines bags; gathering keeps their order.
    pub fn batch(bags: impl IntoIterator<Item = Self>) -> Self {
        let mut children: Vec<Bag> = bags
            .into_iter()
            .map(|b| b.bag)
            .filter(|b| !matches!(b, Bag::None))
            .collect();
        match children.len() {
            0 => Self::none(),
            1 => Self::wrap(children.remove(0)),
            _ => Self::wrap(Bag::Batch(children)),
        }
    }

    /// Whether the bag holds no effects at all.
    pub fn is_none(&self) -> bool {
        matches!(self.bag, Bag::None)
    }

    /// Transforms every message the effects in this bag will produce.
    pub fn map<B, F>(self, f: F) -> EffectBag<K, B>
    where
        B: 'static,
        F: Fn(Msg) -> B + 'static,
    {
        let t = tagger(f);
        EffectBag::wrap(retag(self.bag, &t))
    }

    /// Routes every leaf to its manager, depth-first and left to right.
    pub(crate) fn gather(self, registry: &Registry, into: &mut Gathered) {
        walk::<K>(self.bag, registry, into);
    }
}

impl<K: EffectKind, Msg: 'static> Default for EffectBag<K, Msg> {
    fn default() -> Self {
        Self::none()
    }
}

impl<K: EffectKind, Msg> fmt::Debug for EffectBag<K, Msg> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn shape(bag: &Bag, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match bag {
                Bag::None => f.write_str("none"),
                Bag::Single(leaf) => write!(f, "{}", leaf.key.name()),
                Bag::Batch(children) => {
                    f.write_str("[")?;
                    for (i, child) in children.iter().enumerate() {
                        if i > 0 {
                            f.write_str(", ")?;
                        }
                        shape(child, f)?;
                    }
                    f.write_str("]")
                }
            }
        }
        shape(&self.bag, f)
    }
}

fn retag(bag: Bag, t: &Tagger) -> Bag {
    match bag {
        Bag::None => Bag::None,
        Bag::Single(Leaf { key, payload, map }) => Bag::Single(Leaf {
            key,
            payload: map(payload, t),
            map,
        }),
        Bag::Batch(children) => Bag::Batch(children.into_iter().map(|c| retag(c, t)).collect()),
    }
}

fn walk<K: EffectKind>(bag: Bag, registry: &Registry, into: &mut Gathered) {
    match bag {
        Bag::None => {}
        Bag::Single(leaf) => match registry.resolve(&leaf.key) {
            Some(id) => {
                let effects = into.effects.entry(id).or_default();
                if K::COMMANDS {
                    effects.commands.push(leaf.payload);
                } else {
                    effects.subscriptions.push(leaf.payload);
                }
            }
            None => into.unrouted.push(leaf.key.name()),
        },
        Bag::Batch(children) => {
            for child in children {
                walk::<K>(child, registry, into);
            }
        }
    }
}

/// Erased effects gathered for one manager in one cycle.
#[derive(Default)]
pub(crate) struct Effects {
    pub(crate) commands: Vec<Box<dyn Any>>,
    pub(crate) subscriptions: Vec<Box<dyn Any>>,
}

/// Result of gathering one cycle's bags.
#[derive(Default)]
pub(crate) struct Gathered {
    pub(crate) effects: BTreeMap<ManagerId, Effects>,
    /// Names of managers that had leaves but are not registered.
    pub(crate) unrouted: Vec<&'static str>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::Message;
    use crate::managers::Router;
    use crate::tasks::{Never, Task};

    /// Commands are plain messages; tagging rewrites them.
    struct Probe;

    impl Manager for Probe {
        type State = ();
        type SelfMsg = ();
        type Cmd = Message;
        type Sub = Message;

        fn name() -> &'static str {
            "probe"
        }

        fn init(&self) -> Task<Never, ()> {
            Task::succeed(())
        }

        fn on_effects(
            &self,
            _: Router<Self>,
            _: Vec<Message>,
            _: Vec<Message>,
            state: (),
        ) -> Task<Never, ()> {
            Task::succeed(state)
        }

        fn on_self_msg(&self, _: Router<Self>, _: (), state: ()) -> Task<Never, ()> {
            Task::succeed(state)
        }

        fn cmd_map(tagger: &Tagger, cmd: Message) -> Message {
            tagger(cmd)
        }

        fn sub_map(tagger: &Tagger, sub: Message) -> Message {
            tagger(sub)
        }
    }

    /// Never registered anywhere.
    struct Stray;

    impl Manager for Stray {
        type State = ();
        type SelfMsg = ();
        type Cmd = ();
        type Sub = ();

        fn name() -> &'static str {
            "stray"
        }

        fn init(&self) -> Task<Never, ()> {
            Task::succeed(())
        }

        fn on_effects(
            &self,
            _: Router<Self>,
            _: Vec<()>,
            _: Vec<()>,
            state: (),
        ) -> Task<Never, ()> {
            Task::succeed(state)
        }

        fn on_self_msg(&self, _: Router<Self>, _: (), state: ()) -> Task<Never, ()> {
            Task::succeed(state)
        }
    }

    fn registry() -> (Registry, ManagerId) {
        let mut registry = Registry::new();
        let id = registry.register(Probe).unwrap();
        (registry, id)
    }

    fn probe(n: u32) -> Cmd<u32> {
        Cmd::single::<Probe>(Message::new(n))
    }

    fn commands_of(gathered: &mut Gathered, id: ManagerId) -> Vec<Message> {
        gathered
            .effects
            .remove(&id)
            .map(|e| e.commands)
            .unwrap_or_default()
            .into_iter()
            .map(|p| *p.downcast::<Message>().unwrap())
            .collect()
    }

    #[test]
    fn batch_identities() {
        assert!(Cmd::<u32>::batch([]).is_none());
        assert!(Cmd::<u32>::batch([Cmd::none(), Cmd::none()]).is_none());
        assert_eq!(format!("{:?}", Cmd::batch([probe(1)])), "probe");
        assert_eq!(format!("{:?}", Cmd::batch([Cmd::none(), probe(1)])), "probe");
        assert_eq!(format!("{:?}", Cmd::batch([probe(1), probe(2)])), "[probe, probe]");
    }

    #[test]
    fn gathering_empty_batch_yields_nothing() {
        let (registry, _) = registry();
        let mut gathered = Gathered::default();
        Cmd::<u32>::batch([]).gather(&registry, &mut gathered);
        assert!(gathered.effects.is_empty());
        assert!(gathered.unrouted.is_empty());
    }

    #[test]
    fn gather_is_depth_first_left_to_right() {
        let (registry, id) = registry();
        let bag = Cmd::batch([probe(1), Cmd::batch([probe(2), Cmd::none(), probe(3)]), probe(4)]);
        let mut gathered = Gathered::default();
        bag.gather(&registry, &mut gathered);

        let got: Vec<u32> = commands_of(&mut gathered, id)
            .into_iter()
            .map(|m| m.downcast::<u32>().unwrap())
            .collect();
        assert_eq!(got, vec![1, 2, 3, 4]);
    }

    #[test]
    fn map_commutes_with_gather() {
        let (registry, id) = registry();
        let f = |n: u32| format!("#{n}");

        let mut mapped = Gathered::default();
        Cmd::batch([probe(1), probe(2)]).map(f).gather(&registry, &mut mapped);
        let mapped: Vec<String> = commands_of(&mut mapped, id)
            .into_iter()
            .map(|m| m.downcast::<String>().unwrap())
            .collect();

        let mut plain = Gathered::default();
        Cmd::batch([probe(1), probe(2)]).gather(&registry, &mut plain);
        let plain: Vec<String> = commands_of(&mut plain, id)
            .into_iter()
            .map(|m| f(m.downcast::<u32>().unwrap()))
            .collect();

        assert_eq!(mapped, plain);
    }

    #[test]
    fn map_composes() {
        let (registry, id) = registry();
        let mut gathered = Gathered::default();
        probe(20).map(|n| n + 1).map(|n| n * 2).gather(&registry, &mut gathered);
        let got = commands_of(&mut gathered, id).remove(0).downcast::<u32>().unwrap();
        assert_eq!(got, 42);
    }

    #[test]
    fn subscriptions_land_in_their_own_bucket() {
        let (registry, id) = registry();
        let mut gathered = Gathered::default();
        Sub::<u32>::single::<Probe>(Message::new(7_u32)).gather(&registry, &mut gathered);
        let effects = gathered.effects.remove(&id).unwrap();
        assert!(effects.commands.is_empty());
        assert_eq!(effects.subscriptions.len(), 1);
    }

    #[test]
    fn unregistered_manager_is_reported() {
        let (registry, id) = registry();
        let mut gathered = Gathered::default();
        Cmd::<u32>::batch([Cmd::single::<Stray>(()), probe(1)]).gather(&registry, &mut gathered);
        assert_eq!(gathered.unrouted, vec!["stray"]);
        assert_eq!(commands_of(&mut gathered, id).len(), 1);
    }
}
