//! # Type-erased application messages.
//!
//! Managers do not know the application's message type; commands and
//! subscriptions carry [`Message`] values and the program downcasts them back
//! when they reach `update`. A [`Tagger`] is the erased form of a
//! `Fn(A) -> B` message transformer applied by `EffectBag::map`.

use std::any::{Any, type_name};
use std::fmt;
use std::rc::Rc;

/// An application message with its type erased.
pub struct Message(Box<dyn Any>);

impl Message {
    /// Erases `value`.
    pub fn new<T: 'static>(value: T) -> Self {
        Self(Box::new(value))
    }

    /// Whether the message holds a `T`.
    pub fn is<T: 'static>(&self) -> bool {
        self.0.is::<T>()
    }

    /// Borrows the message as a `T`.
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }

    /// Recovers the `T`; hands the message back unchanged on mismatch.
    pub fn downcast<T: 'static>(self) -> Result<T, Message> {
        self.0.downcast::<T>().map(|b| *b).map_err(Message)
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Message(..)")
    }
}

/// Erased message transformer.
///
/// Messages of a type other than the one the tagger was built for pass through
/// unchanged.
pub type Tagger = Rc<dyn Fn(Message) -> Message>;

/// Builds a [`Tagger`] from a typed transformer.
pub(crate) fn tagger<A, B, F>(f: F) -> Tagger
where
    A: 'static,
    B: 'static,
    F: Fn(A) -> B + 'static,
{
    Rc::new(move |msg: Message| match msg.downcast::<A>() {
        Ok(a) => Message::new(f(a)),
        Err(other) => other,
    })
}

/// Type name used in rejection reasons.
pub(crate) fn expected<T>() -> &'static str {
    type_name::<T>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downcast_hands_back_on_mismatch() {
        let msg = Message::new(3_u8);
        assert!(msg.is::<u8>());
        let msg = msg.downcast::<String>().unwrap_err();
        assert_eq!(msg.downcast::<u8>().unwrap(), 3);
    }

    #[test]
    fn tagger_rewrites_only_its_input_type() {
        let t = tagger(|n: u8| format!("n={n}"));
        assert_eq!(t(Message::new(4_u8)).downcast::<String>().unwrap(), "n=4");
        assert!(t(Message::new(true)).downcast::<bool>().unwrap());
    }
}
