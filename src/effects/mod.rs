//! Effects: what `update` and `subscriptions` ask the outside world to do.
//!
//! ## Contents
//! - [`EffectBag`], [`Cmd`], [`Sub`] trees of manager-addressed effects
//! - [`Message`] type-erased application message
//! - [`Tagger`] erased message transformer used by `map`

mod bag;
mod message;

pub use bag::{Cmd, Command, EffectBag, EffectKind, Sub, Subscription};
pub use message::{Message, Tagger};

pub(crate) use bag::{Effects, Gathered};
pub(crate) use message::expected;
