//! Typed event key descriptors.
//!
//! An [`EventKey`] names a call or notification and carries its argument and
//! result shapes as phantom type parameters. The shapes never cross the wire;
//! they only let `invoke_to`/`handle` call sites type-check against each other.
//! By convention `Args` is a tuple (including `()` and one-element tuples) so
//! that it serializes to the wire's JSON argument array.

use std::fmt;
use std::marker::PhantomData;

/// Typed identifier for a named call or notification.
///
/// Key names must be unique within one router instance; reusing a name with
/// incompatible shapes is a programming error, not something checked at
/// runtime.
///
/// ```
/// use craft_events::EventKey;
///
/// const GET_TITLE: EventKey<(String,), String> = EventKey::new("window:get-title");
/// assert_eq!(GET_TITLE.name(), "window:get-title");
/// ```
pub struct EventKey<Args = (), Res = ()> {
    name: &'static str,
    _shapes: PhantomData<fn(Args) -> Res>,
}

impl<Args, Res> EventKey<Args, Res> {
    /// Create a key with the given wire name.
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _shapes: PhantomData,
        }
    }

    /// The wire name of this key.
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

// Manual impls: derives would bound Args/Res even though only the name is data.
impl<Args, Res> Clone for EventKey<Args, Res> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<Args, Res> Copy for EventKey<Args, Res> {}

impl<Args, Res> fmt::Debug for EventKey<Args, Res> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EventKey").field(&self.name).finish()
    }
}

impl<Args, Res> PartialEq for EventKey<Args, Res> {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl<Args, Res> Eq for EventKey<Args, Res> {}
