//! craft-events - Typed window event routing for Craft Studio apps.
//!
//! A privileged host process and its sandboxed display contexts talk through
//! correlated request/response calls and fire-and-forget notifications, keyed
//! by window identity. The host side is the [`EventHub`]; each attached
//! window holds a [`WindowEvents`] endpoint. Calls are addressed by typed
//! [`EventKey`]s so both ends type-check against one declaration.
//!
//! Error codes: 7000-7099

mod error;
mod hub;
mod key;
mod pending;
mod window;
mod wire;

pub use error::{EventError, EventErrorCode, WireError, WireErrorKind};
pub use hub::{EventHub, HandlerScope, HOST_TARGET};
pub use key::EventKey;
pub use window::WindowEvents;
pub use wire::{Envelope, WireResult};
