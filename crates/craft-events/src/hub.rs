//! Host-side event hub.
//!
//! The [`EventHub`] owns the window registry (window id → live endpoint), the
//! handler registry keyed by `(scope, key)`, and the pending-invocation table
//! for host-issued calls. One pump task per attached window drains that
//! window's outbound channel and dispatches requests, notifications, and
//! response settlements.
//!
//! Handler resolution for a call arriving from window `W` under key `K`:
//! exact `Window(W)` registration first, then `AnyWindow`, else the call is
//! rejected with `NoHandler`. Detaching a window immediately rejects every
//! pending invocation that targets it.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use futures_util::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::EventError;
use crate::key::EventKey;
use crate::pending::PendingTable;
use crate::window::WindowEvents;
use crate::wire::{decode_args, decode_result, encode_args, encode_result, Envelope, WireResult};

/// Reserved target name addressing the host process itself.
pub const HOST_TARGET: &str = "main";

/// Addressing mode for a registered handler.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HandlerScope {
    /// Calls originating from one specific window.
    Window(String),
    /// Calls originating from any window; used for cross-cutting handlers
    /// like log ingestion. Consulted only when no exact match exists.
    AnyWindow,
    /// The implicit host target; display contexts register their handlers
    /// under this scope since calls from the host name no window.
    Host,
}

/// Type-erased async handler: JSON argument array in, JSON value out.
pub(crate) type HandlerFn =
    Arc<dyn Fn(Vec<Value>) -> BoxFuture<'static, Result<Value, EventError>> + Send + Sync>;

/// Wrap a typed async fn into the erased wire form.
pub(crate) fn erase_handler<A, R, F, Fut>(f: F) -> HandlerFn
where
    A: DeserializeOwned + Send + 'static,
    R: Serialize + Send + 'static,
    F: Fn(A) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, EventError>> + Send + 'static,
{
    Arc::new(
        move |args| -> BoxFuture<'static, Result<Value, EventError>> {
            match decode_args::<A>(args) {
                Ok(decoded) => {
                    let fut = f(decoded);
                    Box::pin(async move { encode_result(&fut.await?) })
                }
                Err(e) => Box::pin(std::future::ready(Err(e))),
            }
        },
    )
}

struct WindowEndpoint {
    tx: mpsc::UnboundedSender<Envelope>,
}

struct HubInner {
    windows: Mutex<HashMap<String, WindowEndpoint>>,
    handlers: Mutex<HashMap<(HandlerScope, String), HandlerFn>>,
    pending: PendingTable,
}

/// Host-side router: window registry, handler registry, and the correlated
/// request/response channel toward attached display contexts.
///
/// One instance per host process, created at startup and passed explicitly to
/// every component that registers handlers or attaches windows.
#[derive(Clone)]
pub struct EventHub {
    inner: Arc<HubInner>,
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}

impl EventHub {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(HubInner {
                windows: Mutex::new(HashMap::new()),
                handlers: Mutex::new(HashMap::new()),
                pending: PendingTable::default(),
            }),
        }
    }

    /// Attach a display context under the given window id and return its
    /// endpoint. Spawns the host-side pump for the new window. Re-attaching
    /// an id replaces the previous endpoint.
    pub fn add_window(&self, window_id: impl Into<String>) -> WindowEvents {
        let window_id = window_id.into();
        let (to_client_tx, from_host_rx) = mpsc::unbounded_channel();
        let (to_host_tx, mut from_client_rx) = mpsc::unbounded_channel();

        let replaced = self
            .inner
            .windows
            .lock()
            .expect("window registry lock poisoned")
            .insert(window_id.clone(), WindowEndpoint { tx: to_client_tx })
            .is_some();
        if replaced {
            warn!(window_id = %window_id, "window re-attached, replacing endpoint");
        }

        let inner = self.inner.clone();
        let pump_window = window_id.clone();
        tokio::spawn(async move {
            while let Some(envelope) = from_client_rx.recv().await {
                HubInner::dispatch_from_window(&inner, &pump_window, envelope);
            }
            // Client side dropped its endpoint; treat as detachment.
            debug!(window_id = %pump_window, "window channel closed");
            inner.detach(&pump_window);
        });

        WindowEvents::new(window_id, to_host_tx, from_host_rx)
    }

    /// Detach a window. Every pending invocation targeting it is rejected
    /// with `TargetGone` at this moment; nothing is left to time out.
    /// Returns `false` when the id was not attached.
    pub fn remove_window(&self, window_id: &str) -> bool {
        let removed = self
            .inner
            .windows
            .lock()
            .expect("window registry lock poisoned")
            .remove(window_id)
            .is_some();
        if removed {
            debug!(window_id = %window_id, "window removed");
            self.inner.pending.reject_window(window_id);
        }
        removed
    }

    pub fn has_window(&self, window_id: &str) -> bool {
        self.inner
            .windows
            .lock()
            .expect("window registry lock poisoned")
            .contains_key(window_id)
    }

    /// Register a handler for `(scope, key)`. Registering the same pair again
    /// replaces the previous handler; calls already dispatched to the old one
    /// still complete against it.
    pub fn handle<A, R, F, Fut>(&self, scope: HandlerScope, key: EventKey<A, R>, f: F)
    where
        A: DeserializeOwned + Send + 'static,
        R: Serialize + Send + 'static,
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, EventError>> + Send + 'static,
    {
        let replaced = self
            .inner
            .handlers
            .lock()
            .expect("handler registry lock poisoned")
            .insert((scope.clone(), key.name().to_string()), erase_handler(f))
            .is_some();
        if replaced {
            debug!(scope = ?scope, key = key.name(), "handler replaced");
        }
    }

    /// Call into a window and suspend until the single settlement arrives.
    pub async fn invoke_to<A, R>(
        &self,
        window_id: &str,
        key: EventKey<A, R>,
        args: A,
    ) -> Result<R, EventError>
    where
        A: Serialize,
        R: DeserializeOwned,
    {
        let args = encode_args(&args)?;
        // Register before sending so a fast reply always finds its entry.
        let (id, rx) = self.inner.pending.register(Some(window_id.to_string()));
        let envelope = Envelope::Request {
            id,
            target: window_id.to_string(),
            key: key.name().to_string(),
            args,
            source_window: None,
        };
        if !self.inner.send_to_window(window_id, envelope) {
            self.inner.pending.discard(id);
            return Err(EventError::target_gone(window_id));
        }
        match rx.await {
            Ok(result) => result.and_then(decode_result),
            Err(_) => Err(EventError::target_gone(window_id)),
        }
    }

    /// Fire-and-forget notification to a window. Never suspends; delivery
    /// failures are traced, not surfaced.
    pub fn notify_to<A, R>(&self, window_id: &str, key: EventKey<A, R>, args: A)
    where
        A: Serialize,
    {
        let args = match encode_args(&args) {
            Ok(args) => args,
            Err(e) => {
                warn!(key = key.name(), error = %e, "dropping notification");
                return;
            }
        };
        let envelope = Envelope::Notify {
            target: window_id.to_string(),
            key: key.name().to_string(),
            args,
            source_window: None,
        };
        if !self.inner.send_to_window(window_id, envelope) {
            debug!(window_id = %window_id, key = key.name(), "notification to detached window dropped");
        }
    }
}

impl HubInner {
    fn send_to_window(&self, window_id: &str, envelope: Envelope) -> bool {
        let windows = self.windows.lock().expect("window registry lock poisoned");
        match windows.get(window_id) {
            Some(endpoint) => endpoint.tx.send(envelope).is_ok(),
            None => false,
        }
    }

    fn detach(&self, window_id: &str) {
        let removed = self
            .windows
            .lock()
            .expect("window registry lock poisoned")
            .remove(window_id)
            .is_some();
        if removed {
            self.pending.reject_window(window_id);
        }
    }

    /// Exact window scope wins over the catch-all registration.
    fn resolve_handler(&self, window_id: &str, key: &str) -> Option<HandlerFn> {
        let handlers = self.handlers.lock().expect("handler registry lock poisoned");
        handlers
            .get(&(HandlerScope::Window(window_id.to_string()), key.to_string()))
            .or_else(|| handlers.get(&(HandlerScope::AnyWindow, key.to_string())))
            .cloned()
    }

    fn dispatch_from_window(inner: &Arc<Self>, window_id: &str, envelope: Envelope) {
        match envelope {
            Envelope::Request {
                id, target, key, args, ..
            } => {
                if target != HOST_TARGET {
                    // Only host<->window topologies are supported.
                    warn!(window_id = %window_id, target = %target, key = %key,
                        "request to non-host target rejected");
                    inner.respond(window_id, id, Err(EventError::target_gone(target)));
                    return;
                }
                match inner.resolve_handler(window_id, &key) {
                    Some(handler) => {
                        let inner = inner.clone();
                        let window_id = window_id.to_string();
                        tokio::spawn(async move {
                            let result = handler(args).await;
                            inner.respond(&window_id, id, result);
                        });
                    }
                    None => inner.respond(window_id, id, Err(EventError::no_handler(key))),
                }
            }
            Envelope::Notify {
                target, key, args, ..
            } => {
                if target != HOST_TARGET {
                    debug!(window_id = %window_id, target = %target, "notification to non-host target dropped");
                    return;
                }
                match inner.resolve_handler(window_id, &key) {
                    Some(handler) => {
                        let key = key.clone();
                        tokio::spawn(async move {
                            if let Err(e) = handler(args).await {
                                debug!(key = %key, error = %e, "notification handler failed");
                            }
                        });
                    }
                    None => debug!(window_id = %window_id, key = %key, "notification without handler dropped"),
                }
            }
            Envelope::Response { id, result } => {
                inner.pending.settle(id, result.into_result());
            }
        }
    }

    fn respond(&self, window_id: &str, id: u64, result: Result<Value, EventError>) {
        let envelope = Envelope::Response {
            id,
            result: WireResult::from_result(&result),
        };
        if !self.send_to_window(window_id, envelope) {
            debug!(window_id = %window_id, correlation_id = id, "response to detached window dropped");
        }
    }
}
