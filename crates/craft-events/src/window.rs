//! Display-context endpoint.
//!
//! A [`WindowEvents`] is the sandboxed side of the channel pair created by
//! [`EventHub::add_window`](crate::EventHub::add_window). It mirrors the hub:
//! its own handler map (all registrations live under the implicit `Host`
//! scope, since calls from the host name no window), its own pending table,
//! and a pump task draining the host→window channel.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::EventError;
use crate::hub::{erase_handler, HandlerFn, HandlerScope, HOST_TARGET};
use crate::key::EventKey;
use crate::pending::PendingTable;
use crate::wire::{decode_result, encode_args, Envelope, WireResult};

struct ClientInner {
    window_id: String,
    to_host: mpsc::UnboundedSender<Envelope>,
    handlers: Mutex<HashMap<(HandlerScope, String), HandlerFn>>,
    pending: PendingTable,
}

/// Client endpoint held by a display context.
///
/// Cheap to clone; clones share the same handler map and pending table.
#[derive(Clone)]
pub struct WindowEvents {
    inner: Arc<ClientInner>,
}

impl WindowEvents {
    pub(crate) fn new(
        window_id: String,
        to_host: mpsc::UnboundedSender<Envelope>,
        mut from_host_rx: mpsc::UnboundedReceiver<Envelope>,
    ) -> Self {
        let inner = Arc::new(ClientInner {
            window_id,
            to_host,
            handlers: Mutex::new(HashMap::new()),
            pending: PendingTable::default(),
        });

        let pump = inner.clone();
        tokio::spawn(async move {
            while let Some(envelope) = from_host_rx.recv().await {
                ClientInner::dispatch_from_host(&pump, envelope);
            }
            // Host dropped the endpoint (window removed): nothing pending can
            // ever settle normally, so reject it all now instead of hanging.
            debug!(window_id = %pump.window_id, "host channel closed");
            pump.pending.reject_all(HOST_TARGET);
        });

        Self { inner }
    }

    /// The window identity this endpoint was attached under.
    pub fn window_id(&self) -> &str {
        &self.inner.window_id
    }

    /// Register a handler for calls and notifications from the host.
    /// Last writer wins, exactly as on the hub side.
    pub fn handle<A, R, F, Fut>(&self, key: EventKey<A, R>, f: F)
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
            .insert((HandlerScope::Host, key.name().to_string()), erase_handler(f))
            .is_some();
        if replaced {
            debug!(key = key.name(), "handler replaced");
        }
    }

    /// Call the named target (in practice [`HOST_TARGET`]) and suspend until
    /// the single settlement arrives.
    pub async fn invoke_to<A, R>(
        &self,
        target: &str,
        key: EventKey<A, R>,
        args: A,
    ) -> Result<R, EventError>
    where
        A: Serialize,
        R: DeserializeOwned,
    {
        let args = encode_args(&args)?;
        // Register before sending so a fast reply always finds its entry.
        let (id, rx) = self.inner.pending.register(None);
        let envelope = Envelope::Request {
            id,
            target: target.to_string(),
            key: key.name().to_string(),
            args,
            source_window: Some(self.inner.window_id.clone()),
        };
        if self.inner.to_host.send(envelope).is_err() {
            self.inner.pending.discard(id);
            return Err(EventError::target_gone(target));
        }
        match rx.await {
            Ok(result) => result.and_then(decode_result),
            Err(_) => Err(EventError::target_gone(target)),
        }
    }

    /// Fire-and-forget notification toward the host. Never suspends.
    pub fn notify_to<A, R>(&self, target: &str, key: EventKey<A, R>, args: A)
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
            target: target.to_string(),
            key: key.name().to_string(),
            args,
            source_window: Some(self.inner.window_id.clone()),
        };
        if self.inner.to_host.send(envelope).is_err() {
            debug!(key = key.name(), "notification after detach dropped");
        }
    }
}

impl ClientInner {
    fn resolve_handler(&self, key: &str) -> Option<HandlerFn> {
        self.handlers
            .lock()
            .expect("handler registry lock poisoned")
            .get(&(HandlerScope::Host, key.to_string()))
            .cloned()
    }

    fn respond(&self, id: u64, result: Result<Value, EventError>) {
        let envelope = Envelope::Response {
            id,
            result: WireResult::from_result(&result),
        };
        if self.to_host.send(envelope).is_err() {
            debug!(correlation_id = id, "response after detach dropped");
        }
    }

    fn dispatch_from_host(inner: &Arc<Self>, envelope: Envelope) {
        match envelope {
            Envelope::Request { id, key, args, .. } => match inner.resolve_handler(&key) {
                Some(handler) => {
                    let inner = inner.clone();
                    tokio::spawn(async move {
                        let result = handler(args).await;
                        inner.respond(id, result);
                    });
                }
                None => inner.respond(id, Err(EventError::no_handler(key))),
            },
            Envelope::Notify { key, args, .. } => match inner.resolve_handler(&key) {
                Some(handler) => {
                    tokio::spawn(async move {
                        if let Err(e) = handler(args).await {
                            debug!(error = %e, "notification handler failed");
                        }
                    });
                }
                None => debug!(key = %key, "notification without handler dropped"),
            },
            Envelope::Response { id, result } => {
                inner.pending.settle(id, result.into_result());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::EventHub;
    use std::time::Duration;

    const ECHO: EventKey<(u32,), u32> = EventKey::new("test:echo");

    #[tokio::test]
    async fn test_client_pending_rejected_when_window_removed_mid_call() {
        let hub = EventHub::new();
        let window = hub.add_window("main-window");

        // Handler parks until after the window is removed; the response it
        // eventually produces has nowhere to go, so the client settles via
        // the closed-channel path instead of hanging.
        hub.handle(
            crate::hub::HandlerScope::AnyWindow,
            ECHO,
            |(n,): (u32,)| async move {
                tokio::time::sleep(Duration::from_millis(200)).await;
                Ok(n)
            },
        );

        let caller = window.clone();
        let call = tokio::spawn(async move { caller.invoke_to(HOST_TARGET, ECHO, (7,)).await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        hub.remove_window("main-window");

        let err = call.await.unwrap().unwrap_err();
        match err {
            EventError::TargetGone { .. } => {}
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_clones_share_handler_map() {
        let hub = EventHub::new();
        let window = hub.add_window("main-window");
        let clone = window.clone();
        clone.handle(ECHO, |(n,): (u32,)| async move { Ok(n * 2) });

        let reply = hub.invoke_to("main-window", ECHO, (21,)).await.unwrap();
        assert_eq!(reply, 42);
        assert_eq!(window.window_id(), "main-window");
    }
}
