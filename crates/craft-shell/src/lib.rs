//! craft-shell - Shared shell event contracts for Craft Studio apps.
//!
//! The event-key constants both processes import, plus the host-side handler
//! registrations for window control and app info. Platform window operations
//! sit behind the [`WindowControl`] trait so the host can plug in its native
//! window manager while tests use a stub.

use std::sync::Arc;

use craft_events::{EventHub, EventKey, HandlerScope};
use serde::{Deserialize, Serialize};
use tracing::debug;

// ============================================================================
// Window names and event keys
// ============================================================================

/// The primary application window.
pub const WINDOW_MAIN: &str = "main-window";

/// App events
pub const APP_GET_VERSION: EventKey<(), VersionInfo> = EventKey::new("app:get-version");

/// Window-control events
pub const WINDOW_MINIMIZE: EventKey<(), Ack> = EventKey::new("window:minimize");
pub const WINDOW_MAXIMIZE: EventKey<(), MaximizeAck> = EventKey::new("window:maximize");
pub const WINDOW_CLOSE: EventKey<(), Ack> = EventKey::new("window:close");
pub const WINDOW_IS_MAXIMIZED: EventKey<(), MaximizedState> = EventKey::new("window:is-maximized");

// ============================================================================
// Response payloads
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ack {
    pub success: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaximizeAck {
    pub success: bool,
    pub is_maximized: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaximizedState {
    pub is_maximized: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionInfo {
    pub version: String,
}

// ============================================================================
// Window control seam
// ============================================================================

/// Platform window operations the shell handlers call into. The focused
/// window is implied, matching the desktop chrome's title-bar buttons.
pub trait WindowControl: Send + Sync {
    fn minimize(&self);
    /// Toggle maximized state; returns the state after the toggle.
    fn toggle_maximize(&self) -> bool;
    fn close(&self);
    fn is_maximized(&self) -> bool;
}

// ============================================================================
// Handler registration
// ============================================================================

/// Register the window-control handlers for the main window.
pub fn register_window_handlers(events: &EventHub, control: Arc<dyn WindowControl>) {
    let scope = HandlerScope::Window(WINDOW_MAIN.to_string());

    let ctl = control.clone();
    events.handle(scope.clone(), WINDOW_MINIMIZE, move |_: ()| {
        let ctl = ctl.clone();
        async move {
            ctl.minimize();
            Ok(Ack { success: true })
        }
    });

    let ctl = control.clone();
    events.handle(scope.clone(), WINDOW_MAXIMIZE, move |_: ()| {
        let ctl = ctl.clone();
        async move {
            let is_maximized = ctl.toggle_maximize();
            Ok(MaximizeAck {
                success: true,
                is_maximized,
            })
        }
    });

    let ctl = control.clone();
    events.handle(scope.clone(), WINDOW_CLOSE, move |_: ()| {
        let ctl = ctl.clone();
        async move {
            ctl.close();
            Ok(Ack { success: true })
        }
    });

    let ctl = control;
    events.handle(scope, WINDOW_IS_MAXIMIZED, move |_: ()| {
        let ctl = ctl.clone();
        async move {
            Ok(MaximizedState {
                is_maximized: ctl.is_maximized(),
            })
        }
    });

    debug!("window-control handlers registered");
}

/// Register the app-info handlers for the main window.
pub fn register_app_handlers(events: &EventHub, version: impl Into<String>) {
    let version = version.into();
    events.handle(
        HandlerScope::Window(WINDOW_MAIN.to_string()),
        APP_GET_VERSION,
        move |_: ()| {
            let version = version.clone();
            async move { Ok(VersionInfo { version }) }
        },
    );
    debug!("app handlers registered");
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use craft_events::{EventError, HOST_TARGET};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[derive(Default)]
    struct StubControl {
        maximized: AtomicBool,
        closed: AtomicUsize,
        minimized: AtomicUsize,
    }

    impl WindowControl for StubControl {
        fn minimize(&self) {
            self.minimized.fetch_add(1, Ordering::SeqCst);
        }

        fn toggle_maximize(&self) -> bool {
            let was = self.maximized.fetch_xor(true, Ordering::SeqCst);
            !was
        }

        fn close(&self) {
            self.closed.fetch_add(1, Ordering::SeqCst);
        }

        fn is_maximized(&self) -> bool {
            self.maximized.load(Ordering::SeqCst)
        }
    }

    #[tokio::test]
    async fn test_window_control_round_trip() {
        let hub = EventHub::new();
        let window = hub.add_window(WINDOW_MAIN);
        let control = Arc::new(StubControl::default());
        register_window_handlers(&hub, control.clone());

        let ack = window.invoke_to(HOST_TARGET, WINDOW_MINIMIZE, ()).await.unwrap();
        assert!(ack.success);
        assert_eq!(control.minimized.load(Ordering::SeqCst), 1);

        let ack = window.invoke_to(HOST_TARGET, WINDOW_MAXIMIZE, ()).await.unwrap();
        assert!(ack.is_maximized);
        let state = window
            .invoke_to(HOST_TARGET, WINDOW_IS_MAXIMIZED, ())
            .await
            .unwrap();
        assert!(state.is_maximized);

        let ack = window.invoke_to(HOST_TARGET, WINDOW_CLOSE, ()).await.unwrap();
        assert!(ack.success);
        assert_eq!(control.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_app_version_round_trip() {
        let hub = EventHub::new();
        let window = hub.add_window(WINDOW_MAIN);
        register_app_handlers(&hub, "2.0.1");

        let info = window
            .invoke_to(HOST_TARGET, APP_GET_VERSION, ())
            .await
            .unwrap();
        assert_eq!(info.version, "2.0.1");
    }

    #[tokio::test]
    async fn test_handlers_are_scoped_to_the_main_window() {
        let hub = EventHub::new();
        let other = hub.add_window("settings-window");
        register_app_handlers(&hub, "2.0.1");

        let err = other
            .invoke_to(HOST_TARGET, APP_GET_VERSION, ())
            .await
            .unwrap_err();
        match err {
            EventError::NoHandler { .. } => {}
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
