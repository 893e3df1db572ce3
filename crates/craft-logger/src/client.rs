//! Display-context logging service.
//!
//! Same surface as the host service, with two independent thresholds: the
//! local display level (what this context's own console shows) and the
//! forwarding level (what gets shipped to the host over the router). A
//! trailing `{"logToHost": true}` element in the data payload forces
//! forwarding regardless of level and is stripped before shipping. Shipping
//! failures never reach the logging call site.

use std::sync::{Arc, Mutex};

use craft_events::{WindowEvents, HOST_TARGET};
use serde_json::{Map, Value};
use tracing::error;

use crate::console;
use crate::env::EnvOverrides;
use crate::level::LogLevel;
use crate::record::LogSource;
use crate::LOGGER_TO_HOST;

/// Environment variable naming the client verbosity floor (dev mode only).
pub const ENV_CLIENT_LEVEL: &str = "CRAFT_LOGGER_CLIENT_LEVEL";
/// Environment variable holding the client module allow-list (dev mode only).
pub const ENV_CLIENT_MODULES: &str = "CRAFT_LOGGER_CLIENT_MODULES";

/// Trailing data marker forcing a record to the host regardless of level.
pub const FORCE_FORWARD_KEY: &str = "logToHost";

const DEFAULT_FORWARD_LEVEL: LogLevel = LogLevel::Warn;
const DEFAULT_WINDOW_NAME: &str = "client";

struct ClientShared {
    events: WindowEvents,
    dev_mode: bool,
    default_level: LogLevel,
    level: Mutex<LogLevel>,
    forward_level: Mutex<LogLevel>,
    env: EnvOverrides,
    window: Mutex<String>,
}

/// Display-context logging facade over a [`WindowEvents`] endpoint.
#[derive(Clone)]
pub struct ClientLogger {
    shared: Arc<ClientShared>,
    module: String,
    context: Map<String, Value>,
}

impl ClientLogger {
    pub fn new(events: WindowEvents, dev_mode: bool) -> Self {
        let env = if dev_mode {
            EnvOverrides::from_env(ENV_CLIENT_LEVEL, ENV_CLIENT_MODULES)
        } else {
            EnvOverrides::disabled()
        };
        let default_level = if dev_mode {
            LogLevel::Silly
        } else {
            LogLevel::Info
        };
        Self {
            shared: Arc::new(ClientShared {
                events,
                dev_mode,
                default_level,
                level: Mutex::new(default_level),
                forward_level: Mutex::new(DEFAULT_FORWARD_LEVEL),
                env,
                window: Mutex::new(String::new()),
            }),
            module: String::new(),
            context: Map::new(),
        }
    }

    /// Set the window identity stamped into forwarded sources. Without this,
    /// records fall back to the window name `"client"`.
    pub fn init_window_source(&self, window: impl Into<String>) -> &Self {
        *self.shared.window.lock().expect("window name lock poisoned") = window.into();
        self
    }

    /// Derive a handle with a module name and merged context; the receiver
    /// is untouched, colliding keys take the new value.
    pub fn with_context(
        &self,
        module: impl Into<String>,
        context: Option<Map<String, Value>>,
    ) -> Self {
        let mut merged = self.context.clone();
        if let Some(extra) = context {
            merged.extend(extra);
        }
        Self {
            shared: self.shared.clone(),
            module: module.into(),
            context: merged,
        }
    }

    fn process_log(&self, level: LogLevel, message: String, data: Vec<Value>) {
        if level == LogLevel::None {
            return;
        }
        let shared = &self.shared;

        if shared.dev_mode && !shared.env.passes(&self.module, level) {
            return;
        }
        let display_level = *shared.level.lock().expect("level lock poisoned");
        if level.rank() < display_level.rank() {
            return;
        }

        console::mirror(level, &console::host_tag(&self.module), &message, &data);

        let forced = data
            .last()
            .and_then(|v| v.get(FORCE_FORWARD_KEY))
            .map(|flag| flag == &Value::Bool(true))
            .unwrap_or(false);
        let forward_level = *shared.forward_level.lock().expect("forward level lock poisoned");
        if level.rank() < forward_level.rank() && !forced {
            return;
        }

        let window = {
            let window = shared.window.lock().expect("window name lock poisoned");
            if window.is_empty() {
                DEFAULT_WINDOW_NAME.to_string()
            } else {
                window.clone()
            }
        };
        let mut source = LogSource::client(window);
        if !self.module.is_empty() {
            source.module = Some(self.module.clone());
        }
        if !self.context.is_empty() {
            source.context = Some(self.context.clone());
        }

        // The marker is transport metadata, not payload.
        let mut send_data = data;
        if forced {
            send_data.pop();
        }

        let events = shared.events.clone();
        tokio::spawn(async move {
            let payload = (source, level, message, Value::Array(send_data));
            if let Err(e) = events.invoke_to(HOST_TARGET, LOGGER_TO_HOST, payload).await {
                // Recovered locally; never surfaced to the logging call site.
                error!(error = %e, "failed to ship log record to host");
            }
        });
    }

    fn log(&self, level: LogLevel, message: impl Into<String>, data: Vec<Value>) {
        self.process_log(level, message.into(), data);
    }

    pub fn error(&self, message: impl Into<String>, data: Vec<Value>) {
        self.log(LogLevel::Error, message, data);
    }

    pub fn warn(&self, message: impl Into<String>, data: Vec<Value>) {
        self.log(LogLevel::Warn, message, data);
    }

    pub fn info(&self, message: impl Into<String>, data: Vec<Value>) {
        self.log(LogLevel::Info, message, data);
    }

    pub fn verbose(&self, message: impl Into<String>, data: Vec<Value>) {
        self.log(LogLevel::Verbose, message, data);
    }

    pub fn debug(&self, message: impl Into<String>, data: Vec<Value>) {
        self.log(LogLevel::Debug, message, data);
    }

    pub fn silly(&self, message: impl Into<String>, data: Vec<Value>) {
        self.log(LogLevel::Silly, message, data);
    }

    pub fn set_level(&self, level: LogLevel) {
        *self.shared.level.lock().expect("level lock poisoned") = level;
    }

    pub fn get_level(&self) -> LogLevel {
        *self.shared.level.lock().expect("level lock poisoned")
    }

    pub fn reset_level(&self) {
        self.set_level(self.shared.default_level);
    }

    pub fn set_log_to_host_level(&self, level: LogLevel) {
        *self
            .shared
            .forward_level
            .lock()
            .expect("forward level lock poisoned") = level;
    }

    pub fn get_log_to_host_level(&self) -> LogLevel {
        *self
            .shared
            .forward_level
            .lock()
            .expect("forward level lock poisoned")
    }

    pub fn reset_log_to_host_level(&self) {
        self.set_log_to_host_level(DEFAULT_FORWARD_LEVEL);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use craft_events::{EventHub, HandlerScope};
    use serde_json::json;
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    type Received = Arc<StdMutex<Vec<(LogSource, LogLevel, String, Value)>>>;

    /// Capture everything arriving on the reserved log-ingestion key.
    fn capture_shipped(hub: &EventHub) -> Received {
        let received: Received = Arc::new(StdMutex::new(Vec::new()));
        let store = received.clone();
        hub.handle(
            HandlerScope::AnyWindow,
            LOGGER_TO_HOST,
            move |(source, level, message, data): (LogSource, LogLevel, String, Value)| {
                let store = store.clone();
                async move {
                    store.lock().unwrap().push((source, level, message, data));
                    Ok(())
                }
            },
        );
        received
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    #[tokio::test]
    async fn test_records_below_forward_threshold_stay_local() {
        let hub = EventHub::new();
        let received = capture_shipped(&hub);
        let logger = ClientLogger::new(hub.add_window("main-window"), false);
        logger.init_window_source("main-window");

        logger.info("local only", vec![]);
        settle().await;
        assert!(received.lock().unwrap().is_empty());

        logger.error("shipped", vec![json!({"code": "E_DISK"})]);
        settle().await;
        let shipped = received.lock().unwrap();
        assert_eq!(shipped.len(), 1);
        let (source, level, message, data) = &shipped[0];
        assert_eq!(source.window.as_deref(), Some("main-window"));
        assert_eq!(*level, LogLevel::Error);
        assert_eq!(message, "shipped");
        assert_eq!(data, &json!([{"code": "E_DISK"}]));
    }

    #[tokio::test]
    async fn test_force_forward_flag_ships_and_is_stripped() {
        let hub = EventHub::new();
        let received = capture_shipped(&hub);
        let logger = ClientLogger::new(hub.add_window("main-window"), false);

        logger.info(
            "forced",
            vec![json!({"step": 1}), json!({"logToHost": true})],
        );
        settle().await;

        let shipped = received.lock().unwrap();
        assert_eq!(shipped.len(), 1);
        let (source, _, _, data) = &shipped[0];
        assert_eq!(data, &json!([{"step": 1}]), "marker must not ship");
        assert_eq!(source.window.as_deref(), Some("client"), "default window name");
    }

    #[tokio::test]
    async fn test_display_level_gates_forwarding_too() {
        let hub = EventHub::new();
        let received = capture_shipped(&hub);
        let logger = ClientLogger::new(hub.add_window("main-window"), false);
        logger.set_level(LogLevel::Error);

        // Below the display level: dropped before the forwarding decision.
        logger.warn("suppressed", vec![]);
        settle().await;
        assert!(received.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_shipping_failure_is_swallowed() {
        let hub = EventHub::new();
        // No ingestion handler registered: every ship attempt rejects with
        // NoHandler. The logging call must not panic or propagate anything.
        let logger = ClientLogger::new(hub.add_window("main-window"), false);
        logger.error("nowhere to go", vec![]);
        settle().await;
    }

    #[tokio::test]
    async fn test_with_context_merges_and_overrides() {
        let hub = EventHub::new();
        let received = capture_shipped(&hub);
        let logger = ClientLogger::new(hub.add_window("main-window"), false);

        let mut home_ctx = Map::new();
        home_ctx.insert("page".to_string(), json!("home"));
        let home = logger.with_context("Home", Some(home_ctx));

        let mut settings_ctx = Map::new();
        settings_ctx.insert("page".to_string(), json!("settings"));
        let settings = home.with_context("Home", Some(settings_ctx));

        home.error("from home", vec![]);
        settings.error("from settings", vec![]);
        settle().await;

        let shipped = received.lock().unwrap();
        assert_eq!(shipped.len(), 2);
        let home_source = &shipped
            .iter()
            .find(|(_, _, m, _)| m == "from home")
            .unwrap()
            .0;
        assert_eq!(
            home_source.context.as_ref().unwrap().get("page"),
            Some(&json!("home"))
        );
        let settings_source = &shipped
            .iter()
            .find(|(_, _, m, _)| m == "from settings")
            .unwrap()
            .0;
        assert_eq!(
            settings_source.context.as_ref().unwrap().get("page"),
            Some(&json!("settings"))
        );
        assert_eq!(settings_source.module.as_deref(), Some("Home"));
    }

    #[tokio::test]
    async fn test_forward_threshold_is_adjustable() {
        let hub = EventHub::new();
        let received = capture_shipped(&hub);
        let logger = ClientLogger::new(hub.add_window("main-window"), false);

        assert_eq!(logger.get_log_to_host_level(), LogLevel::Warn);
        logger.set_log_to_host_level(LogLevel::Info);
        logger.info("now ships", vec![]);
        settle().await;
        assert_eq!(received.lock().unwrap().len(), 1);

        logger.reset_log_to_host_level();
        logger.info("back to local", vec![]);
        settle().await;
        assert_eq!(received.lock().unwrap().len(), 1);
    }
}
