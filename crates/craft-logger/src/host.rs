//! Host-process logging service.
//!
//! Persists its own records and records forwarded from display contexts
//! through one `process_log` path: development-mode environment filters,
//! console mirror, enrichment at the point of persistence, then the rotating
//! sink. The forwarded path is wired up by registering the reserved
//! log-ingestion key under the `AnyWindow` scope.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use craft_events::{EventHub, HandlerScope};
use once_cell::sync::Lazy;
use serde_json::{json, Map, Value};
use sysinfo::{CpuRefreshKind, MemoryRefreshKind, RefreshKind, System};
use tokio::sync::watch;

use crate::console;
use crate::env::EnvOverrides;
use crate::level::LogLevel;
use crate::record::{normalize_meta, LogRecord, LogSource, ProcessKind};
use crate::sink::{RotatingSink, SinkConfig};
use crate::LOGGER_TO_HOST;

/// Environment variable naming the host verbosity floor (dev mode only).
pub const ENV_HOST_LEVEL: &str = "CRAFT_LOGGER_HOST_LEVEL";
/// Environment variable holding the host module allow-list (dev mode only).
pub const ENV_HOST_MODULES: &str = "CRAFT_LOGGER_HOST_MODULES";

struct SystemSummary {
    os: String,
    hw: String,
}

// Environment diagnostics attached to Warn/Error records, computed once.
static SYSTEM_INFO: Lazy<SystemSummary> = Lazy::new(|| {
    let sys = System::new_with_specifics(
        RefreshKind::new()
            .with_cpu(CpuRefreshKind::everything())
            .with_memory(MemoryRefreshKind::everything()),
    );
    let cpu = sys
        .cpus()
        .first()
        .map(|c| c.brand().trim().to_string())
        .filter(|brand| !brand.is_empty())
        .unwrap_or_else(|| "Unknown CPU".to_string());
    let total_gb = sys.total_memory() as f64 / (1024.0 * 1024.0 * 1024.0);
    SystemSummary {
        os: format!(
            "{}-{} / {}",
            std::env::consts::OS,
            std::env::consts::ARCH,
            System::long_os_version().unwrap_or_else(|| "unknown".to_string()),
        ),
        hw: format!("{cpu} / {total_gb:.2}GB"),
    }
});

/// Host logger configuration.
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    pub logs_dir: PathBuf,
    pub dev_mode: bool,
    pub app_version: String,
}

struct HostShared {
    sink: RotatingSink,
    dev_mode: bool,
    app_version: String,
    default_level: LogLevel,
    level: Mutex<LogLevel>,
    env: EnvOverrides,
    logs_dir: PathBuf,
}

/// Host-process logging facade.
///
/// One instance per process; [`HostLogger::with_context`] derives cheap
/// handles layering a module name and extra context over the shared sink.
#[derive(Clone)]
pub struct HostLogger {
    shared: Arc<HostShared>,
    module: String,
    context: Map<String, Value>,
}

impl HostLogger {
    pub fn new(config: LoggerConfig) -> Self {
        Self::with_sink_config(config.clone(), SinkConfig::new(config.logs_dir))
    }

    /// Construct with explicit sink policies; `new` uses the defaults.
    pub fn with_sink_config(config: LoggerConfig, sink_config: SinkConfig) -> Self {
        let env = if config.dev_mode {
            EnvOverrides::from_env(ENV_HOST_LEVEL, ENV_HOST_MODULES)
        } else {
            EnvOverrides::disabled()
        };
        let default_level = if config.dev_mode {
            LogLevel::Silly
        } else {
            LogLevel::Info
        };
        Self {
            shared: Arc::new(HostShared {
                sink: RotatingSink::new(sink_config),
                dev_mode: config.dev_mode,
                app_version: config.app_version,
                default_level,
                level: Mutex::new(default_level),
                env,
                logs_dir: config.logs_dir,
            }),
            module: String::new(),
            context: Map::new(),
        }
    }

    /// Install the `AnyWindow` ingestion handler for records forwarded by
    /// display contexts.
    pub fn register_ipc_handler(&self, events: &EventHub) {
        let logger = self.clone();
        events.handle(
            HandlerScope::AnyWindow,
            LOGGER_TO_HOST,
            move |(source, level, message, data): (LogSource, LogLevel, String, Value)| {
                let logger = logger.clone();
                async move {
                    logger.process_log(source, level, message, normalize_meta(data));
                    Ok(())
                }
            },
        );
    }

    /// Derive a handle with a module name and merged context. The receiver
    /// is untouched; colliding context keys take the new value.
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

    fn process_log(&self, mut source: LogSource, level: LogLevel, message: String, mut meta: Vec<Value>) {
        if level == LogLevel::None {
            return;
        }
        let shared = &self.shared;

        if shared.dev_mode {
            if !shared.env.passes(&self.module, level) {
                return;
            }
            let tag = match source.process {
                ProcessKind::Host => console::host_tag(&self.module),
                ProcessKind::Client => console::client_tag(
                    source.window.as_deref().unwrap_or(""),
                    source.module.as_deref().unwrap_or(""),
                ),
            };
            console::mirror(level, &tag, &message, &meta);
        }

        // Enrichment happens here, once, not at call sites.
        if source.process == ProcessKind::Host {
            if !self.module.is_empty() {
                source.module = Some(self.module.clone());
            }
            if !self.context.is_empty() {
                source.context = Some(self.context.clone());
            }
        }
        match serde_json::to_value(&source) {
            Ok(value) => meta.push(value),
            Err(_) => meta.push(Value::Null),
        }
        if level.is_high_severity() {
            meta.push(json!({
                "sys": { "os": SYSTEM_INFO.os, "hw": SYSTEM_INFO.hw },
                "appver": shared.app_version,
            }));
        }

        let threshold = *shared.level.lock().expect("level lock poisoned");
        if level.rank() < threshold.rank() {
            return;
        }
        shared.sink.append(LogRecord::new(level, message, meta));
    }

    fn log(&self, level: LogLevel, message: impl Into<String>, data: Vec<Value>) {
        self.process_log(LogSource::host(), level, message.into(), data);
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

    pub fn logs_dir(&self) -> &Path {
        &self.shared.logs_dir
    }

    /// Latest sink failure, if any; see [`RotatingSink::subscribe_errors`].
    pub fn subscribe_sink_errors(&self) -> watch::Receiver<Option<String>> {
        self.shared.sink.subscribe_errors()
    }

    /// Drain the sink; call before process shutdown.
    pub async fn finish(&self) {
        self.shared.sink.flush().await;
    }
}
