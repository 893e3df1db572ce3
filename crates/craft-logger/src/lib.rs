//! craft-logger - Structured logging pipeline for Craft Studio apps.
//!
//! Every process funnels records into one rotated, filtered, persisted
//! stream. The host runs a [`HostLogger`] backed by a [`RotatingSink`];
//! display contexts run a [`ClientLogger`] that mirrors locally and ships
//! qualifying records to the host over the event router, under the reserved
//! [`LOGGER_TO_HOST`] key.

mod client;
mod console;
mod env;
mod host;
mod level;
mod record;
mod sink;

use craft_events::EventKey;
use serde_json::Value;

pub use client::{ClientLogger, ENV_CLIENT_LEVEL, ENV_CLIENT_MODULES, FORCE_FORWARD_KEY};
pub use host::{HostLogger, LoggerConfig, ENV_HOST_LEVEL, ENV_HOST_MODULES};
pub use level::{InvalidLevel, LogLevel};
pub use record::{normalize_meta, LogRecord, LogSource, ProcessKind};
pub use sink::{RotatingSink, RotationPolicy, SinkConfig};

/// Reserved key shipping a log record from a display context to the host:
/// `(source, level, message, data array)`.
pub const LOGGER_TO_HOST: EventKey<(LogSource, LogLevel, String, Value), ()> =
    EventKey::new("logger:send-to-host");

#[cfg(test)]
mod pipeline_tests {
    use super::*;
    use chrono::Local;
    use craft_events::EventHub;
    use serde_json::json;
    use std::path::Path;
    use std::time::Duration;

    fn host_logger(dir: &Path) -> HostLogger {
        HostLogger::new(LoggerConfig {
            logs_dir: dir.to_path_buf(),
            dev_mode: false,
            app_version: "3.1.4".to_string(),
        })
    }

    fn read_stream(dir: &Path, prefix: &str) -> String {
        let name = format!("{prefix}.{}.log", Local::now().date_naive().format("%Y-%m-%d"));
        std::fs::read_to_string(dir.join(name)).unwrap_or_default()
    }

    #[tokio::test]
    async fn test_client_error_reaches_both_streams_enriched() {
        let dir = tempfile::tempdir().unwrap();
        let hub = EventHub::new();
        let host = host_logger(dir.path());
        host.register_ipc_handler(&hub);

        let client = ClientLogger::new(hub.add_window("main-window"), false);
        client.init_window_source("main-window");
        client.error("disk full", vec![json!({"code": "E_DISK"})]);

        tokio::time::sleep(Duration::from_millis(100)).await;
        host.finish().await;

        for prefix in ["app", "app-error"] {
            let content = read_stream(dir.path(), prefix);
            let line = content
                .lines()
                .find(|l| l.contains("disk full"))
                .unwrap_or_else(|| panic!("record missing from {prefix} stream"));
            assert!(line.contains("E_DISK"));
            assert!(line.contains("\"window\":\"main-window\""));
            assert!(line.contains("\"process\":\"client\""));
            assert!(line.contains("\"appver\":\"3.1.4\""));
            assert!(line.contains("\"sys\""));
        }
    }

    #[tokio::test]
    async fn test_concurrent_windows_keep_their_sources() {
        let dir = tempfile::tempdir().unwrap();
        let hub = EventHub::new();
        let host = host_logger(dir.path());
        host.register_ipc_handler(&hub);

        let alpha = ClientLogger::new(hub.add_window("alpha"), false);
        alpha.init_window_source("alpha");
        let beta = ClientLogger::new(hub.add_window("beta"), false);
        beta.init_window_source("beta");

        alpha.error("from alpha", vec![]);
        beta.error("from beta", vec![]);

        tokio::time::sleep(Duration::from_millis(100)).await;
        host.finish().await;

        let general = read_stream(dir.path(), "app");
        let alpha_line = general.lines().find(|l| l.contains("from alpha")).unwrap();
        assert!(alpha_line.contains("\"window\":\"alpha\""));
        assert!(!alpha_line.contains("\"window\":\"beta\""));
        let beta_line = general.lines().find(|l| l.contains("from beta")).unwrap();
        assert!(beta_line.contains("\"window\":\"beta\""));
    }

    #[tokio::test]
    async fn test_client_low_levels_never_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let hub = EventHub::new();
        let host = host_logger(dir.path());
        host.register_ipc_handler(&hub);

        let client = ClientLogger::new(hub.add_window("main-window"), false);
        client.set_level(LogLevel::Info);
        client.debug("invisible", vec![]);
        client.verbose("invisible", vec![]);
        client.silly("invisible", vec![]);

        tokio::time::sleep(Duration::from_millis(100)).await;
        host.finish().await;

        assert!(!read_stream(dir.path(), "app").contains("invisible"));
    }
}
