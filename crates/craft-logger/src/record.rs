//! Log record and source model.

use chrono::Local;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::level::LogLevel;

/// Which kind of process emitted a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessKind {
    Host,
    Client,
}

/// Origin of a log record, shipped alongside the message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogSource {
    pub process: ProcessKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Map<String, Value>>,
}

impl LogSource {
    pub fn host() -> Self {
        Self {
            process: ProcessKind::Host,
            window: None,
            module: None,
            context: None,
        }
    }

    pub fn client(window: impl Into<String>) -> Self {
        Self {
            process: ProcessKind::Client,
            window: Some(window.into()),
            module: None,
            context: None,
        }
    }
}

/// One structured entry, persisted as a single JSON line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRecord {
    pub timestamp: String,
    pub level: LogLevel,
    pub message: String,
    pub meta: Vec<Value>,
}

impl LogRecord {
    pub fn new(level: LogLevel, message: impl Into<String>, meta: Vec<Value>) -> Self {
        Self {
            timestamp: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            level,
            message: message.into(),
            meta,
        }
    }
}

/// A forwarded payload must be an array; anything else (including a missing
/// value) becomes the empty list rather than a rejection.
pub fn normalize_meta(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_source_skips_empty_fields() {
        let text = serde_json::to_string(&LogSource::host()).unwrap();
        assert_eq!(text, "{\"process\":\"host\"}");
    }

    #[test]
    fn test_normalize_meta_tolerates_malformed_payloads() {
        assert_eq!(normalize_meta(json!([1, 2])), vec![json!(1), json!(2)]);
        assert!(normalize_meta(json!("not an array")).is_empty());
        assert!(normalize_meta(Value::Null).is_empty());
        assert!(normalize_meta(json!({"a": 1})).is_empty());
    }

    #[test]
    fn test_record_line_shape() {
        let record = LogRecord::new(LogLevel::Info, "ready", vec![json!({"k": "v"})]);
        let line = serde_json::to_string(&record).unwrap();
        assert!(line.contains("\"level\":\"info\""));
        assert!(line.contains("\"message\":\"ready\""));
        assert!(line.contains("\"meta\""));
    }
}
