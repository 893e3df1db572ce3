//! Log severity levels.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Ordered severity enum, most severe first. `None` is a filter-threshold
/// sentinel only and is never attached to an emitted record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Verbose,
    Silly,
    None,
}

impl LogLevel {
    /// Numeric rank, increasing with severity. A record passes a threshold
    /// when its rank is at least the threshold's rank.
    pub fn rank(self) -> u8 {
        match self {
            Self::Silly => 0,
            Self::Verbose => 1,
            Self::Debug => 2,
            Self::Info => 3,
            Self::Warn => 4,
            Self::Error => 5,
            // Sentinel outranks everything: a `None` threshold passes nothing.
            Self::None => 6,
        }
    }

    /// Warn and above feed the high-severity stream.
    pub fn is_high_severity(self) -> bool {
        matches!(self, Self::Warn | Self::Error)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Verbose => "verbose",
            Self::Silly => "silly",
            Self::None => "none",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Invalid log level: {0}")]
pub struct InvalidLevel(String);

impl FromStr for LogLevel {
    type Err = InvalidLevel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "warn" | "warning" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "verbose" => Ok(Self::Verbose),
            "silly" => Ok(Self::Silly),
            "none" => Ok(Self::None),
            other => Err(InvalidLevel(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_ordering() {
        assert!(LogLevel::Error.rank() > LogLevel::Warn.rank());
        assert!(LogLevel::Warn.rank() > LogLevel::Info.rank());
        assert!(LogLevel::Info.rank() > LogLevel::Debug.rank());
        assert!(LogLevel::Debug.rank() > LogLevel::Verbose.rank());
        assert!(LogLevel::Verbose.rank() > LogLevel::Silly.rank());
        assert!(LogLevel::None.rank() > LogLevel::Error.rank());
    }

    #[test]
    fn test_high_severity_split() {
        assert!(LogLevel::Error.is_high_severity());
        assert!(LogLevel::Warn.is_high_severity());
        assert!(!LogLevel::Info.is_high_severity());
        assert!(!LogLevel::Silly.is_high_severity());
    }

    #[test]
    fn test_serde_is_lowercase() {
        assert_eq!(serde_json::to_string(&LogLevel::Error).unwrap(), "\"error\"");
        let parsed: LogLevel = serde_json::from_str("\"silly\"").unwrap();
        assert_eq!(parsed, LogLevel::Silly);
    }

    #[test]
    fn test_parse_levels() {
        assert_eq!("warning".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert_eq!("NONE".parse::<LogLevel>().unwrap(), LogLevel::None);
        assert!("loud".parse::<LogLevel>().is_err());
    }
}
