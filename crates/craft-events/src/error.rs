//! Event routing error types.
//!
//! Error codes: 7000-7099

use serde::{Deserialize, Serialize};

/// Error codes for event routing operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum EventErrorCode {
    /// No handler registered for the requested (scope, key)
    NoHandler = 7000,
    /// Target window detached before or during the call
    TargetGone = 7001,
    /// The handler itself failed
    HandlerFailure = 7002,
    /// Channel send error
    ChannelSend = 7003,
    /// Argument or result (de)serialization error
    Serialization = 7004,
}

/// Custom error type for event routing operations
#[derive(Debug, Clone, thiserror::Error)]
pub enum EventError {
    #[error("[{code}] No handler registered for '{key}'")]
    NoHandler { code: u32, key: String },

    #[error("[{code}] Target window gone: {window}")]
    TargetGone { code: u32, window: String },

    #[error("[{code}] Handler failed: {message}")]
    HandlerFailure { code: u32, message: String },

    #[error("[{code}] Channel send error: {message}")]
    ChannelSend { code: u32, message: String },

    #[error("[{code}] Serialization error: {message}")]
    Serialization { code: u32, message: String },
}

impl EventError {
    pub fn no_handler(key: impl Into<String>) -> Self {
        Self::NoHandler {
            code: EventErrorCode::NoHandler as u32,
            key: key.into(),
        }
    }

    pub fn target_gone(window: impl Into<String>) -> Self {
        Self::TargetGone {
            code: EventErrorCode::TargetGone as u32,
            window: window.into(),
        }
    }

    pub fn handler_failure(message: impl Into<String>) -> Self {
        Self::HandlerFailure {
            code: EventErrorCode::HandlerFailure as u32,
            message: message.into(),
        }
    }

    pub fn channel_send(message: impl Into<String>) -> Self {
        Self::ChannelSend {
            code: EventErrorCode::ChannelSend as u32,
            message: message.into(),
        }
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            code: EventErrorCode::Serialization as u32,
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for EventError {
    fn from(e: serde_json::Error) -> Self {
        Self::serialization(e.to_string())
    }
}

/// Wire form of a rejected call, carried inside a `Response` envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireError {
    pub kind: WireErrorKind,
    pub message: String,
}

/// Discriminant for [`WireError`]; only protocol-level rejections cross the
/// boundary, local channel/serde failures are collapsed into `HandlerFailure`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WireErrorKind {
    NoHandler,
    TargetGone,
    HandlerFailure,
}

impl From<&EventError> for WireError {
    fn from(e: &EventError) -> Self {
        let kind = match e {
            EventError::NoHandler { .. } => WireErrorKind::NoHandler,
            EventError::TargetGone { .. } => WireErrorKind::TargetGone,
            _ => WireErrorKind::HandlerFailure,
        };
        Self {
            kind,
            message: e.to_string(),
        }
    }
}

impl WireError {
    /// Rebuild the typed error on the receiving side of a `Response`.
    pub fn into_event_error(self) -> EventError {
        match self.kind {
            WireErrorKind::NoHandler => EventError::NoHandler {
                code: EventErrorCode::NoHandler as u32,
                key: self.message,
            },
            WireErrorKind::TargetGone => EventError::TargetGone {
                code: EventErrorCode::TargetGone as u32,
                window: self.message,
            },
            WireErrorKind::HandlerFailure => EventError::HandlerFailure {
                code: EventErrorCode::HandlerFailure as u32,
                message: self.message,
            },
        }
    }
}
