//! Wire envelopes crossing the host/display-context boundary.
//!
//! Everything between processes is one [`Envelope`]: a correlated request, a
//! fire-and-forget notification, or a response settling a prior request.
//! Argument shapes stay compile-time only; the wire carries a plain key name
//! plus a JSON argument array.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{EventError, WireError};

/// Message exchanged between the host and a display context.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Envelope {
    /// Correlated call expecting exactly one response.
    #[serde(rename_all = "camelCase")]
    Request {
        id: u64,
        target: String,
        key: String,
        args: Vec<Value>,
        source_window: Option<String>,
    },

    /// One-way notification, no response expected.
    #[serde(rename_all = "camelCase")]
    Notify {
        target: String,
        key: String,
        args: Vec<Value>,
        source_window: Option<String>,
    },

    /// Settlement for the request with the same correlation id.
    #[serde(rename_all = "camelCase")]
    Response { id: u64, result: WireResult },
}

/// Result half of a `Response` envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum WireResult {
    #[serde(rename_all = "camelCase")]
    Ok { value: Value },
    #[serde(rename_all = "camelCase")]
    Err { error: WireError },
}

impl WireResult {
    pub fn from_result(result: &Result<Value, EventError>) -> Self {
        match result {
            Ok(value) => Self::Ok {
                value: value.clone(),
            },
            Err(e) => Self::Err {
                error: WireError::from(e),
            },
        }
    }

    pub fn into_result(self) -> Result<Value, EventError> {
        match self {
            Self::Ok { value } => Ok(value),
            Self::Err { error } => Err(error.into_event_error()),
        }
    }
}

/// Serialize a (by convention, tuple) argument pack into the wire array form.
///
/// `()` serializes to JSON null and becomes the empty argument list; a
/// non-array scalar is wrapped so single-argument calls stay well-formed.
pub fn encode_args<A: Serialize>(args: &A) -> Result<Vec<Value>, EventError> {
    match serde_json::to_value(args)? {
        Value::Array(items) => Ok(items),
        Value::Null => Ok(Vec::new()),
        other => Ok(vec![other]),
    }
}

/// Rebuild the typed argument pack from the wire array.
pub fn decode_args<A: DeserializeOwned>(args: Vec<Value>) -> Result<A, EventError> {
    let empty = args.is_empty();
    match serde_json::from_value(Value::Array(args)) {
        Ok(decoded) => Ok(decoded),
        // Unit argument packs deserialize from null, not from [].
        Err(_) if empty => Ok(serde_json::from_value(Value::Null)?),
        Err(e) => Err(e.into()),
    }
}

/// Serialize a handler's return value for the wire.
pub fn encode_result<R: Serialize>(result: &R) -> Result<Value, EventError> {
    Ok(serde_json::to_value(result)?)
}

/// Rebuild a typed result on the calling side.
pub fn decode_result<R: DeserializeOwned>(value: Value) -> Result<R, EventError> {
    Ok(serde_json::from_value(value)?)
}
