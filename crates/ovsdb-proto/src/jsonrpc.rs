//! JSON-RPC 1.0 framing.
//!
//! OVSDB speaks JSON-RPC 1.0 over a raw byte stream: requests carry
//! `{method, params, id}`, responses `{result, error, id}`, and
//! notifications a method with a null id. The device also sends its own
//! requests (`echo`) that the client must answer on the same stream.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ProtoError;

/// Method names used by the OVSDB management protocol.
pub mod methods {
    pub const LIST_DBS: &str = "list_dbs";
    pub const GET_SCHEMA: &str = "get_schema";
    pub const TRANSACT: &str = "transact";
    pub const MONITOR: &str = "monitor";
    pub const MONITOR_CANCEL: &str = "monitor_cancel";
    pub const UPDATE: &str = "update";
    pub const ECHO: &str = "echo";
}

/// An outbound JSON-RPC request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub method: String,
    pub params: Value,
    pub id: Value,
}

impl Request {
    pub fn new(id: u64, method: impl Into<String>, params: Value) -> Self {
        Self {
            method: method.into(),
            params,
            id: Value::from(id),
        }
    }

    /// The reply answering a device-originated request (echo).
    pub fn reply(id: Value, result: Value) -> Value {
        serde_json::json!({ "id": id, "result": result, "error": null })
    }
}

/// A classified inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// A reply to one of our requests.
    Response {
        id: u64,
        result: Value,
        error: Value,
    },
    /// A device-originated request expecting a reply (echo).
    Request {
        id: Value,
        method: String,
        params: Value,
    },
    /// A push notification (update); carries no id.
    Notification { method: String, params: Value },
}

impl Frame {
    /// Classifies a decoded JSON value.
    ///
    /// A frame with a `method` member is a request when its id is
    /// non-null, a notification otherwise; anything else with an id is
    /// a response.
    pub fn from_value(value: Value) -> Result<Self, ProtoError> {
        let obj = value
            .as_object()
            .ok_or_else(|| ProtoError::Frame(format!("frame is not an object: {value}")))?;

        if let Some(method) = obj.get("method").and_then(Value::as_str) {
            let method = method.to_string();
            let params = obj.get("params").cloned().unwrap_or(Value::Null);
            let id = obj.get("id").cloned().unwrap_or(Value::Null);
            if id.is_null() {
                return Ok(Frame::Notification { method, params });
            }
            return Ok(Frame::Request { id, method, params });
        }

        let id = obj
            .get("id")
            .and_then(Value::as_u64)
            .ok_or_else(|| ProtoError::Frame(format!("response without a numeric id: {value}")))?;
        Ok(Frame::Response {
            id,
            result: obj.get("result").cloned().unwrap_or(Value::Null),
            error: obj.get("error").cloned().unwrap_or(Value::Null),
        })
    }
}
