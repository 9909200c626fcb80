//! Per-operation transaction results.
//!
//! A transact reply carries an array positionally aligned with the
//! request's operation array. Each element is a success payload
//! (`{uuid}`, `{count}` or `{rows}`), an `{error, details}` object, or
//! null/empty for operations the device never reached.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ProtoError;
use crate::notation::{Datum, Row, Uuid};

/// Result of one operation within a transaction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OperationResult {
    /// Resolved identifier reported for an insert.
    #[serde(default, skip_serializing_if = "Option::is_none", with = "uuid_pair_opt")]
    pub uuid: Option<Uuid>,

    /// Affected-row count reported for update/mutate/delete.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,

    /// Rows reported for a select.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rows: Option<Vec<Row>>,

    /// Error code, when the operation failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Human-readable failure detail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl OperationResult {
    /// True when the device reported an error for this operation.
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Error code and detail, joined for logging.
    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(|e| match &self.details {
            Some(d) => format!("{e}: {d}"),
            None => e.clone(),
        })
    }
}

/// Decodes a transact reply's result member.
///
/// Null or empty-object elements (operations past the failure point)
/// decode to the default result.
pub fn decode_results(value: &Value) -> Result<Vec<OperationResult>, ProtoError> {
    let arr = value
        .as_array()
        .ok_or_else(|| ProtoError::Result(format!("result is not an array: {value}")))?;
    arr.iter()
        .map(|v| {
            if v.is_null() {
                Ok(OperationResult::default())
            } else {
                serde_json::from_value(v.clone())
                    .map_err(|e| ProtoError::Result(format!("bad result element {v}: {e}")))
            }
        })
        .collect()
}

/// serde adapter for an optional `["uuid", s]` pair member.
mod uuid_pair_opt {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(uuid: &Option<Uuid>, serializer: S) -> Result<S::Ok, S::Error> {
        match uuid {
            Some(u) => Datum::Uuid(*u).serialize(serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Uuid>, D::Error> {
        let datum = Datum::deserialize(deserializer)?;
        match datum {
            Datum::Uuid(u) => Ok(Some(u)),
            other => Err(serde::de::Error::custom(format!(
                "expected a uuid pair, got {other:?}"
            ))),
        }
    }
}
