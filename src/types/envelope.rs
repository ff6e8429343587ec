//! Result envelope shared by every JSON endpoint, plus per-endpoint payloads.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Envelope status as sent on the wire (`"OK"` / `"Error"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResultStatus {
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "Error")]
    Error,
}

/// `{status, data, error, metrics}` wrapper returned by the service.
///
/// `T` is the endpoint-specific payload type; it defaults to raw JSON for endpoints
/// whose data shape is server-defined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: DeserializeOwned"))]
pub struct ResultEnvelope<T = Value> {
    pub status: ResultStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<Value>,
}

impl<T: DeserializeOwned> ResultEnvelope<T> {
    /// Interpret a response body as an envelope carrying `T`.
    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value)
            .map_err(|e| Error::invalid_response(format!("malformed result envelope: {}", e)))
    }
}

impl ResultEnvelope<Value> {
    /// Re-type the `data` payload once the envelope status has been checked.
    pub fn into_typed<U: DeserializeOwned>(self) -> Result<ResultEnvelope<U>> {
        let data = match self.data {
            None | Some(Value::Null) => None,
            Some(value) => {
                let typed = serde_json::from_value(value).map_err(|e| {
                    Error::invalid_response(format!("unexpected data payload: {}", e))
                })?;
                Some(typed)
            }
        };
        Ok(ResultEnvelope {
            status: self.status,
            data,
            error: self.error,
            metrics: self.metrics,
        })
    }
}

impl<T> ResultEnvelope<T> {
    pub fn is_ok(&self) -> bool {
        self.status == ResultStatus::Ok
    }

    /// Human-readable rendering of the `error` field.
    ///
    /// Strings are returned verbatim, structured errors as compact JSON, and an absent
    /// field as `"None"`.
    pub fn error_message(&self) -> String {
        match &self.error {
            None | Some(Value::Null) => "None".to_string(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }
}

/// Handle returned by task submission: `{token, type}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskInfo {
    pub token: String,
    #[serde(rename = "type")]
    pub task_type: String,
}

/// Task status payload.
///
/// `status` is kept as raw JSON: the service does not always include it while a task
/// is spinning up, and does not promise it is a string.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TaskStatus {
    pub const RUNNING: &'static str = "Running";

    /// The status label, when the service sent one as a string.
    pub fn state(&self) -> Option<&str> {
        self.status.as_ref().and_then(Value::as_str)
    }

    pub fn is_running(&self) -> bool {
        self.state() == Some(Self::RUNNING)
    }

    /// Whether a raw status payload reports `Running`. Any other shape counts as not
    /// running.
    pub fn payload_is_running(data: &Value) -> bool {
        data.get("status").and_then(Value::as_str) == Some(Self::RUNNING)
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}
