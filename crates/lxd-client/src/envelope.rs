//! Response envelope returned by every LXD endpoint.

use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

static NULL: Value = Value::Null;

/// The `{type, status, status_code, metadata, ...}` wrapper around every
/// LXD response.
///
/// Fields the client does not know about are kept in `extra`, so an
/// envelope serializes back to what the server sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// `sync`, `async` or `error`.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,

    /// URL of the background operation for async responses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<i64>,

    /// `None` when the key was absent, `Some(Value::Null)` for an explicit
    /// `null`.
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub metadata: Option<Value>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Envelope {
    /// True for responses that created a background operation.
    pub fn is_async(&self) -> bool {
        self.kind.as_deref() == Some("async")
            || self.operation.as_deref().is_some_and(|op| !op.is_empty())
    }

    /// True if this is the server's error shape.
    ///
    /// An error type, a non-empty `error`, a non-zero `error_code`, or a
    /// `Failure` status all count.
    pub fn is_error(&self) -> bool {
        self.kind.as_deref() == Some("error")
            || self.error.as_deref().is_some_and(|e| !e.is_empty())
            || self.error_code.is_some_and(|c| c != 0)
            || self.status.as_deref() == Some("Failure")
    }

    /// The `metadata` payload, `null` when absent.
    pub fn metadata(&self) -> &Value {
        self.metadata.as_ref().unwrap_or(&NULL)
    }

    /// Decode `metadata` into a typed value.
    pub fn metadata_as<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        T::deserialize(self.metadata())
    }
}

fn present<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sync_envelope() {
        let env: Envelope = serde_json::from_value(json!({
            "type": "sync",
            "status": "Success",
            "status_code": 200,
            "metadata": ["/1.0"]
        }))
        .unwrap();

        assert_eq!(env.status.as_deref(), Some("Success"));
        assert!(!env.is_async());
        assert!(!env.is_error());
        let apis: Vec<String> = env.metadata_as().unwrap();
        assert_eq!(apis, vec!["/1.0"]);
    }

    #[test]
    fn test_async_envelope() {
        let env: Envelope = serde_json::from_value(json!({
            "type": "async",
            "status": "Operation created",
            "status_code": 100,
            "operation": "/1.0/operations/b8d84888-1dc2-44fd-b386-7f679e171ba5",
            "metadata": {"id": "b8d84888-1dc2-44fd-b386-7f679e171ba5"}
        }))
        .unwrap();
        assert!(env.is_async());
        assert!(!env.is_error());
    }

    #[test]
    fn test_error_envelope_round_trips_verbatim() {
        let raw = json!({
            "status": "Failure",
            "error": "not found",
            "error_code": 404
        });
        let env: Envelope = serde_json::from_value(raw.clone()).unwrap();
        assert!(env.is_error());
        assert_eq!(serde_json::to_value(&env).unwrap(), raw);
    }

    #[test]
    fn test_explicit_null_metadata_preserved() {
        let raw = json!({
            "type": "error",
            "status": "",
            "status_code": 0,
            "operation": "",
            "error_code": 404,
            "error": "not found",
            "metadata": null
        });
        let env: Envelope = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(env.metadata, Some(Value::Null));
        assert!(env.is_error());
        assert!(!env.is_async());
        assert_eq!(serde_json::to_value(&env).unwrap(), raw);

        let env: Envelope = serde_json::from_value(json!({"type": "sync"})).unwrap();
        assert_eq!(env.metadata, None);
        assert!(env.metadata().is_null());
    }

    #[test]
    fn test_unknown_fields_preserved() {
        let raw = json!({
            "type": "sync",
            "status": "Success",
            "status_code": 200,
            "operation": "",
            "error_code": 0,
            "error": "",
            "metadata": {"api_version": "1.0"},
            "future_field": [1, 2, 3]
        });
        let env: Envelope = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(env.extra.get("future_field"), Some(&json!([1, 2, 3])));
        assert!(!env.is_error());
        assert_eq!(serde_json::to_value(&env).unwrap(), raw);
    }
}
