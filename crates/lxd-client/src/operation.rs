//! Background operation tracking.
//!
//! Mutating LXD calls answer with an `async` envelope whose `operation`
//! field points at `/1.0/operations/{uuid}`. The helpers here turn such a
//! reference into a UUID and interpret the operation state reported by
//! `get_operation` and `wait_operation`.
//!
//! ```text
//! Pending ──▶ Running ──┬──▶ Success
//!                       ├──▶ Failure
//!                       └──▶ Cancelled
//! ```

use crate::envelope::Envelope;
use crate::error::{LxdError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Something that identifies an operation.
#[derive(Debug, Clone, Copy)]
pub enum OperationRef<'a> {
    /// A bare UUID or an operation URL such as `/1.0/operations/{uuid}`.
    Id(&'a str),
    /// A response envelope carrying an `operation` field.
    Envelope(&'a Envelope),
    /// Raw JSON: either a string, or an object with an `operation` field.
    Value(&'a Value),
}

impl<'a> From<&'a str> for OperationRef<'a> {
    fn from(id: &'a str) -> Self {
        OperationRef::Id(id)
    }
}

impl<'a> From<&'a String> for OperationRef<'a> {
    fn from(id: &'a String) -> Self {
        OperationRef::Id(id.as_str())
    }
}

impl<'a> From<&'a Envelope> for OperationRef<'a> {
    fn from(envelope: &'a Envelope) -> Self {
        OperationRef::Envelope(envelope)
    }
}

impl<'a> From<&'a Value> for OperationRef<'a> {
    fn from(value: &'a Value) -> Self {
        OperationRef::Value(value)
    }
}

/// Resolve an operation reference to its UUID.
///
/// The last `/`-separated segment of the reference is the UUID; any query
/// string is ignored.
///
/// # Errors
/// Returns [`LxdError::InvalidOperationReference`] when no UUID can be
/// found, e.g. for a synchronous envelope that never created an operation.
pub fn extract_uuid<'a>(op: impl Into<OperationRef<'a>>) -> Result<String> {
    match op.into() {
        OperationRef::Id(id) => uuid_from_path(id),
        OperationRef::Envelope(envelope) => match envelope.operation.as_deref() {
            Some(path) => uuid_from_path(path),
            None => Err(LxdError::InvalidOperationReference(
                "envelope has no 'operation' field".into(),
            )),
        },
        OperationRef::Value(Value::String(id)) => uuid_from_path(id),
        OperationRef::Value(Value::Object(map)) => match map.get("operation") {
            Some(Value::String(path)) => uuid_from_path(path),
            Some(other) => Err(LxdError::InvalidOperationReference(format!(
                "'operation' field is not a string: {other}"
            ))),
            None => Err(LxdError::InvalidOperationReference(
                "object has no 'operation' field".into(),
            )),
        },
        OperationRef::Value(other) => Err(LxdError::InvalidOperationReference(format!(
            "expected a string or an object, got {other}"
        ))),
    }
}

fn uuid_from_path(path: &str) -> Result<String> {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    match path.rsplit('/').next() {
        Some(uuid) if !uuid.is_empty() => Ok(uuid.to_string()),
        _ => Err(LxdError::InvalidOperationReference(format!(
            "no operation id in '{path}'"
        ))),
    }
}

/// Lifecycle state of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationStatus {
    Pending,
    Running,
    Success,
    Failure,
    Cancelled,
}

impl OperationStatus {
    /// Map an LXD status name (`"Running"`, `"Success"`, ...).
    ///
    /// `Operation created`, `Started` and `Cancelling` count as running.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "running" | "started" | "operation created" | "cancelling" => Some(Self::Running),
            "success" => Some(Self::Success),
            "failure" => Some(Self::Failure),
            "cancelled" | "canceled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Map an LXD status code.
    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            105 => Some(Self::Pending),
            100 | 101 | 103 | 104 => Some(Self::Running),
            200 => Some(Self::Success),
            400 => Some(Self::Failure),
            401 => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Success, Failure and Cancelled are terminal.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Failure | Self::Cancelled)
    }
}

impl fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationStatus::Pending => write!(f, "Pending"),
            OperationStatus::Running => write!(f, "Running"),
            OperationStatus::Success => write!(f, "Success"),
            OperationStatus::Failure => write!(f, "Failure"),
            OperationStatus::Cancelled => write!(f, "Cancelled"),
        }
    }
}

/// State of one operation as last reported by the server.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationRecord {
    pub uuid: String,
    pub status: OperationStatus,
    /// The operation object from the most recent envelope.
    pub last_metadata: Value,
}

impl OperationRecord {
    /// Interpret the envelope returned by `get_operation`/`wait_operation`.
    ///
    /// The operation object's own `status`/`status_code` take precedence
    /// over the envelope's. An error envelope without operation data maps
    /// to `Failure`.
    pub fn from_envelope(uuid: impl Into<String>, envelope: &Envelope) -> Self {
        let metadata = envelope.metadata();
        let status = metadata
            .get("status")
            .and_then(Value::as_str)
            .and_then(OperationStatus::from_name)
            .or_else(|| {
                metadata
                    .get("status_code")
                    .and_then(Value::as_u64)
                    .and_then(|c| u16::try_from(c).ok())
                    .and_then(OperationStatus::from_code)
            })
            .or_else(|| {
                if envelope.is_error() {
                    Some(OperationStatus::Failure)
                } else {
                    None
                }
            })
            .or_else(|| envelope.status.as_deref().and_then(OperationStatus::from_name))
            .or_else(|| envelope.status_code.and_then(OperationStatus::from_code))
            .unwrap_or(OperationStatus::Pending);

        Self {
            uuid: uuid.into(),
            status,
            last_metadata: metadata.clone(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Error message reported by a failed operation.
    pub fn error(&self) -> Option<&str> {
        self.last_metadata
            .get("err")
            .and_then(Value::as_str)
            .filter(|e| !e.is_empty())
    }
}

/// Typed view of the operation object in an envelope's `metadata`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub id: String,
    #[serde(default)]
    pub class: String,
    #[serde(default)]
    pub description: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub status: String,
    pub status_code: u16,
    #[serde(default)]
    pub resources: Option<Map<String, Value>>,
    #[serde(default)]
    pub metadata: Option<Value>,
    #[serde(default)]
    pub may_cancel: bool,
    #[serde(default)]
    pub err: String,
    #[serde(default)]
    pub location: String,
}

impl Operation {
    pub fn state(&self) -> Option<OperationStatus> {
        OperationStatus::from_name(&self.status).or_else(|| OperationStatus::from_code(self.status_code))
    }
}
