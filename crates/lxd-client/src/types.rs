//! Typed request bodies for the common container calls.
//!
//! The API methods take raw JSON so any field the server understands can
//! be sent; these types cover the usual cases. Convert with
//! `serde_json::to_value`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Where a new container's root filesystem comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContainerSource {
    /// Create from a local or remote image.
    Image {
        #[serde(skip_serializing_if = "Option::is_none")]
        alias: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        fingerprint: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        server: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        protocol: Option<String>,
    },
    /// Create an empty container.
    None,
}

impl ContainerSource {
    /// Image source selected by alias on the local server.
    pub fn image_alias(alias: impl Into<String>) -> Self {
        ContainerSource::Image {
            alias: Some(alias.into()),
            fingerprint: None,
            server: None,
            protocol: None,
        }
    }
}

/// Body of `POST 1.0/containers`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateContainer {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub architecture: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub profiles: Vec<String>,
    #[serde(default)]
    pub ephemeral: bool,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub config: BTreeMap<String, String>,
    pub source: ContainerSource,
}

impl CreateContainer {
    pub fn new(name: impl Into<String>, source: ContainerSource) -> Self {
        Self {
            name: name.into(),
            architecture: None,
            profiles: Vec::new(),
            ephemeral: false,
            config: BTreeMap::new(),
            source,
        }
    }

    pub fn architecture(mut self, arch: impl Into<String>) -> Self {
        self.architecture = Some(arch.into());
        self
    }

    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.profiles.push(profile.into());
        self
    }

    pub fn config(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }

    pub fn ephemeral(mut self, ephemeral: bool) -> Self {
        self.ephemeral = ephemeral;
        self
    }
}

/// Body of `POST 1.0/containers/{name}` when renaming.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameContainer {
    pub name: String,
}

/// State transition requested through `PUT 1.0/containers/{name}/state`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateAction {
    Start,
    Stop,
    Restart,
    Freeze,
    Unfreeze,
}

impl std::str::FromStr for StateAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "start" => Ok(Self::Start),
            "stop" => Ok(Self::Stop),
            "restart" => Ok(Self::Restart),
            "freeze" => Ok(Self::Freeze),
            "unfreeze" => Ok(Self::Unfreeze),
            other => Err(format!("unknown state action '{other}'")),
        }
    }
}

/// Body of `PUT 1.0/containers/{name}/state`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateChange {
    pub action: StateAction,
    /// Seconds to wait for the change before giving up (server default: 30).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<i64>,
    #[serde(default)]
    pub force: bool,
    #[serde(default)]
    pub stateful: bool,
}

impl StateChange {
    pub fn new(action: StateAction) -> Self {
        Self {
            action,
            timeout: None,
            force: false,
            stateful: false,
        }
    }

    pub fn timeout(mut self, secs: i64) -> Self {
        self.timeout = Some(secs);
        self
    }

    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }
}

/// Body of `POST 1.0/containers/{name}/exec`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecRequest {
    pub command: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub environment: BTreeMap<String, String>,
    #[serde(rename = "wait-for-websocket", default)]
    pub wait_for_websocket: bool,
    #[serde(default)]
    pub interactive: bool,
    #[serde(rename = "record-output", default)]
    pub record_output: bool,
}

impl ExecRequest {
    /// Non-interactive command whose output the server records to log files.
    pub fn new<I, S>(command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            command: command.into_iter().map(Into::into).collect(),
            environment: BTreeMap::new(),
            wait_for_websocket: false,
            interactive: false,
            record_output: true,
        }
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment.insert(key.into(), value.into());
        self
    }
}
