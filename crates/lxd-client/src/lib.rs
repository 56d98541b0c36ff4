//! # lxd-client
//!
//! Async client for the LXD REST API.
//!
//! Mutating LXD calls do not return their final result. They answer with
//! an `async` envelope pointing at a background operation, which the caller
//! then waits on. This crate keeps that model visible: every API method
//! performs exactly one HTTP request and returns the server's envelope,
//! and the operation helpers resolve and wait on the referenced operation.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                       lxd-client                         │
//! ├──────────────────────────────────────────────────────────┤
//! │                                                          │
//! │  ┌─────────────────┐     ┌──────────────────────────┐   │
//! │  │   LxdClient     │────▶│  build_uri(path, query)  │   │
//! │  │ (HypervisorApi) │     └──────────────────────────┘   │
//! │  │  - containers   │                                    │
//! │  │  - images       │     ┌──────────────────────────┐   │
//! │  │  - operations   │────▶│  extract_uuid(op)        │   │
//! │  └─────────────────┘     └──────────────────────────┘   │
//! │           │                                              │
//! │           ▼                                              │
//! │  ┌─────────────────┐                                    │
//! │  │ dyn Transport   │  HttpTransport (reqwest) or a stub │
//! │  └─────────────────┘                                    │
//! │                                                          │
//! └──────────────────────────────────────────────────────────┘
//!                           │ HTTPS + client certificate
//!                           ▼
//!                ┌─────────────────────┐
//!                │   LXD  /1.0/...     │
//!                └─────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```no_run
//! use lxd_client::{
//!     ApiConfig, ClientConfig, ContainerSource, CreateContainer, HypervisorApi, LxdClient,
//! };
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = ClientConfig::new()
//!     .identity(std::fs::read("client.crt")?, std::fs::read("client.key")?)
//!     .strict_tls(false);
//! let client = LxdClient::new(ApiConfig::new("https://127.0.0.1:8443/", transport)?)?;
//!
//! let body = CreateContainer::new("web1", ContainerSource::image_alias("ubuntu"))
//!     .profile("default");
//! let created = client.create_container(serde_json::to_value(&body)?).await?;
//!
//! let record = client.wait_for(&created, Some(Duration::from_secs(60))).await?;
//! println!("operation {} finished as {}", record.uuid, record.status);
//! # Ok(())
//! # }
//! ```

mod api;
mod config;
mod envelope;
mod error;
mod operation;
mod transport;
mod types;
mod uri;

pub use api::{HypervisorApi, LxdClient};
pub use config::{ApiConfig, ApiConfigBuilder, TransportSource};
pub use envelope::Envelope;
pub use error::{LxdError, Result, TransportError};
pub use operation::{extract_uuid, Operation, OperationRecord, OperationRef, OperationStatus};
pub use transport::{
    ClientConfig, HttpTransport, JsonBody, RequestSpec, ResponseMeta, TlsIdentity, Transport,
};
pub use types::{
    ContainerSource, CreateContainer, ExecRequest, RenameContainer, StateAction, StateChange,
};
pub use uri::{build_uri, Query};

/// Re-exported so [`Transport`] implementations can name these types.
pub use reqwest::{Method, StatusCode, Url};
