//! LXD API surface.
//!
//! Every method maps to exactly one HTTP request and returns the decoded
//! response envelope. Server-side errors come back as `Ok(Envelope)`;
//! only transport and decoding problems are `Err`.

use crate::config::ApiConfig;
use crate::envelope::Envelope;
use crate::error::Result;
use crate::operation::{extract_uuid, OperationRecord, OperationRef};
use crate::transport::{RequestSpec, Transport};
use crate::uri::{build_uri, Query};
use async_trait::async_trait;
use reqwest::{Method, Url};
use serde_json::Value;
use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;

/// The set of LXD endpoints this crate knows how to call.
#[async_trait]
pub trait HypervisorApi: Send + Sync {
    /// `GET /` - list supported API versions.
    async fn get_apis(&self) -> Result<Envelope>;

    /// `GET 1.0` - server configuration and environment.
    async fn get_server_info(&self) -> Result<Envelope>;

    /// `PUT 1.0` - replace the server configuration.
    async fn update_server_info(&self, config: Value) -> Result<Envelope>;

    async fn get_images(&self) -> Result<Envelope>;

    async fn get_image(&self, fingerprint: &str) -> Result<Envelope>;

    async fn create_image(&self, spec: Value) -> Result<Envelope>;

    async fn delete_image(&self, fingerprint: &str) -> Result<Envelope>;

    async fn get_containers(&self) -> Result<Envelope>;

    /// `POST 1.0/containers` - answers with an async envelope.
    async fn create_container(&self, spec: Value) -> Result<Envelope>;

    async fn get_container(&self, name: &str, query: Option<&Query>) -> Result<Envelope>;

    async fn update_container(&self, name: &str, spec: Value) -> Result<Envelope>;

    /// `POST 1.0/containers/{name}` with `{"name": new_name}`.
    async fn rename_container(&self, name: &str, spec: Value) -> Result<Envelope>;

    async fn delete_container(&self, name: &str) -> Result<Envelope>;

    async fn get_container_logs(&self, name: &str, query: Option<&Query>) -> Result<Envelope>;

    async fn get_container_log_file(&self, name: &str, file: &str) -> Result<Envelope>;

    async fn delete_container_log_file(&self, name: &str, file: &str) -> Result<Envelope>;

    /// `PUT 1.0/containers/{name}/state` - start, stop, restart, freeze, unfreeze.
    async fn set_container_state(&self, name: &str, state: Value) -> Result<Envelope>;

    async fn exec(&self, name: &str, spec: Value) -> Result<Envelope>;

    async fn get_operations(&self, query: Option<&Query>) -> Result<Envelope>;

    /// `GET 1.0/operations/{uuid}` - current snapshot, does not block.
    async fn get_operation(&self, op: OperationRef<'_>) -> Result<Envelope>;

    /// `GET 1.0/operations/{uuid}/wait` - blocks server-side until the
    /// operation is terminal or the server's own timeout (settable with a
    /// `timeout` query parameter) expires.
    ///
    /// Exactly one request is made. If the server gives up before the
    /// operation finishes, the returned envelope still shows it running and
    /// the caller decides whether to wait again.
    async fn wait_operation(&self, op: OperationRef<'_>, query: Option<&Query>)
        -> Result<Envelope>;

    async fn subscribe_to_events(&self) -> Result<Envelope>;

    async fn get_profiles(&self) -> Result<Envelope>;

    async fn get_profile(&self, name: &str) -> Result<Envelope>;

    async fn get_networks(&self) -> Result<Envelope>;

    async fn get_network(&self, name: &str) -> Result<Envelope>;
}

/// Client for one LXD server.
///
/// Cheap to clone; clones share the underlying transport. The
/// configuration is fixed at construction.
#[derive(Clone)]
pub struct LxdClient {
    base_uri: Url,
    transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for LxdClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LxdClient")
            .field("base_uri", &self.base_uri.as_str())
            .finish_non_exhaustive()
    }
}

impl LxdClient {
    /// Create a client from a validated configuration.
    ///
    /// # Errors
    /// Returns [`LxdError::Configuration`](crate::LxdError::Configuration)
    /// if the HTTP transport cannot be built from the given options.
    pub fn new(config: ApiConfig) -> Result<Self> {
        let transport = config.transport.into_transport()?;
        tracing::debug!(base_uri = %config.base_uri, "LXD client created");
        Ok(Self {
            base_uri: config.base_uri,
            transport,
        })
    }

    pub fn base_uri(&self) -> &Url {
        &self.base_uri
    }

    /// Resolve `path` against the base URI and append `query`.
    pub fn build_uri(&self, path: Option<&str>, query: Option<&Query>) -> Result<Url> {
        build_uri(&self.base_uri, path, query)
    }

    /// Wait once for an operation and interpret the result.
    ///
    /// `timeout` is forwarded to the server as the `timeout` query parameter,
    /// rounded up to whole seconds.
    pub async fn wait_for<'a>(
        &self,
        op: impl Into<OperationRef<'a>>,
        timeout: Option<Duration>,
    ) -> Result<OperationRecord> {
        let op = op.into();
        let uuid = extract_uuid(op)?;
        let query = timeout.map(|t| {
            let secs = t.as_secs() + u64::from(t.subsec_nanos() > 0);
            Query::new().with("timeout", secs)
        });
        let envelope = self.wait_operation(op, query.as_ref()).await?;
        let record = OperationRecord::from_envelope(uuid, &envelope);

        tracing::debug!(
            uuid = %record.uuid,
            status = %record.status,
            terminal = record.is_terminal(),
            "Operation wait returned"
        );
        Ok(record)
    }

    async fn call(
        &self,
        method: Method,
        path: Option<&str>,
        query: Option<&Query>,
        body: Option<Value>,
    ) -> Result<Envelope> {
        let url = self.build_uri(path, query)?;
        let mut spec = RequestSpec::new(method, url);
        if let Some(body) = body {
            spec = spec.with_body(body);
        }

        let (_meta, body) = self.transport.request(spec).await?;
        let envelope: Envelope = serde_json::from_value(body)?;

        if envelope.is_error() {
            tracing::debug!(
                error = envelope.error.as_deref().unwrap_or_default(),
                error_code = envelope.error_code.unwrap_or_default(),
                "Server returned an error envelope"
            );
        }
        Ok(envelope)
    }

    async fn get(&self, path: &str) -> Result<Envelope> {
        self.call(Method::GET, Some(path), None, None).await
    }
}

/// Percent-encode a value used as a single path segment.
fn segment(value: &str) -> Cow<'_, str> {
    urlencoding::encode(value)
}

#[async_trait]
impl HypervisorApi for LxdClient {
    async fn get_apis(&self) -> Result<Envelope> {
        self.call(Method::GET, None, None, None).await
    }

    async fn get_server_info(&self) -> Result<Envelope> {
        self.get("1.0").await
    }

    async fn update_server_info(&self, config: Value) -> Result<Envelope> {
        self.call(Method::PUT, Some("1.0"), None, Some(config)).await
    }

    async fn get_images(&self) -> Result<Envelope> {
        self.get("1.0/images").await
    }

    async fn get_image(&self, fingerprint: &str) -> Result<Envelope> {
        self.get(&format!("1.0/images/{}", segment(fingerprint))).await
    }

    async fn create_image(&self, spec: Value) -> Result<Envelope> {
        self.call(Method::POST, Some("1.0/images"), None, Some(spec))
            .await
    }

    async fn delete_image(&self, fingerprint: &str) -> Result<Envelope> {
        let path = format!("1.0/images/{}", segment(fingerprint));
        self.call(Method::DELETE, Some(&path), None, None).await
    }

    async fn get_containers(&self) -> Result<Envelope> {
        self.get("1.0/containers").await
    }

    async fn create_container(&self, spec: Value) -> Result<Envelope> {
        self.call(Method::POST, Some("1.0/containers"), None, Some(spec))
            .await
    }

    async fn get_container(&self, name: &str, query: Option<&Query>) -> Result<Envelope> {
        let path = format!("1.0/containers/{}", segment(name));
        self.call(Method::GET, Some(&path), query, None).await
    }

    async fn update_container(&self, name: &str, spec: Value) -> Result<Envelope> {
        let path = format!("1.0/containers/{}", segment(name));
        self.call(Method::PUT, Some(&path), None, Some(spec)).await
    }

    async fn rename_container(&self, name: &str, spec: Value) -> Result<Envelope> {
        let path = format!("1.0/containers/{}", segment(name));
        self.call(Method::POST, Some(&path), None, Some(spec)).await
    }

    async fn delete_container(&self, name: &str) -> Result<Envelope> {
        let path = format!("1.0/containers/{}", segment(name));
        self.call(Method::DELETE, Some(&path), None, None).await
    }

    async fn get_container_logs(&self, name: &str, query: Option<&Query>) -> Result<Envelope> {
        let path = format!("1.0/containers/{}/logs", segment(name));
        self.call(Method::GET, Some(&path), query, None).await
    }

    async fn get_container_log_file(&self, name: &str, file: &str) -> Result<Envelope> {
        self.get(&format!(
            "1.0/containers/{}/logs/{}",
            segment(name),
            segment(file)
        ))
        .await
    }

    async fn delete_container_log_file(&self, name: &str, file: &str) -> Result<Envelope> {
        let path = format!("1.0/containers/{}/logs/{}", segment(name), segment(file));
        self.call(Method::DELETE, Some(&path), None, None).await
    }

    async fn set_container_state(&self, name: &str, state: Value) -> Result<Envelope> {
        let path = format!("1.0/containers/{}/state", segment(name));
        self.call(Method::PUT, Some(&path), None, Some(state)).await
    }

    async fn exec(&self, name: &str, spec: Value) -> Result<Envelope> {
        let path = format!("1.0/containers/{}/exec", segment(name));
        self.call(Method::POST, Some(&path), None, Some(spec)).await
    }

    async fn get_operations(&self, query: Option<&Query>) -> Result<Envelope> {
        self.call(Method::GET, Some("1.0/operations/"), query, None)
            .await
    }

    async fn get_operation(&self, op: OperationRef<'_>) -> Result<Envelope> {
        let uuid = extract_uuid(op)?;
        self.get(&format!("1.0/operations/{}", segment(&uuid))).await
    }

    async fn wait_operation(
        &self,
        op: OperationRef<'_>,
        query: Option<&Query>,
    ) -> Result<Envelope> {
        let uuid = extract_uuid(op)?;
        tracing::debug!(%uuid, "Waiting for operation");
        let path = format!("1.0/operations/{}/wait", segment(&uuid));
        self.call(Method::GET, Some(&path), query, None).await
    }

    async fn subscribe_to_events(&self) -> Result<Envelope> {
        self.get("1.0/events/").await
    }

    async fn get_profiles(&self) -> Result<Envelope> {
        self.get("1.0/profiles").await
    }

    async fn get_profile(&self, name: &str) -> Result<Envelope> {
        self.get(&format!("1.0/profiles/{}", segment(name))).await
    }

    async fn get_networks(&self) -> Result<Envelope> {
        self.get("1.0/networks").await
    }

    async fn get_network(&self, name: &str) -> Result<Envelope> {
        self.get(&format!("1.0/networks/{}", segment(name))).await
    }
}
