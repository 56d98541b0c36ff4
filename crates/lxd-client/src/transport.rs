//! HTTP transport.
//!
//! A [`Transport`] turns one [`RequestSpec`] into exactly one HTTP call and
//! hands back the response metadata together with the parsed JSON body.
//! [`HttpTransport`] is the reqwest-backed implementation; tests substitute
//! their own.

use crate::error::{LxdError, Result, TransportError};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT};
use reqwest::{Method, StatusCode, Url};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// PEM-encoded TLS client identity.
#[derive(Clone, PartialEq, Eq)]
pub struct TlsIdentity {
    /// Client certificate (PEM).
    pub cert_pem: Vec<u8>,
    /// Private key matching `cert_pem` (PEM).
    pub key_pem: Vec<u8>,
}

impl fmt::Debug for TlsIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsIdentity")
            .field("cert_pem", &format_args!("{} bytes", self.cert_pem.len()))
            .field("key_pem", &"<redacted>")
            .finish()
    }
}

/// Transport options.
///
/// The transport keeps its own copy; changing a `ClientConfig` after it was
/// handed over has no effect on requests already being issued with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Headers sent with every request.
    pub headers: BTreeMap<String, String>,
    /// Client certificate and key presented to the server.
    pub identity: Option<TlsIdentity>,
    /// Additional trusted CA certificate (PEM).
    pub ca_cert_pem: Option<Vec<u8>>,
    /// Validate the server certificate (default: true).
    ///
    /// LXD servers usually run with a self-signed certificate, so this is
    /// commonly turned off together with an explicit client identity.
    pub strict_tls: bool,
    /// Override for the `User-Agent` header.
    pub user_agent: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            headers: BTreeMap::new(),
            identity: None,
            ca_cert_pem: None,
            strict_tls: true,
            user_agent: None,
        }
    }
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a header sent with every request.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Set the TLS client certificate and private key (both PEM).
    pub fn identity(mut self, cert_pem: impl Into<Vec<u8>>, key_pem: impl Into<Vec<u8>>) -> Self {
        self.identity = Some(TlsIdentity {
            cert_pem: cert_pem.into(),
            key_pem: key_pem.into(),
        });
        self
    }

    /// Trust an additional CA certificate (PEM).
    pub fn ca_cert(mut self, pem: impl Into<Vec<u8>>) -> Self {
        self.ca_cert_pem = Some(pem.into());
        self
    }

    /// Enable or disable server certificate validation.
    pub fn strict_tls(mut self, strict: bool) -> Self {
        self.strict_tls = strict;
        self
    }

    /// Set the `User-Agent` header.
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    fn default_headers(&self) -> Result<HeaderMap> {
        let mut map = HeaderMap::new();
        for (name, value) in &self.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| LxdError::Configuration(format!("invalid header name '{name}': {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| LxdError::Configuration(format!("invalid value for header '{name}': {e}")))?;
            map.insert(name, value);
        }
        map.entry(ACCEPT)
            .or_insert(HeaderValue::from_static("application/json"));
        Ok(map)
    }
}

/// Request body selector.
#[derive(Debug, Clone, PartialEq)]
pub enum JsonBody {
    /// No request body; a JSON response is expected.
    Expect,
    /// Send this value as a JSON body; the response is parsed as JSON too.
    Body(Value),
}

/// A single request to issue.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestSpec {
    pub method: Method,
    pub url: Url,
    pub json: JsonBody,
}

impl RequestSpec {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            json: JsonBody::Expect,
        }
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.json = JsonBody::Body(body);
        self
    }

    /// Request body, if any.
    pub fn body(&self) -> Option<&Value> {
        match &self.json {
            JsonBody::Expect => None,
            JsonBody::Body(body) => Some(body),
        }
    }
}

/// Raw response metadata.
#[derive(Debug, Clone)]
pub struct ResponseMeta {
    pub status: StatusCode,
    pub headers: HeaderMap,
}

impl ResponseMeta {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
        }
    }
}

/// Issues HTTP requests on behalf of the API surface.
///
/// Implementations must perform exactly one call per `request`, must not
/// retry, and must surface failures without reclassifying them. A non-2xx
/// status is not a failure: the body is returned like any other.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn request(
        &self,
        spec: RequestSpec,
    ) -> std::result::Result<(ResponseMeta, Value), TransportError>;
}

/// reqwest-backed [`Transport`].
#[derive(Debug, Clone)]
pub struct HttpTransport {
    config: ClientConfig,
    client: reqwest::Client,
}

impl HttpTransport {
    /// Build the underlying HTTP client from `config`.
    ///
    /// # Errors
    /// Returns [`LxdError::Configuration`] if a header, the client identity
    /// or the CA certificate cannot be loaded.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .default_headers(config.default_headers()?)
            .danger_accept_invalid_certs(!config.strict_tls);

        if let Some(agent) = &config.user_agent {
            builder = builder.user_agent(agent.as_str());
        }

        if let Some(identity) = &config.identity {
            let mut pem = identity.cert_pem.clone();
            pem.push(b'\n');
            pem.extend_from_slice(&identity.key_pem);
            let identity = reqwest::Identity::from_pem(&pem)
                .map_err(|e| LxdError::Configuration(format!("invalid client identity: {e}")))?;
            builder = builder.identity(identity);
        }

        if let Some(ca) = &config.ca_cert_pem {
            let cert = reqwest::Certificate::from_pem(ca)
                .map_err(|e| LxdError::Configuration(format!("invalid CA certificate: {e}")))?;
            builder = builder.add_root_certificate(cert);
        }

        let client = builder
            .build()
            .map_err(|e| LxdError::Configuration(format!("failed to build HTTP client: {e}")))?;

        tracing::debug!(
            strict_tls = config.strict_tls,
            has_identity = config.identity.is_some(),
            headers = config.headers.len(),
            "HTTP transport created"
        );

        Ok(Self { config, client })
    }

    /// The configuration snapshot this transport was built from.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn request(
        &self,
        spec: RequestSpec,
    ) -> std::result::Result<(ResponseMeta, Value), TransportError> {
        let start = std::time::Instant::now();
        tracing::debug!(method = %spec.method, url = %spec.url, "Sending request");

        let mut request = self
            .client
            .request(spec.method.clone(), spec.url.clone());

        if let JsonBody::Body(body) = &spec.json {
            tracing::trace!(body = %body, "Request body");
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            tracing::debug!(method = %spec.method, url = %spec.url, error = %e, "Request failed");
            TransportError::Http(e)
        })?;

        let meta = ResponseMeta {
            status: response.status(),
            headers: response.headers().clone(),
        };
        let bytes = response.bytes().await?;

        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)?
        };

        tracing::debug!(
            method = %spec.method,
            url = %spec.url,
            status = %meta.status,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Response received"
        );
        tracing::trace!(body = %body, "Response body");

        Ok((meta, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_client_config_defaults() {
        let config = ClientConfig::default();
        assert!(config.strict_tls);
        assert!(config.identity.is_none());
        assert!(config.headers.is_empty());
    }

    #[test]
    fn test_transport_keeps_own_snapshot() {
        let mut config = ClientConfig::new().header("X-Trace", "1");
        let transport = HttpTransport::new(config.clone()).unwrap();

        config.headers.insert("X-Other".into(), "2".into());
        config.strict_tls = false;

        assert_eq!(transport.config().headers.len(), 1);
        assert!(transport.config().strict_tls);
    }

    #[test]
    fn test_accept_defaults_to_json() {
        let headers = ClientConfig::new().header("X-Trace", "1").default_headers().unwrap();
        assert_eq!(headers[ACCEPT], "application/json");
        assert_eq!(headers["x-trace"], "1");
    }

    #[test]
    fn test_caller_accept_header_wins() {
        let headers = ClientConfig::new()
            .header("Accept", "application/vnd.lxd+json")
            .default_headers()
            .unwrap();
        assert_eq!(headers.get_all(ACCEPT).iter().count(), 1);
        assert_eq!(headers[ACCEPT], "application/vnd.lxd+json");
    }

    #[test]
    fn test_invalid_header_is_configuration_error() {
        let config = ClientConfig::new().header("bad header", "x");
        let err = HttpTransport::new(config).unwrap_err();
        assert!(matches!(err, LxdError::Configuration(_)));
    }

    #[test]
    fn test_invalid_identity_is_configuration_error() {
        let config = ClientConfig::new().identity("not a cert", "not a key");
        let err = HttpTransport::new(config).unwrap_err();
        assert!(matches!(err, LxdError::Configuration(_)));
    }

    #[test]
    fn test_identity_debug_redacts_key() {
        let config = ClientConfig::new().identity("CERT", "SECRET-KEY");
        let debug = format!("{config:?}");
        assert!(!debug.contains("SECRET-KEY"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_request_spec_body() {
        let url = Url::parse("https://lxd:8443/1.0").unwrap();
        let spec = RequestSpec::new(Method::GET, url.clone());
        assert!(spec.body().is_none());

        let spec = RequestSpec::new(Method::PUT, url).with_body(json!({"config": {}}));
        assert_eq!(spec.body(), Some(&json!({"config": {}})));
    }

    #[tokio::test]
    async fn test_connection_refused_surfaces_http_error() {
        let transport = HttpTransport::new(ClientConfig::default()).unwrap();
        // Port 9 (discard) on localhost is almost never listening.
        let url = Url::parse("http://127.0.0.1:9/1.0").unwrap();
        let err = transport
            .request(RequestSpec::new(Method::GET, url))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Http(_)));
    }
}
