//! Client configuration.

use crate::error::{LxdError, Result};
use crate::transport::{ClientConfig, HttpTransport, Transport};
use reqwest::Url;
use std::fmt;
use std::sync::Arc;

/// Where the client gets its transport from.
#[derive(Clone)]
pub enum TransportSource {
    /// Build an [`HttpTransport`] from these options.
    Config(ClientConfig),
    /// Use an already constructed transport.
    Instance(Arc<dyn Transport>),
}

impl fmt::Debug for TransportSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportSource::Config(config) => f.debug_tuple("Config").field(config).finish(),
            TransportSource::Instance(_) => f.write_str("Instance(..)"),
        }
    }
}

impl From<ClientConfig> for TransportSource {
    fn from(config: ClientConfig) -> Self {
        TransportSource::Config(config)
    }
}

impl From<Arc<dyn Transport>> for TransportSource {
    fn from(transport: Arc<dyn Transport>) -> Self {
        TransportSource::Instance(transport)
    }
}

impl TransportSource {
    /// Resolve into a ready-to-use transport.
    pub(crate) fn into_transport(self) -> Result<Arc<dyn Transport>> {
        match self {
            TransportSource::Config(config) => {
                let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(config)?);
                Ok(transport)
            }
            TransportSource::Instance(transport) => Ok(transport),
        }
    }
}

/// Validated configuration for an [`LxdClient`](crate::LxdClient).
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Absolute `http`/`https` URI ending in `/`.
    pub base_uri: Url,
    pub transport: TransportSource,
}

impl ApiConfig {
    /// Create a new config builder.
    pub fn builder() -> ApiConfigBuilder {
        ApiConfigBuilder::default()
    }

    /// Shorthand for a builder with both fields set.
    pub fn new(base_uri: &str, transport: impl Into<TransportSource>) -> Result<Self> {
        Self::builder().base_uri(base_uri).transport(transport).build()
    }
}

/// Builder for [`ApiConfig`].
#[derive(Debug, Default)]
pub struct ApiConfigBuilder {
    base_uri: Option<String>,
    transport: Option<TransportSource>,
}

impl ApiConfigBuilder {
    /// Set the server base URI, e.g. `https://10.0.0.5:8443/`.
    pub fn base_uri(mut self, uri: impl Into<String>) -> Self {
        self.base_uri = Some(uri.into());
        self
    }

    /// Set the transport options or a pre-built transport.
    pub fn transport(mut self, transport: impl Into<TransportSource>) -> Self {
        self.transport = Some(transport.into());
        self
    }

    /// Set plain transport options.
    pub fn client_config(self, config: ClientConfig) -> Self {
        self.transport(TransportSource::Config(config))
    }

    /// Build the configuration, validating all required fields.
    pub fn build(self) -> Result<ApiConfig> {
        let raw = self
            .base_uri
            .ok_or_else(|| LxdError::Configuration("base URI is required".into()))?;
        let base_uri = validate_base_uri(&raw)?;
        let transport = self
            .transport
            .ok_or_else(|| LxdError::Configuration("transport is required".into()))?;

        Ok(ApiConfig {
            base_uri,
            transport,
        })
    }
}

fn validate_base_uri(raw: &str) -> Result<Url> {
    let url = Url::parse(raw)
        .map_err(|e| LxdError::Configuration(format!("invalid base URI '{raw}': {e}")))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(LxdError::Configuration(format!(
            "base URI scheme must be http or https, got '{}'",
            url.scheme()
        )));
    }
    if url.host_str().is_none() {
        return Err(LxdError::Configuration(format!(
            "base URI '{raw}' has no host"
        )));
    }
    // Check the raw input: the parser appends '/' to a bare authority.
    if !raw.ends_with('/') {
        return Err(LxdError::Configuration(format!(
            "base URI '{raw}' must end with '/'"
        )));
    }

    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_config() {
        let config = ApiConfig::new("https://127.0.0.1:8443/", ClientConfig::default()).unwrap();
        assert_eq!(config.base_uri.as_str(), "https://127.0.0.1:8443/");
        assert!(matches!(config.transport, TransportSource::Config(_)));
    }

    #[test]
    fn test_missing_trailing_slash() {
        let err = ApiConfig::new("https://127.0.0.1:8443", ClientConfig::default()).unwrap_err();
        assert!(matches!(err, LxdError::Configuration(_)));

        let err = ApiConfig::new("https://lxd.local/api", ClientConfig::default()).unwrap_err();
        assert!(matches!(err, LxdError::Configuration(_)));
    }

    #[test]
    fn test_bad_scheme() {
        for uri in ["ftp://lxd.local/", "unix:///var/lib/lxd/unix.socket/"] {
            let err = ApiConfig::new(uri, ClientConfig::default()).unwrap_err();
            assert!(matches!(err, LxdError::Configuration(_)), "uri {uri}");
        }
    }

    #[test]
    fn test_relative_uri_rejected() {
        let err = ApiConfig::new("/1.0/", ClientConfig::default()).unwrap_err();
        assert!(matches!(err, LxdError::Configuration(_)));
    }

    #[test]
    fn test_builder_requires_fields() {
        let err = ApiConfig::builder().base_uri("http://lxd/").build().unwrap_err();
        assert!(err.to_string().contains("transport"));

        let err = ApiConfig::builder()
            .client_config(ClientConfig::default())
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("base URI"));
    }
}
