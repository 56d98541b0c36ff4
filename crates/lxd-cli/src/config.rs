//! Configuration for lxdctl.
//!
//! Configuration is loaded from environment variables with sensible defaults.

use lxd_client::{ApiConfig, ClientConfig};
use std::path::{Path, PathBuf};

/// Default LXD HTTPS endpoint on the local host.
pub const DEFAULT_URI: &str = "https://127.0.0.1:8443/";

/// Connection settings for the LXD server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliConfig {
    /// Base URI of the LXD API (must end with '/').
    pub uri: String,

    /// Client certificate (PEM).
    pub cert_path: Option<PathBuf>,

    /// Client private key (PEM).
    pub key_path: Option<PathBuf>,

    /// Extra trusted CA certificate (PEM).
    pub ca_path: Option<PathBuf>,

    /// Validate the server certificate (default: false, LXD is usually self-signed).
    pub strict_tls: bool,
}

/// Configuration loading error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("LXD_CERT and LXD_KEY must be set together")]
    IncompleteIdentity,

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Client(#[from] lxd_client::LxdError),
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            uri: DEFAULT_URI.to_string(),
            cert_path: None,
            key_path: None,
            ca_path: None,
            strict_tls: false,
        }
    }
}

impl CliConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `LXD_URI` | `https://127.0.0.1:8443/` |
    /// | `LXD_CERT` | unset |
    /// | `LXD_KEY` | unset |
    /// | `LXD_CA` | unset |
    /// | `LXD_STRICT_TLS` | `false` |
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            uri: std::env::var("LXD_URI").unwrap_or(default.uri),
            cert_path: std::env::var("LXD_CERT").ok().map(PathBuf::from),
            key_path: std::env::var("LXD_KEY").ok().map(PathBuf::from),
            ca_path: std::env::var("LXD_CA").ok().map(PathBuf::from),
            strict_tls: std::env::var("LXD_STRICT_TLS")
                .map(|v| parse_bool(&v))
                .unwrap_or(default.strict_tls),
        }
    }

    /// Read the certificate files into transport options.
    pub fn client_config(&self) -> Result<ClientConfig, ConfigError> {
        let mut config = ClientConfig::new()
            .strict_tls(self.strict_tls)
            .user_agent(concat!("lxdctl/", env!("CARGO_PKG_VERSION")));

        match (&self.cert_path, &self.key_path) {
            (Some(cert), Some(key)) => {
                config = config.identity(read(cert)?, read(key)?);
            }
            (None, None) => {}
            _ => return Err(ConfigError::IncompleteIdentity),
        }

        if let Some(ca) = &self.ca_path {
            config = config.ca_cert(read(ca)?);
        }

        Ok(config)
    }

    /// Build the validated API configuration.
    pub fn api_config(&self) -> Result<ApiConfig, ConfigError> {
        Ok(ApiConfig::new(&self.uri, self.client_config()?)?)
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

fn read(path: &Path) -> Result<Vec<u8>, ConfigError> {
    std::fs::read(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })
}
