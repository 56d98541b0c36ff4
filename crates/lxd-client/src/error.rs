//! Error types for lxd-client.

use thiserror::Error;

/// Result type alias for lxd-client operations.
pub type Result<T> = std::result::Result<T, LxdError>;

/// Errors raised by the HTTP transport.
///
/// The underlying error is carried as-is so callers can inspect it
/// (connection refused, TLS handshake failure, malformed body).
#[derive(Debug, Error)]
pub enum TransportError {
    /// Error from the HTTP engine
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body was not valid JSON
    #[error("malformed response body: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Errors that can occur while talking to an LXD server.
///
/// Error envelopes returned by the server itself are not errors at this
/// level; they come back as `Ok(Envelope)`.
#[derive(Debug, Error)]
pub enum LxdError {
    /// Invalid client configuration
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Transport failure
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// An operation reference did not contain a usable UUID
    #[error("invalid operation reference: {0}")]
    InvalidOperationReference(String),

    /// Response body was JSON but not a response envelope
    #[error("unexpected response shape: {0}")]
    Decode(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = LxdError::Configuration("base URI must end with '/'".into());
        assert_eq!(
            err.to_string(),
            "configuration error: base URI must end with '/'"
        );

        let err = LxdError::InvalidOperationReference("missing 'operation' field".into());
        assert!(err.to_string().contains("missing 'operation' field"));
    }

    #[test]
    fn test_transport_error_is_transparent() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let expected = json_err.to_string();
        let err: LxdError = TransportError::from(json_err).into();
        assert_eq!(err.to_string(), format!("malformed response body: {expected}"));
        assert!(matches!(err, LxdError::Transport(TransportError::Decode(_))));
    }
}
