//! Request URL construction.
//!
//! Paths are resolved against the base URI with standard reference
//! resolution, so `1.0/containers` against `https://host:8443/` yields
//! `https://host:8443/1.0/containers`. A base without a trailing slash would
//! drop its last segment during resolution, which is why [`ApiConfig`]
//! rejects one.
//!
//! [`ApiConfig`]: crate::ApiConfig

use crate::error::{LxdError, Result};
use reqwest::Url;
use std::fmt;

/// Ordered query parameters appended to a request URL.
///
/// Keys and values are percent-encoded on output; encoding order follows
/// insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    pairs: Vec<(String, String)>,
}

impl Query {
    /// Create an empty query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a parameter.
    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.pairs.push((key.into(), value.to_string()));
        self
    }

    /// Append a parameter in place.
    pub fn push(&mut self, key: impl Into<String>, value: impl ToString) {
        self.pairs.push((key.into(), value.to_string()));
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Iterate over the raw (unencoded) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Serialize to `key=value&...` form with percent-encoding.
    pub fn encode(&self) -> String {
        self.pairs
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl<K: Into<String>, V: ToString> FromIterator<(K, V)> for Query {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            pairs: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.to_string()))
                .collect(),
        }
    }
}

/// Build an absolute request URL.
///
/// With neither `path` nor `query` this returns `base` unchanged.
///
/// # Errors
/// Returns [`LxdError::Configuration`] if `path` cannot be resolved
/// against `base`.
pub fn build_uri(base: &Url, path: Option<&str>, query: Option<&Query>) -> Result<Url> {
    let mut url = match path {
        Some(path) if !path.is_empty() => base
            .join(path)
            .map_err(|e| LxdError::Configuration(format!("cannot resolve path '{path}': {e}")))?,
        _ => base.clone(),
    };

    if let Some(query) = query.filter(|q| !q.is_empty()) {
        // Set directly so the encoding stays `%20` rather than form-style `+`.
        url.set_query(Some(&query.encode()));
    }

    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://lxd.example.com:8443/").unwrap()
    }

    #[test]
    fn test_no_path_returns_base() {
        let url = build_uri(&base(), None, None).unwrap();
        assert_eq!(url.as_str(), "https://lxd.example.com:8443/");

        let url = build_uri(&base(), Some(""), Some(&Query::new())).unwrap();
        assert_eq!(url, base());
    }

    #[test]
    fn test_relative_path_resolution() {
        let url = build_uri(&base(), Some("1.0/containers"), None).unwrap();
        assert_eq!(url.as_str(), "https://lxd.example.com:8443/1.0/containers");
    }

    #[test]
    fn test_resolution_keeps_base_prefix() {
        let base = Url::parse("http://proxy.local/lxd/").unwrap();
        let url = build_uri(&base, Some("1.0/operations/abc/wait"), None).unwrap();
        assert_eq!(url.as_str(), "http://proxy.local/lxd/1.0/operations/abc/wait");
    }

    #[test]
    fn test_absolute_path_replaces_base_path() {
        let base = Url::parse("http://proxy.local/lxd/").unwrap();
        let url = build_uri(&base, Some("/1.0"), None).unwrap();
        assert_eq!(url.as_str(), "http://proxy.local/1.0");
    }

    #[test]
    fn test_query_encoding_order() {
        let query = Query::new().with("a", "1").with("b", "x y");
        let url = build_uri(&base(), Some("1.0/containers/c1"), Some(&query)).unwrap();
        assert!(url.as_str().ends_with("?a=1&b=x%20y"), "got {url}");
    }

    #[test]
    fn test_query_reserved_characters() {
        let query: Query = [("filter", "name eq c&d"), ("recursion", "1")]
            .into_iter()
            .collect();
        assert_eq!(query.encode(), "filter=name%20eq%20c%26d&recursion=1");
    }

    #[test]
    fn test_empty_query_adds_no_question_mark() {
        let url = build_uri(&base(), Some("1.0"), Some(&Query::new())).unwrap();
        assert_eq!(url.as_str(), "https://lxd.example.com:8443/1.0");
    }
}
