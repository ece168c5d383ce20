//! Preview configuration.
//!
//! Provides a validated, fluent interface for the endpoints and timeouts
//! the transports need.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use preview_sync::PreviewConfig;
//!
//! # fn example() -> preview_sync::Result<()> {
//! let config = PreviewConfig::builder()
//!     .ws_url("ws://localhost")
//!     .ws_port(9876)
//!     .http_base("http://localhost:8000")
//!     .connect_timeout(Duration::from_secs(5))
//!     .build()?;
//!
//! assert_eq!(config.ws_endpoint().as_str(), "ws://localhost:9876/");
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use url::Url;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Default time allowed for the socket to reach the open state.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default timeout for a single HTTP request.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// PreviewConfig
// ============================================================================

/// Validated preview configuration.
///
/// Use [`PreviewConfig::builder()`] to create one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewConfig {
    /// Realtime endpoint, `{ws_url}:{ws_port}`.
    ws_endpoint: Url,

    /// Base URL the HTTP preview routes are resolved against.
    http_base: Url,

    /// Time allowed for the socket to open before falling back.
    connect_timeout: Duration,

    /// Timeout for each HTTP request.
    http_timeout: Duration,
}

impl PreviewConfig {
    /// Creates a new configuration builder.
    #[inline]
    #[must_use]
    pub fn builder() -> PreviewConfigBuilder {
        PreviewConfigBuilder::new()
    }

    /// Returns the realtime endpoint.
    #[inline]
    #[must_use]
    pub fn ws_endpoint(&self) -> &Url {
        &self.ws_endpoint
    }

    /// Returns the HTTP base URL.
    #[inline]
    #[must_use]
    pub fn http_base(&self) -> &Url {
        &self.http_base
    }

    /// Returns the socket connect timeout.
    #[inline]
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Returns the HTTP request timeout.
    #[inline]
    #[must_use]
    pub const fn http_timeout(&self) -> Duration {
        self.http_timeout
    }
}

// ============================================================================
// PreviewConfigBuilder
// ============================================================================

/// Builder for [`PreviewConfig`].
#[derive(Debug, Clone)]
pub struct PreviewConfigBuilder {
    /// Socket host URL without port, e.g. `ws://localhost`.
    ws_url: Option<String>,
    /// Socket port.
    ws_port: Option<u16>,
    /// HTTP base URL.
    http_base: Option<String>,
    /// Socket connect timeout.
    connect_timeout: Duration,
    /// HTTP request timeout.
    http_timeout: Duration,
}

impl Default for PreviewConfigBuilder {
    fn default() -> Self {
        Self {
            ws_url: None,
            ws_port: None,
            http_base: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            http_timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }
}

impl PreviewConfigBuilder {
    /// Creates a new builder with default timeouts.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the socket host URL (scheme and host, no port).
    #[inline]
    #[must_use]
    pub fn ws_url(mut self, url: impl Into<String>) -> Self {
        self.ws_url = Some(url.into());
        self
    }

    /// Sets the socket port.
    #[inline]
    #[must_use]
    pub fn ws_port(mut self, port: u16) -> Self {
        self.ws_port = Some(port);
        self
    }

    /// Sets the base URL for the HTTP preview routes.
    #[inline]
    #[must_use]
    pub fn http_base(mut self, url: impl Into<String>) -> Self {
        self.http_base = Some(url.into());
        self
    }

    /// Sets how long the socket may take to open.
    #[inline]
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the timeout for each HTTP request.
    #[inline]
    #[must_use]
    pub fn http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    /// Builds the configuration with validation.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if a required field is missing
    /// - [`Error::Config`] if a URL has the wrong scheme or a timeout is zero
    pub fn build(self) -> Result<PreviewConfig> {
        let ws_endpoint = self.validate_ws_endpoint()?;
        let http_base = self.validate_http_base()?;

        if self.connect_timeout.is_zero() || self.http_timeout.is_zero() {
            return Err(Error::config("Timeouts must be greater than zero"));
        }

        Ok(PreviewConfig {
            ws_endpoint,
            http_base,
            connect_timeout: self.connect_timeout,
            http_timeout: self.http_timeout,
        })
    }
}

// ============================================================================
// Validation
// ============================================================================

impl PreviewConfigBuilder {
    /// Joins `ws_url` and `ws_port` into the socket endpoint.
    fn validate_ws_endpoint(&self) -> Result<Url> {
        let host = self.ws_url.as_deref().ok_or_else(|| {
            Error::config(
                "Socket URL is required. Use .ws_url() to set it.\n\
                 Example: PreviewConfig::builder().ws_url(\"ws://localhost\")",
            )
        })?;
        let port = self
            .ws_port
            .ok_or_else(|| Error::config("Socket port is required. Use .ws_port() to set it."))?;

        let endpoint = Url::parse(&format!("{}:{port}", host.trim_end_matches('/')))
            .map_err(|e| Error::config(format!("Invalid socket URL {host:?}: {e}")))?;

        match endpoint.scheme() {
            "ws" | "wss" => Ok(endpoint),
            other => Err(Error::config(format!(
                "Socket URL must use ws:// or wss://, got {other}://"
            ))),
        }
    }

    /// Parses the HTTP base URL.
    fn validate_http_base(&self) -> Result<Url> {
        let raw = self.http_base.as_deref().ok_or_else(|| {
            Error::config(
                "HTTP base URL is required. Use .http_base() to set it.\n\
                 Example: PreviewConfig::builder().http_base(\"https://cms.example.com\")",
            )
        })?;

        let base = Url::parse(raw)
            .map_err(|e| Error::config(format!("Invalid HTTP base URL {raw:?}: {e}")))?;

        if !matches!(base.scheme(), "http" | "https") || base.cannot_be_a_base() {
            return Err(Error::config(format!(
                "HTTP base URL must be an http(s) base, got {raw:?}"
            )));
        }

        Ok(base)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn complete() -> PreviewConfigBuilder {
        PreviewConfig::builder()
            .ws_url("ws://localhost")
            .ws_port(9876)
            .http_base("http://localhost:8000")
    }

    #[test]
    fn test_build_joins_ws_endpoint() {
        let config = complete().build().expect("valid config");
        assert_eq!(config.ws_endpoint().as_str(), "ws://localhost:9876/");
        assert_eq!(config.http_base().as_str(), "http://localhost:8000/");
    }

    #[test]
    fn test_default_timeouts() {
        let config = complete().build().expect("valid config");
        assert_eq!(config.connect_timeout(), DEFAULT_CONNECT_TIMEOUT);
        assert_eq!(config.http_timeout(), DEFAULT_HTTP_TIMEOUT);
    }

    #[test]
    fn test_trailing_slash_on_ws_url() {
        let config = complete().ws_url("wss://preview.example.com/").build().unwrap();
        assert_eq!(config.ws_endpoint().as_str(), "wss://preview.example.com:9876/");
    }

    #[test]
    fn test_build_fails_without_ws_url() {
        let err = PreviewConfig::builder()
            .ws_port(1)
            .http_base("http://localhost")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("Socket URL"));
    }

    #[test]
    fn test_build_fails_without_port() {
        let err = PreviewConfig::builder()
            .ws_url("ws://localhost")
            .http_base("http://localhost")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("port"));
    }

    #[test]
    fn test_build_rejects_http_scheme_for_socket() {
        let err = complete().ws_url("http://localhost").build().unwrap_err();
        assert!(err.to_string().contains("ws://"));
    }

    #[test]
    fn test_build_rejects_non_base_http_url() {
        assert!(complete().http_base("mailto:someone").build().is_err());
    }

    #[test]
    fn test_build_rejects_zero_timeout() {
        assert!(complete().connect_timeout(Duration::ZERO).build().is_err());
    }
}
