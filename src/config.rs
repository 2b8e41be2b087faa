//! Session configuration.
//!
//! Provides a fluent builder for [`SessionConfig`]. Timing defaults match
//! the server's heartbeat cadence and should rarely need changing.
//!
//! # Example
//!
//! ```no_run
//! use twidder_session::SessionConfig;
//!
//! # fn example() -> twidder_session::Result<()> {
//! let config = SessionConfig::builder()
//!     .page_url("https://twidder.example/")
//!     .build()?;
//!
//! assert_eq!(config.socket_url()?.as_str(), "wss://twidder.example/socket");
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use url::Url;

use crate::error::{Error, Result};
use crate::transport::{page_origin, socket_url};

// ============================================================================
// Constants
// ============================================================================

/// How often liveness is checked.
pub const DEFAULT_HEARTBEAT_PERIOD: Duration = Duration::from_secs(30);

/// Inbound traffic younger than this counts as proof of life.
pub const DEFAULT_FRESHNESS: Duration = Duration::from_secs(25);

/// Consecutive unanswered probes after which the connection is dead.
pub const DEFAULT_MAX_MISSED_HEARTBEATS: u32 = 2;

/// Age at which an unanswered request counts as stuck.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Constant delay between teardown and the next open.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(1);

// ============================================================================
// SessionConfig
// ============================================================================

/// Validated session configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Server authority (`name` or `name:port`).
    pub host: String,
    /// Use `wss` instead of `ws`.
    pub secure: bool,
    /// Liveness check period.
    pub heartbeat_period: Duration,
    /// Freshness threshold for inbound traffic.
    pub freshness: Duration,
    /// Missed probes before the connection is declared dead.
    pub max_missed_heartbeats: u32,
    /// Stuck-request threshold.
    pub request_timeout: Duration,
    /// Delay before reopening after a teardown.
    pub reconnect_delay: Duration,
}

impl SessionConfig {
    /// Creates a new builder.
    #[inline]
    #[must_use]
    pub fn builder() -> SessionConfigBuilder {
        SessionConfigBuilder::new()
    }

    /// Creates a configuration with default timings for `host`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `host` is not a valid authority.
    pub fn new(host: impl Into<String>, secure: bool) -> Result<Self> {
        Self::builder().host(host).secure(secure).build()
    }

    /// Returns the socket endpoint URL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the host is not a valid authority.
    pub fn socket_url(&self) -> Result<Url> {
        socket_url(&self.host, self.secure)
    }
}

// ============================================================================
// SessionConfigBuilder
// ============================================================================

/// Builder for [`SessionConfig`].
#[derive(Debug, Clone)]
pub struct SessionConfigBuilder {
    host: Option<String>,
    secure: bool,
    page_url: Option<String>,
    heartbeat_period: Duration,
    freshness: Duration,
    max_missed_heartbeats: u32,
    request_timeout: Duration,
    reconnect_delay: Duration,
}

impl Default for SessionConfigBuilder {
    fn default() -> Self {
        Self {
            host: None,
            secure: false,
            page_url: None,
            heartbeat_period: DEFAULT_HEARTBEAT_PERIOD,
            freshness: DEFAULT_FRESHNESS,
            max_missed_heartbeats: DEFAULT_MAX_MISSED_HEARTBEATS,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
        }
    }
}

impl SessionConfigBuilder {
    /// Creates a builder with default timings and no host.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the server host (`name` or `name:port`).
    #[inline]
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Selects `wss` (`true`) or `ws` (`false`).
    #[inline]
    #[must_use]
    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Derives host and scheme from the hosting page URL.
    ///
    /// Overrides [`host`](Self::host) and [`secure`](Self::secure).
    #[inline]
    #[must_use]
    pub fn page_url(mut self, page_url: impl Into<String>) -> Self {
        self.page_url = Some(page_url.into());
        self
    }

    /// Sets the liveness check period.
    #[inline]
    #[must_use]
    pub fn heartbeat_period(mut self, period: Duration) -> Self {
        self.heartbeat_period = period;
        self
    }

    /// Sets the freshness threshold.
    #[inline]
    #[must_use]
    pub fn freshness(mut self, freshness: Duration) -> Self {
        self.freshness = freshness;
        self
    }

    /// Sets how many missed probes declare the connection dead.
    #[inline]
    #[must_use]
    pub fn max_missed_heartbeats(mut self, missed: u32) -> Self {
        self.max_missed_heartbeats = missed;
        self
    }

    /// Sets the stuck-request threshold.
    #[inline]
    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the reconnect delay.
    #[inline]
    #[must_use]
    pub fn reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Builds the configuration with validation.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if neither host nor page URL is set
    /// - [`Error::Config`] if the host or page URL is invalid
    /// - [`Error::Config`] if a period is zero
    pub fn build(self) -> Result<SessionConfig> {
        let (host, secure) = self.resolve_origin()?;
        self.validate_timings()?;

        let config = SessionConfig {
            host,
            secure,
            heartbeat_period: self.heartbeat_period,
            freshness: self.freshness,
            max_missed_heartbeats: self.max_missed_heartbeats,
            request_timeout: self.request_timeout,
            reconnect_delay: self.reconnect_delay,
        };

        // Fail early rather than on the first connect
        config.socket_url()?;

        Ok(config)
    }
}

// ============================================================================
// Validation
// ============================================================================

impl SessionConfigBuilder {
    /// Resolves host and security from the page URL or explicit settings.
    fn resolve_origin(&self) -> Result<(String, bool)> {
        if let Some(page_url) = &self.page_url {
            return page_origin(page_url);
        }

        let host = self.host.clone().ok_or_else(|| {
            Error::config(
                "Socket host is required. Use .host() or .page_url() to set it.\n\
                 Example: SessionConfig::builder().host(\"localhost:5000\")",
            )
        })?;

        Ok((host, self.secure))
    }

    /// Validates timing settings.
    fn validate_timings(&self) -> Result<()> {
        if self.heartbeat_period.is_zero() {
            return Err(Error::config("heartbeat period must be non-zero"));
        }
        if self.request_timeout.is_zero() {
            return Err(Error::config("request timeout must be non-zero"));
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
