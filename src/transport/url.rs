//! Socket endpoint derivation.
//!
//! The endpoint is `<ws|wss>://<host>/socket`. The scheme follows the
//! security context of the hosting page: a page served over `https`
//! talks to `wss`, anything else to `ws`.

// ============================================================================
// Imports
// ============================================================================

use url::Url;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Path of the session socket on the server.
pub const SOCKET_PATH: &str = "/socket";

// ============================================================================
// Functions
// ============================================================================

/// Builds the socket URL for `host` (`name` or `name:port`).
///
/// # Errors
///
/// Returns [`Error::Config`] if `host` does not form a valid authority.
pub fn socket_url(host: &str, secure: bool) -> Result<Url> {
    if host.is_empty() {
        return Err(Error::config("socket host is empty"));
    }

    let scheme = if secure { "wss" } else { "ws" };
    let url = Url::parse(&format!("{scheme}://{host}{SOCKET_PATH}"))
        .map_err(|e| Error::config(format!("invalid socket host '{host}': {e}")))?;

    // A host containing a path, query or credentials would silently change
    // the endpoint.
    if url.path() != SOCKET_PATH
        || url.query().is_some()
        || url.fragment().is_some()
        || !url.username().is_empty()
    {
        return Err(Error::config(format!(
            "socket host '{host}' must be a bare host[:port]"
        )));
    }

    Ok(url)
}

/// Extracts `(host, secure)` from the URL of the hosting page.
///
/// The host keeps an explicit port when the page URL carries one.
///
/// # Errors
///
/// Returns [`Error::Config`] if the page URL cannot be parsed or has no host.
pub fn page_origin(page_url: &str) -> Result<(String, bool)> {
    let url = Url::parse(page_url)
        .map_err(|e| Error::config(format!("invalid page URL '{page_url}': {e}")))?;

    let host = url
        .host_str()
        .ok_or_else(|| Error::config(format!("page URL '{page_url}' has no host")))?;

    let host = match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    };

    Ok((host, url.scheme() == "https"))
}

// ============================================================================
// Tests
// ============================================================================
