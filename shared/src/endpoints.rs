//! URLs the chat client talks to, derived from the page (or server) origin.

use url::Url;

use crate::protocol::{HEALTH_PATH, WS_PATH_PREFIX};
use crate::ClientId;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EndpointError {
    #[error("Invalid server URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Unsupported URL scheme '{0}' (expected http, https, ws or wss)")]
    UnsupportedScheme(String),
}

/// Parse an origin and swap its scheme using `map`, dropping any path,
/// query or fragment.
fn with_scheme(origin: &str, map: fn(&str) -> Option<&'static str>) -> Result<Url, EndpointError> {
    let mut url = Url::parse(origin).map_err(|e| EndpointError::InvalidUrl {
        url: origin.to_string(),
        reason: e.to_string(),
    })?;

    let scheme = map(url.scheme()).ok_or_else(|| EndpointError::UnsupportedScheme(url.scheme().to_string()))?;
    if url.scheme() != scheme {
        url.set_scheme(scheme)
            .map_err(|_| EndpointError::UnsupportedScheme(url.scheme().to_string()))?;
    }
    url.set_path("");
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

fn socket_scheme(scheme: &str) -> Option<&'static str> {
    match scheme {
        "http" | "ws" => Some("ws"),
        "https" | "wss" => Some("wss"),
        _ => None,
    }
}

fn http_scheme(scheme: &str) -> Option<&'static str> {
    match scheme {
        "http" | "ws" => Some("http"),
        "https" | "wss" => Some("https"),
        _ => None,
    }
}

/// Build the chat socket URL: `ws://host/ws/<client id>` for an `http`
/// origin, `wss://` for `https`. The client id is percent-encoded as a single
/// path segment.
pub fn ws_endpoint(origin: &str, client_id: &ClientId) -> Result<Url, EndpointError> {
    let mut url = with_scheme(origin, socket_scheme)?;
    url.path_segments_mut()
        .map_err(|_| EndpointError::InvalidUrl {
            url: origin.to_string(),
            reason: "URL cannot carry a path".to_string(),
        })?
        .clear()
        .push(WS_PATH_PREFIX.trim_start_matches('/'))
        .push(client_id.as_str());
    Ok(url)
}

/// Build the health check URL for an origin.
pub fn health_url(origin: &str) -> Result<Url, EndpointError> {
    let mut url = with_scheme(origin, http_scheme)?;
    url.set_path(HEALTH_PATH);
    Ok(url)
}
