//! CORS policy for the REST API
//!
//! Only loopback origins may call the API from a browser: the bundled UI is
//! served from the same host, and nothing else is expected to need it.
//!
//! - **Origins**: `localhost`, `127.0.0.1`, `[::1]`, any port, http or https
//! - **Methods**: GET, POST, OPTIONS
//! - **Headers**: Content-Type
//! - **Max Age**: 3600 seconds

use http::{header::HeaderValue, Method};
use std::net::Ipv4Addr;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, CorsLayer};
use url::{Host, Url};

/// Methods the API accepts cross-origin
pub const ALLOWED_METHODS: [Method; 3] = [Method::GET, Method::POST, Method::OPTIONS];

/// Preflight cache lifetime
pub const DEFAULT_MAX_AGE_SECS: u64 = 3600;

/// Layer allowing loopback origins only
pub fn cors_layer() -> CorsLayer {
    cors_layer_with_max_age(DEFAULT_MAX_AGE_SECS)
}

/// Same policy with a custom preflight max age
pub fn cors_layer_with_max_age(max_age_secs: u64) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(|origin, _| {
            is_localhost_origin(origin)
        }))
        .allow_methods(ALLOWED_METHODS)
        .allow_headers([http::header::CONTENT_TYPE])
        .max_age(Duration::from_secs(max_age_secs))
}

/// True for `http(s)://localhost`, `127.0.0.1`, or `[::1]` on any port.
///
/// ```rust
/// use http::header::HeaderValue;
/// use scrapewise::cors::is_localhost_origin;
///
/// assert!(is_localhost_origin(&HeaderValue::from_static("http://localhost:8501")));
/// assert!(!is_localhost_origin(&HeaderValue::from_static("http://localhost.evil.com")));
/// ```
pub fn is_localhost_origin(origin: &HeaderValue) -> bool {
    let Ok(origin) = origin.to_str() else {
        return false;
    };
    let Ok(url) = Url::parse(origin) else {
        return false;
    };
    if !matches!(url.scheme(), "http" | "https") {
        return false;
    }
    if !url.username().is_empty() || url.password().is_some() {
        return false;
    }

    match url.host() {
        Some(Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
        Some(Host::Ipv4(ip)) => ip == Ipv4Addr::LOCALHOST,
        Some(Host::Ipv6(ip)) => ip.is_loopback(),
        None => false,
    }
}
