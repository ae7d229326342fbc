//! Cache-disabling headers middleware.
//!
//! Adds headers to all responses so browsers refetch on every request:
//! - Cache-Control
//! - Pragma
//! - Expires
//!
//! Served content can change on any save, so a stale cache would defeat
//! the reload. Pragma and Expires cover HTTP/1.0 clients and proxies.

use axum::http::HeaderValue;
use axum::http::header;
use tower_http::set_header::SetResponseHeaderLayer;

/// Cache-Control header value.
pub(crate) const CACHE_CONTROL: &str = "no-cache, no-store, must-revalidate";

/// Pragma header value.
pub(crate) const PRAGMA: &str = "no-cache";

/// Expires header value.
pub(crate) const EXPIRES: &str = "0";

/// Create layer that adds the Cache-Control header.
pub(crate) fn cache_control_layer() -> SetResponseHeaderLayer<HeaderValue> {
    SetResponseHeaderLayer::overriding(
        header::CACHE_CONTROL,
        HeaderValue::from_static(CACHE_CONTROL),
    )
}

/// Create layer that adds the Pragma header.
pub(crate) fn pragma_layer() -> SetResponseHeaderLayer<HeaderValue> {
    SetResponseHeaderLayer::overriding(header::PRAGMA, HeaderValue::from_static(PRAGMA))
}

/// Create layer that adds the Expires header.
pub(crate) fn expires_layer() -> SetResponseHeaderLayer<HeaderValue> {
    SetResponseHeaderLayer::overriding(header::EXPIRES, HeaderValue::from_static(EXPIRES))
}
