//! Router construction.
//!
//! Builds the two axum routers: one serving the site, one carrying the
//! live-reload WebSocket. They run on separate listeners so the reload
//! channel stays out of the site's URL space entirely.

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::live_reload;
use crate::middleware::cache;
use crate::state::AppState;
use crate::static_files;

/// Create the site router: static files with caching disabled.
///
/// Per-request logging sits at debug level, so the default output stays
/// quiet while `RUST_LOG=debug` surfaces every request.
pub(crate) fn create_site_router(state: Arc<AppState>) -> Router {
    static_files::static_router()
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cache::cache_control_layer())
                .layer(cache::pragma_layer())
                .layer(cache::expires_layer()),
        )
        .with_state(state)
}

/// Create the live-reload router: a single WebSocket endpoint at `/`.
pub(crate) fn create_reload_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(live_reload::ws_handler))
        .with_state(state)
}
