//! Shared application state.

use std::path::PathBuf;
use std::sync::Arc;

use crate::live_reload::ClientRegistry;

/// State shared by the static-file handlers and the WebSocket endpoint.
#[derive(Clone, Debug)]
pub(crate) struct AppState {
    /// Directory the static routes serve from.
    pub(crate) root: PathBuf,
    /// Connected live-reload clients.
    pub(crate) registry: Arc<ClientRegistry>,
}

impl AppState {
    pub(crate) fn new(root: PathBuf, registry: Arc<ClientRegistry>) -> Self {
        Self { root, registry }
    }
}
