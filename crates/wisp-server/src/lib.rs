//! Development web server with live reload.
//!
//! Serves a directory of static files and reloads connected browsers when
//! those files change. Two listeners run side by side:
//!
//! - the site listener serves files with caching disabled, so every
//!   request observes the current bytes on disk
//! - the reload listener carries one WebSocket endpoint that pushes a
//!   `{"type":"reload"}` frame to every connected page after a change
//!
//! # Quick Start
//!
//! ```ignore
//! use std::path::PathBuf;
//! use wisp_server::{ServerConfig, run_server};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ServerConfig {
//!         host: "127.0.0.1".to_string(),
//!         port: 8000,
//!         ws_port: 8001,
//!         root: PathBuf::from("public"),
//!         live_reload_enabled: true,
//!         extensions: vec!["html".into(), "css".into()],
//!         debounce_ms: 300,
//!     };
//!
//!     run_server(config).await.unwrap();
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! Browser ──HTTP──► site listener ──► static files (no caching)
//!    │
//!    └────WS─────► reload listener ──► ClientRegistry
//!                                           ▲
//!  file change ──► watcher ──► debounce ────┘  broadcast round
//! ```
//!
//! # Connecting a Page
//!
//! The server never rewrites served files, so pages opt in with a small
//! snippet:
//!
//! ```html
//! <script>
//!   new WebSocket("ws://127.0.0.1:8001/").onmessage = (event) => {
//!     if (JSON.parse(event.data).type === "reload") {
//!       location.reload();
//!     }
//!   };
//! </script>
//! ```

mod app;
mod error;
mod live_reload;
mod middleware;
mod state;
mod static_files;

use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;

pub use error::ServerError;
use live_reload::{ClientRegistry, LiveReloadManager};
use state::AppState;

/// How long listeners get to drain in-flight connections on shutdown.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Server configuration.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port the site listener binds.
    pub port: u16,
    /// Port the live-reload WebSocket listener binds.
    pub ws_port: u16,
    /// Directory to serve.
    pub root: std::path::PathBuf,
    /// Enable live reload.
    pub live_reload_enabled: bool,
    /// File extensions that trigger a reload, lowercase and without dots.
    pub extensions: Vec<String>,
    /// Debounce window in milliseconds.
    pub debounce_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            ws_port: 8001,
            root: std::path::PathBuf::from("."),
            live_reload_enabled: true,
            extensions: vec![
                "html".to_string(),
                "js".to_string(),
                "json".to_string(),
                "css".to_string(),
            ],
            debounce_ms: 300,
        }
    }
}

/// Run the server until Ctrl-C.
///
/// Starts the reload listener and the file watcher before the site
/// listener, so a page can never load without its reload channel being
/// available. Any failure to bind or watch is fatal: the server refuses
/// to run half-alive.
///
/// # Errors
///
/// Returns an error if the site root is not a directory, an address
/// cannot be parsed or bound, or the file watcher fails to start.
pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    if !config.root.is_dir() {
        return Err(ServerError::InvalidRoot(config.root));
    }
    let root = config.root.canonicalize()?;

    let registry = Arc::new(ClientRegistry::new());
    let state = Arc::new(AppState::new(root.clone(), Arc::clone(&registry)));

    // Flipped once at shutdown; both listeners watch it.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let mut live_reload = None;
    let mut reload_serve = None;
    if config.live_reload_enabled {
        let ws_addr = SocketAddr::from_str(&format!("{}:{}", config.host, config.ws_port))?;
        let ws_listener = bind(ws_addr).await?;
        tracing::info!(address = %ws_addr, "live reload listening");

        let mut manager = LiveReloadManager::new(
            root.clone(),
            config.extensions.clone(),
            Duration::from_millis(config.debounce_ms),
            Arc::clone(&registry),
        );
        manager.start()?;
        live_reload = Some(manager);

        reload_serve = Some(spawn_serve(
            ws_listener,
            app::create_reload_router(Arc::clone(&state)),
            shutdown_rx.clone(),
            "live-reload",
        ));
    }

    let addr = SocketAddr::from_str(&format!("{}:{}", config.host, config.port))?;
    let listener = bind(addr).await?;
    tracing::info!(address = %addr, root = %root.display(), "serving site");

    let site_serve = spawn_serve(
        listener,
        app::create_site_router(state),
        shutdown_rx,
        "site",
    );

    shutdown_signal().await;

    // Unwind in dependency order: stop producing reloads, drop the client
    // sessions so their sockets close, then drain both listeners. The stop
    // flag and the watcher drop happen before `stop`'s first await, so even
    // a timed-out join leaves no way for further events to be processed.
    if let Some(manager) = live_reload.as_mut()
        && tokio::time::timeout(SHUTDOWN_GRACE, manager.stop())
            .await
            .is_err()
    {
        tracing::warn!("file watcher did not stop in time");
    }
    registry.close_all();
    let _ = shutdown_tx.send(true);

    if let Some(task) = reload_serve {
        drain_listener(task, "live-reload").await;
    }
    drain_listener(site_serve, "site").await;

    tracing::info!("server stopped");
    Ok(())
}

/// Bind an address, attaching it to any failure.
async fn bind(addr: SocketAddr) -> Result<TcpListener, ServerError> {
    TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })
}

/// Serve one listener on its own task, logging instead of propagating a
/// failure so one listener going down never takes the other with it.
fn spawn_serve(
    listener: TcpListener,
    app: axum::Router,
    mut shutdown: watch::Receiver<bool>,
    name: &'static str,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.changed().await;
            })
            .await;
        if let Err(err) = result {
            tracing::error!(listener = name, error = %err, "listener failed");
        }
    })
}

/// Await a listener task, giving up with a warning after the grace period.
async fn drain_listener(task: JoinHandle<()>, name: &'static str) {
    match tokio::time::timeout(SHUTDOWN_GRACE, task).await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => tracing::warn!(listener = name, error = %err, "listener task panicked"),
        Err(_) => tracing::warn!(listener = name, "listener did not drain in time"),
    }
}

/// Wait for shutdown signal (Ctrl-C).
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received, stopping server...");
}

/// Create server configuration from a loaded wisp config.
#[must_use]
pub fn server_config_from_config(config: &wisp_config::Config) -> ServerConfig {
    ServerConfig {
        host: config.server.host.clone(),
        port: config.server.port,
        ws_port: config.server.ws_port,
        root: config.site_resolved.root.clone(),
        live_reload_enabled: config.live_reload.enabled,
        extensions: config.live_reload.extensions.clone(),
        debounce_ms: config.live_reload.debounce_ms,
    }
}
