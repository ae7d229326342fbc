//! Live reload: watch, debounce, broadcast.
//!
//! File changes under the site root flow through a leading-edge debouncer
//! on the watcher thread, cross into the runtime as fire signals, and fan
//! out to every connected WebSocket client as a `{"type":"reload"}` frame.

pub(crate) mod debouncer;
pub(crate) mod manager;
pub(crate) mod notifier;
pub(crate) mod registry;
pub(crate) mod websocket;

pub(crate) use manager::LiveReloadManager;
pub(crate) use registry::ClientRegistry;
pub(crate) use websocket::ws_handler;
