//! Live reload coordination.
//!
//! Wires the concurrent pieces together: the notify watcher delivers raw
//! events on its own thread, the sink filters and debounces them right
//! there, and a fire signal crosses into the tokio runtime over a bounded
//! channel, where the forward task runs broadcast rounds.
//!
//! ```text
//! watcher thread                     tokio runtime
//! ──────────────                     ─────────────
//! callback ─► WatchSink ──try_send──► fire channel ─► forward task
//!             filter + debounce                        broadcast round
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::debouncer::{ChangeEvent, ReloadDebouncer};
use super::notifier::ReloadNotifier;
use super::registry::ClientRegistry;

/// Queued fire signals. One pending signal already guarantees a reload, so
/// the queue stays tiny and overflow is dropped.
const FIRE_QUEUE: usize = 8;

/// Watch-side event sink, run inside the notify callback.
struct WatchSink {
    debouncer: ReloadDebouncer,
    fire_tx: mpsc::Sender<()>,
    stopped: Arc<AtomicBool>,
}

impl WatchSink {
    fn new(debouncer: ReloadDebouncer, fire_tx: mpsc::Sender<()>, stopped: Arc<AtomicBool>) -> Self {
        Self {
            debouncer,
            fire_tx,
            stopped,
        }
    }

    /// Translate a raw watcher event and feed each path through the sink.
    ///
    /// Only creations and modifications qualify: editors commonly save via
    /// temp file plus rename, which surfaces as a creation of the real name.
    /// Removals never warrant a reload on their own.
    fn dispatch(&self, event: &Event) {
        if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
            return;
        }
        for path in &event.paths {
            self.handle(ChangeEvent::capture(path.clone()));
        }
    }

    /// Run one change through the stop gate, the filter and the debounce;
    /// on fire, hand the signal to the runtime without blocking.
    fn handle(&self, event: ChangeEvent) {
        if self.stopped.load(Ordering::SeqCst) {
            return;
        }
        if !self.debouncer.observe(&event) {
            return;
        }
        tracing::debug!(path = %event.path.display(), "change detected, scheduling reload");
        // Full queue means a reload is already pending; the signal is
        // redundant and safe to drop.
        let _ = self.fire_tx.try_send(());
    }
}

/// Owns the file watcher and the forward task for one server run.
pub(crate) struct LiveReloadManager {
    root: PathBuf,
    extensions: Vec<String>,
    debounce: Duration,
    registry: Arc<ClientRegistry>,
    watcher: Option<RecommendedWatcher>,
    forward_task: Option<JoinHandle<()>>,
    stopped: Arc<AtomicBool>,
}

impl LiveReloadManager {
    #[must_use]
    pub(crate) fn new(
        root: PathBuf,
        extensions: Vec<String>,
        debounce: Duration,
        registry: Arc<ClientRegistry>,
    ) -> Self {
        Self {
            root,
            extensions,
            debounce,
            registry,
            watcher: None,
            forward_task: None,
            stopped: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Start watching the site root (top level only) and spawn the forward
    /// task that turns fire signals into broadcast rounds.
    ///
    /// # Errors
    ///
    /// Returns an error if the watcher cannot be created or the root cannot
    /// be watched. Callers treat this as fatal so the server never runs
    /// half-alive with a dead watcher.
    pub(crate) fn start(&mut self) -> Result<(), notify::Error> {
        let (fire_tx, mut fire_rx) = mpsc::channel(FIRE_QUEUE);
        let sink = WatchSink::new(
            ReloadDebouncer::new(self.debounce, self.extensions.clone()),
            fire_tx,
            Arc::clone(&self.stopped),
        );

        // The callback runs on the watcher's own thread; the sink keeps it
        // cheap and non-blocking.
        let mut watcher =
            notify::recommended_watcher(move |res: Result<Event, notify::Error>| match res {
                Ok(event) => sink.dispatch(&event),
                Err(err) => tracing::warn!(error = %err, "file watcher error"),
            })?;
        watcher.watch(&self.root, RecursiveMode::NonRecursive)?;
        self.watcher = Some(watcher);

        let notifier = ReloadNotifier::new(Arc::clone(&self.registry));
        self.forward_task = Some(tokio::spawn(async move {
            // Ends when the watcher, and with it the last sender, is dropped.
            while fire_rx.recv().await.is_some() {
                notifier.broadcast();
            }
        }));

        tracing::info!(root = %self.root.display(), "watching for file changes");
        Ok(())
    }

    /// Stop watching. Once this returns, no further debounce decision or
    /// broadcast round can happen: the stop flag gates the callback, the
    /// dropped watcher tears the callback down entirely, and the forward
    /// task has been awaited.
    pub(crate) async fn stop(&mut self) {
        self.stopped.store(true, Ordering::SeqCst);
        // Dropping the watcher closes the fire channel's send side.
        self.watcher = None;
        if let Some(task) = self.forward_task.take() {
            if let Err(err) = task.await {
                tracing::warn!(error = %err, "reload forward task ended abnormally");
            }
        }
        tracing::info!("file watcher stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::live_reload::registry::ClientSession;
    use notify::event::{CreateKind, DataChange, ModifyKind, RemoveKind};
    use pretty_assertions::assert_eq;
    use std::time::Instant;
    use tokio_test::{assert_err, assert_ok};

    fn test_sink(window_ms: u64) -> (WatchSink, mpsc::Receiver<()>) {
        let (fire_tx, fire_rx) = mpsc::channel(FIRE_QUEUE);
        let sink = WatchSink::new(
            ReloadDebouncer::new(
                Duration::from_millis(window_ms),
                vec!["html".to_owned(), "css".to_owned()],
            ),
            fire_tx,
            Arc::new(AtomicBool::new(false)),
        );
        (sink, fire_rx)
    }

    #[test]
    fn test_dispatch_fires_on_watched_modification() {
        let (sink, mut fire_rx) = test_sink(300);

        let event = Event::new(EventKind::Modify(ModifyKind::Data(DataChange::Content)))
            .add_path(PathBuf::from("/site/index.html"));
        sink.dispatch(&event);

        assert!(fire_rx.try_recv().is_ok());
    }

    #[test]
    fn test_dispatch_fires_on_creation() {
        let (sink, mut fire_rx) = test_sink(300);

        let event = Event::new(EventKind::Create(CreateKind::File))
            .add_path(PathBuf::from("/site/new-page.html"));
        sink.dispatch(&event);

        assert!(fire_rx.try_recv().is_ok());
    }

    #[test]
    fn test_dispatch_ignores_removals() {
        let (sink, mut fire_rx) = test_sink(300);

        let event = Event::new(EventKind::Remove(RemoveKind::File))
            .add_path(PathBuf::from("/site/index.html"));
        sink.dispatch(&event);

        assert!(fire_rx.try_recv().is_err());
    }

    #[test]
    fn test_dispatch_ignores_unwatched_extensions() {
        let (sink, mut fire_rx) = test_sink(300);

        let event = Event::new(EventKind::Modify(ModifyKind::Data(DataChange::Content)))
            .add_path(PathBuf::from("/site/notes.md"));
        sink.dispatch(&event);

        assert!(fire_rx.try_recv().is_err());
    }

    #[test]
    fn test_stopped_sink_never_reaches_debounce() {
        let (fire_tx, mut fire_rx) = mpsc::channel(FIRE_QUEUE);
        let stopped = Arc::new(AtomicBool::new(false));
        let sink = WatchSink::new(
            ReloadDebouncer::new(Duration::from_millis(300), vec!["html".to_owned()]),
            fire_tx,
            Arc::clone(&stopped),
        );

        stopped.store(true, Ordering::SeqCst);
        sink.handle(ChangeEvent {
            path: PathBuf::from("/site/index.html"),
            is_directory: false,
            timestamp: Instant::now(),
        });

        assert!(fire_rx.try_recv().is_err());
    }

    #[test]
    fn test_full_fire_queue_drops_signal_without_blocking() {
        let (sink, mut fire_rx) = test_sink(0);

        // With a zero window every spaced event fires; past the queue size
        // the extra signals must be dropped, not block the callback.
        let base = Instant::now();
        for i in 0..(FIRE_QUEUE + 4) {
            sink.handle(ChangeEvent {
                path: PathBuf::from("/site/index.html"),
                is_directory: false,
                timestamp: base + Duration::from_millis(1 + i as u64),
            });
        }

        let mut queued = 0;
        while fire_rx.try_recv().is_ok() {
            queued += 1;
        }
        assert_eq!(queued, FIRE_QUEUE);
    }

    #[tokio::test]
    async fn test_start_then_stop_joins_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Arc::new(ClientRegistry::new());
        let mut manager = LiveReloadManager::new(
            dir.path().to_path_buf(),
            vec!["html".to_owned()],
            Duration::from_millis(50),
            registry,
        );

        assert_ok!(manager.start());
        manager.stop().await;

        assert!(manager.watcher.is_none());
        assert!(manager.forward_task.is_none());
    }

    #[tokio::test]
    async fn test_start_fails_on_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Arc::new(ClientRegistry::new());
        let mut manager = LiveReloadManager::new(
            dir.path().join("missing"),
            vec!["html".to_owned()],
            Duration::from_millis(50),
            registry,
        );

        assert_err!(manager.start());
    }

    #[tokio::test]
    async fn test_file_change_reaches_registered_client() {
        let dir = tempfile::tempdir().unwrap();
        let page = dir.path().join("index.html");
        std::fs::write(&page, "<html></html>").unwrap();

        let registry = Arc::new(ClientRegistry::new());
        let (session, mut frames) = ClientSession::channel();
        registry.register(session);

        let mut manager = LiveReloadManager::new(
            dir.path().to_path_buf(),
            vec!["html".to_owned()],
            Duration::from_millis(50),
            Arc::clone(&registry),
        );
        manager.start().unwrap();

        std::fs::write(&page, "<html><body>changed</body></html>").unwrap();

        let frame = tokio::time::timeout(Duration::from_secs(5), frames.recv())
            .await
            .expect("reload frame within the timeout")
            .expect("session channel still open");
        assert_eq!(frame, r#"{"type":"reload"}"#);

        manager.stop().await;
    }

    #[tokio::test]
    async fn test_no_broadcast_after_stop() {
        let dir = tempfile::tempdir().unwrap();
        let page = dir.path().join("index.html");
        std::fs::write(&page, "<html></html>").unwrap();

        let registry = Arc::new(ClientRegistry::new());
        let (session, mut frames) = ClientSession::channel();
        registry.register(session);

        let mut manager = LiveReloadManager::new(
            dir.path().to_path_buf(),
            vec!["html".to_owned()],
            Duration::from_millis(50),
            Arc::clone(&registry),
        );
        manager.start().unwrap();
        manager.stop().await;

        std::fs::write(&page, "<html><body>changed</body></html>").unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert!(frames.try_recv().is_err());
    }
}
