//! Connected-client tracking for live reload.
//!
//! The registry is the only shared state between connection handling and
//! broadcasting. It never exposes its raw map: readers get a snapshot, so a
//! broadcast iterates a stable recipient set while connects and disconnects
//! proceed concurrently.

use std::collections::HashMap;
use std::sync::Mutex;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use uuid::Uuid;

/// Frames a session can buffer before it counts as stuck.
const SESSION_BUFFER: usize = 32;

/// Why a send to a session failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum SendFailure {
    /// The client is gone: its WebSocket task dropped the receiving half.
    Closed,
    /// The client is connected but has stopped draining its buffer.
    Backlogged,
}

/// Handle to one connected live-reload client.
///
/// Identity is the connection itself: every accepted connection gets exactly
/// one session, and the id exists only so the registry can key the handle.
#[derive(Clone, Debug)]
pub(crate) struct ClientSession {
    id: Uuid,
    tx: mpsc::Sender<String>,
}

impl ClientSession {
    /// Create a session together with the receiving half its WebSocket task
    /// drains into the socket.
    pub(crate) fn channel() -> (Self, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(SESSION_BUFFER);
        (
            Self {
                id: Uuid::new_v4(),
                tx,
            },
            rx,
        )
    }

    /// Session id.
    pub(crate) fn id(&self) -> Uuid {
        self.id
    }

    /// Queue a frame for delivery without blocking.
    ///
    /// The caller decides what a failure means; delivery to other sessions
    /// is never affected.
    pub(crate) fn send(&self, frame: String) -> Result<(), SendFailure> {
        self.tx.try_send(frame).map_err(|err| match err {
            TrySendError::Closed(_) => SendFailure::Closed,
            TrySendError::Full(_) => SendFailure::Backlogged,
        })
    }
}

/// Thread-safe set of connected client sessions.
///
/// Membership is unbounded by design; removal is the only way a session
/// stops receiving broadcasts.
#[derive(Debug, Default)]
pub(crate) struct ClientRegistry {
    sessions: Mutex<HashMap<Uuid, ClientSession>>,
}

impl ClientRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Add a session. Idempotent: re-registering an id replaces the handle.
    pub(crate) fn register(&self, session: ClientSession) {
        self.sessions.lock().unwrap().insert(session.id, session);
    }

    /// Remove a session. No-op when the id is not present.
    pub(crate) fn unregister(&self, id: Uuid) {
        self.sessions.lock().unwrap().remove(&id);
    }

    /// Current sessions, copied out for iteration.
    pub(crate) fn snapshot(&self) -> Vec<ClientSession> {
        self.sessions.lock().unwrap().values().cloned().collect()
    }

    /// Drop every session so each WebSocket task observes a closed channel
    /// and finishes. Used at shutdown.
    pub(crate) fn close_all(&self) {
        self.sessions.lock().unwrap().clear();
    }

    /// Number of connected sessions.
    pub(crate) fn len(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }

    /// True when no sessions remain.
    #[allow(dead_code)]
    pub(crate) fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Barrier};
    use std::thread;

    #[test]
    fn test_register_and_snapshot() {
        let registry = ClientRegistry::new();
        let (session, _rx) = ClientSession::channel();
        let id = session.id();

        registry.register(session);

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].id(), id);
    }

    #[test]
    fn test_register_is_idempotent() {
        let registry = ClientRegistry::new();
        let (session, _rx) = ClientSession::channel();

        registry.register(session.clone());
        registry.register(session);

        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unregister_absent_is_noop() {
        let registry = ClientRegistry::new();
        let (session, _rx) = ClientSession::channel();
        registry.register(session);

        registry.unregister(Uuid::new_v4());

        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_snapshot_is_unaffected_by_later_mutation() {
        let registry = ClientRegistry::new();
        let (first, _rx1) = ClientSession::channel();
        registry.register(first);

        let snapshot = registry.snapshot();

        let (second, _rx2) = ClientSession::channel();
        registry.register(second);
        assert_eq!(snapshot.len(), 1);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_close_all_empties_registry_and_closes_channels() {
        let registry = ClientRegistry::new();
        let (session, mut rx) = ClientSession::channel();
        registry.register(session);

        registry.close_all();

        assert!(registry.is_empty());
        // The only sender lived in the registry, so the channel is closed.
        assert!(matches!(
            rx.try_recv(),
            Err(mpsc::error::TryRecvError::Disconnected)
        ));
    }

    #[test]
    fn test_send_to_dropped_receiver_is_closed() {
        let (session, rx) = ClientSession::channel();
        drop(rx);

        assert_eq!(
            session.send("{}".to_owned()),
            Err(SendFailure::Closed)
        );
    }

    #[test]
    fn test_send_to_full_buffer_is_backlogged() {
        let (session, _rx) = ClientSession::channel();

        for _ in 0..SESSION_BUFFER {
            session.send("{}".to_owned()).unwrap();
        }
        assert_eq!(
            session.send("{}".to_owned()),
            Err(SendFailure::Backlogged)
        );
    }

    #[test]
    fn test_concurrent_register_unregister_with_snapshots() {
        const THREADS: usize = 4;
        const PER_THREAD: usize = 25;

        let registry = Arc::new(ClientRegistry::new());
        let barrier = Arc::new(Barrier::new(THREADS + 1));

        // Writer threads register PER_THREAD sessions each, then unregister
        // every other one.
        let mut handles = Vec::new();
        for _ in 0..THREADS {
            let registry = Arc::clone(&registry);
            let barrier = Arc::clone(&barrier);
            handles.push(thread::spawn(move || {
                barrier.wait();
                let mut owned = Vec::new();
                for i in 0..PER_THREAD {
                    let (session, rx) = ClientSession::channel();
                    let id = session.id();
                    registry.register(session);
                    if i % 2 == 0 {
                        registry.unregister(id);
                    }
                    owned.push(rx);
                }
                owned.len()
            }));
        }

        // A reader thread interleaves snapshot-and-send rounds, imitating
        // broadcasts racing the mutations.
        let reader = {
            let registry = Arc::clone(&registry);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for _ in 0..50 {
                    for session in registry.snapshot() {
                        let _ = session.send("{\"type\":\"reload\"}".to_owned());
                    }
                }
            })
        };

        for handle in handles {
            handle.join().unwrap();
        }
        reader.join().unwrap();

        // Every thread unregistered 13 of its 25 sessions (indices 0,2,..24),
        // so exactly 12 per thread survive.
        assert_eq!(registry.len(), THREADS * 12);
    }
}
