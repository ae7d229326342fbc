//! Reload broadcasting with per-client failure isolation.

use std::sync::Arc;

use serde::Serialize;

use super::registry::ClientRegistry;

/// Notification pushed to every connected client when watched files change.
///
/// The wire form is exactly `{"type":"reload"}`; no other message types
/// exist in this protocol.
#[derive(Clone, Copy, Debug, Serialize)]
pub(crate) struct ReloadMessage {
    /// Message type (always "reload").
    #[serde(rename = "type")]
    message_type: &'static str,
}

impl ReloadMessage {
    pub(crate) fn new() -> Self {
        Self {
            message_type: "reload",
        }
    }
}

/// Delivers reload messages to every registered session.
pub(crate) struct ReloadNotifier {
    registry: Arc<ClientRegistry>,
}

impl ReloadNotifier {
    pub(crate) fn new(registry: Arc<ClientRegistry>) -> Self {
        Self { registry }
    }

    /// Run one broadcast round; returns the number of sessions reached.
    ///
    /// The snapshot taken up front fixes the recipient set: sessions joining
    /// mid-round get the next round. A failed send never aborts the round;
    /// the failing session is unregistered afterwards and nothing propagates
    /// to the caller, because one unreachable client must not block the
    /// reload for everyone else.
    pub(crate) fn broadcast(&self) -> usize {
        let frame = match serde_json::to_string(&ReloadMessage::new()) {
            Ok(frame) => frame,
            Err(err) => {
                // A fixed-shape message failing to serialize is a bug, not a
                // disconnect; surface it instead of removing anyone.
                tracing::error!(error = %err, "reload message failed to serialize");
                return 0;
            }
        };

        let sessions = self.registry.snapshot();
        if sessions.is_empty() {
            return 0;
        }

        let mut delivered = 0;
        let mut failed = Vec::new();
        for session in &sessions {
            match session.send(frame.clone()) {
                Ok(()) => delivered += 1,
                Err(reason) => {
                    tracing::debug!(
                        client = %session.id(),
                        ?reason,
                        "removing unreachable live-reload client"
                    );
                    failed.push(session.id());
                }
            }
        }
        for id in failed {
            self.registry.unregister(id);
        }

        tracing::debug!(delivered, total = sessions.len(), "reload broadcast round");
        delivered
    }
}
