use tokio::sync::broadcast;

/// Session-level signals raised by the HTTP layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The backend answered 401. `endpoint` is the request path that was rejected.
    Unauthorized { endpoint: String },
}

/// Broadcast channel for [`SessionEvent`]s.
///
/// Cloning shares the channel. Publishing with no subscribers is not an error.
#[derive(Debug, Clone)]
pub struct SessionEvents {
    tx: broadcast::Sender<SessionEvent>,
}

impl SessionEvents {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(16);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }

    pub fn publish(&self, event: SessionEvent) {
        let _ = self.tx.send(event);
    }
}

impl Default for SessionEvents {
    fn default() -> Self {
        Self::new()
    }
}
