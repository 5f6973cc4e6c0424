//! Shutdown coordination for the demo service.

use tokio::sync::broadcast;

/// Stop signal shared by the demo server and the signal listener.
///
/// Clones share one broadcast channel, so a trigger from any clone reaches
/// every subscriber.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    /// Coordinator with no subscribers yet.
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// Receiver that yields once shutdown is triggered.
    ///
    /// Only triggers sent after this call are seen.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Broadcast shutdown. A trigger with no subscriber is dropped.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }

    /// Resolve once [`trigger`](Self::trigger) has been called.
    pub fn wait(&self) -> impl std::future::Future<Output = ()> + Send + 'static {
        let mut rx = self.subscribe();
        async move {
            let _ = rx.recv().await;
        }
    }

    /// Number of tasks still listening.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
