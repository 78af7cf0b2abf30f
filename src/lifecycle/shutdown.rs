//! Shutdown fan-out for the gateway.
//!
//! Two tasks listen: the HTTP server, which stops accepting connections and
//! drains in-flight requests through axum's graceful shutdown, and the
//! counter sweeper, which leaves its tick loop. Both hold a receiver from
//! [`Shutdown::subscribe`]; the signal task in `main` calls
//! [`Shutdown::trigger`] once SIGINT or SIGTERM arrives.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::broadcast;

pub struct Shutdown {
    tx: broadcast::Sender<()>,
    triggered: AtomicBool,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self {
            tx,
            triggered: AtomicBool::new(false),
        }
    }

    /// Receiver for the server or sweeper. Subscribe before triggering;
    /// a receiver created afterwards never fires.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Tell every listener to stop. Only the first call sends.
    pub fn trigger(&self) {
        if self.triggered.swap(true, Ordering::SeqCst) {
            return;
        }
        let notified = self.tx.send(()).unwrap_or(0);
        tracing::info!(listeners = notified, "Draining gateway");
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    /// Tasks still holding a receiver.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::broadcast::error::TryRecvError;

    #[tokio::test]
    async fn test_trigger_reaches_server_and_sweeper() {
        let shutdown = Shutdown::new();
        let mut server = shutdown.subscribe();
        let mut sweeper = shutdown.subscribe();
        assert_eq!(shutdown.receiver_count(), 2);
        assert!(!shutdown.is_triggered());

        shutdown.trigger();
        assert!(shutdown.is_triggered());
        assert!(server.recv().await.is_ok());
        assert!(sweeper.recv().await.is_ok());
    }

    #[tokio::test]
    async fn test_repeated_trigger_sends_once() {
        let shutdown = Shutdown::new();
        let mut rx = shutdown.subscribe();

        shutdown.trigger();
        shutdown.trigger();

        assert!(rx.recv().await.is_ok());
        assert_eq!(rx.try_recv(), Err(TryRecvError::Empty));
    }

    #[test]
    fn test_trigger_without_listeners_is_harmless() {
        let shutdown = Shutdown::default();
        shutdown.trigger();
        assert!(shutdown.is_triggered());
    }
}
