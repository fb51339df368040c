//! The session [`Cancel`] token.

use std::sync::{Arc, OnceLock};
use tokio::sync::broadcast;

/// A cooperative cancellation signal shared by every task that makes up a
/// [`TunnelSession`](crate::session::TunnelSession).
///
/// Cloning a `Cancel` yields another handle to the same underlying signal;
/// triggering any clone triggers all of them. This lets the send path, the
/// heartbeat supervisor, and the receive demultiplexer each hold their own
/// clone and independently `select!` on it without coordinating through a
/// shared lock.
#[derive(Debug, Clone)]
pub struct Cancel {
    fired: Arc<OnceLock<()>>,
    notify: broadcast::Sender<()>,
}

impl Cancel {
    /// Creates a new, untriggered cancellation signal.
    pub fn new() -> Self {
        let (notify, _recv) = broadcast::channel(1);
        Self {
            fired: Arc::new(OnceLock::new()),
            notify,
        }
    }

    /// Triggers cancellation. Idempotent: firing an already-fired token is a
    /// no-op.
    pub fn cancel(&self) {
        if self.fired.set(()).is_ok() {
            let _ = self.notify.send(());
        }
    }

    /// Returns `true` once [`Self::cancel`] has been called on any clone of
    /// this token.
    pub fn is_cancelled(&self) -> bool {
        self.fired.get().is_some()
    }

    /// Resolves once this token has been cancelled. Safe to await from
    /// multiple tasks concurrently and to call after cancellation already
    /// happened (resolves immediately).
    pub async fn cancelled(&self) {
        let mut recv = self.notify.subscribe();
        loop {
            if self.is_cancelled() {
                return;
            }
            let _ = recv.recv().await;
        }
    }
}

impl Default for Cancel {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn cancel_wakes_all_clones() {
        let token = Cancel::new();
        let clones: Vec<_> = (0..3).map(|_| token.clone()).collect();
        token.cancel();
        for clone in clones {
            clone.cancelled().await;
            assert!(clone.is_cancelled());
        }
    }

    #[tokio::test]
    async fn cancel_is_idempotent() {
        let token = Cancel::new();
        token.cancel();
        token.cancel();
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn cancelled_after_the_fact_resolves_immediately() {
        let token = Cancel::new();
        token.cancel();
        token.cancelled().await;
    }
}
