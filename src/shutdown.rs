//! Shutdown coordination.
//!
//! A server moves through three states, never backwards:
//!
//! ```text
//! Running ──signal──▶ Draining ──connections done or grace elapsed──▶ Stopped
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use tokio::sync::watch;

/// Where a server is in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum State {
    Running,
    Draining,
    Stopped,
}

impl State {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Running,
            1 => Self::Draining,
            _ => Self::Stopped,
        }
    }
}

struct Inner {
    /// Flips to `true` exactly once.
    triggered: watch::Sender<bool>,
    state: AtomicU8,
}

/// Cloneable handle to a server's shutdown flag and state.
///
/// ```rust,no_run
/// use easyroute::{Router, Server};
///
/// # async fn run() -> Result<(), easyroute::Error> {
/// let server = Server::bind("127.0.0.1:3000")?;
/// let handle = server.handle();
///
/// tokio::spawn(async move {
///     tokio::time::sleep(std::time::Duration::from_secs(60)).await;
///     handle.shutdown();
/// });
///
/// server.serve(Router::new()).await
/// # }
/// ```
#[derive(Clone)]
pub struct ShutdownHandle {
    inner: Arc<Inner>,
}

impl ShutdownHandle {
    pub(crate) fn new() -> Self {
        let (triggered, _) = watch::channel(false);
        Self { inner: Arc::new(Inner { triggered, state: AtomicU8::new(State::Running as u8) }) }
    }

    /// Starts a graceful shutdown, as if the process had received SIGTERM.
    /// Calling it again has no effect.
    pub fn shutdown(&self) {
        self.inner.triggered.send_if_modified(|triggered| !std::mem::replace(triggered, true));
    }

    pub fn is_triggered(&self) -> bool {
        *self.inner.triggered.borrow()
    }

    pub fn state(&self) -> State {
        State::from_u8(self.inner.state.load(Ordering::Acquire))
    }

    pub(crate) fn set_state(&self, state: State) {
        self.inner.state.fetch_max(state as u8, Ordering::AcqRel);
    }

    /// Resolves once [`shutdown`](Self::shutdown) has been called.
    pub(crate) async fn triggered(&self) {
        let mut rx = self.inner.triggered.subscribe();
        // The sender lives in `self`, so the channel cannot close under us.
        let _ = rx.wait_for(|triggered| *triggered).await;
    }
}

impl std::fmt::Debug for ShutdownHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShutdownHandle")
            .field("triggered", &self.is_triggered())
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_only_moves_forward() {
        let handle = ShutdownHandle::new();
        assert_eq!(handle.state(), State::Running);
        handle.set_state(State::Stopped);
        handle.set_state(State::Draining);
        assert_eq!(handle.state(), State::Stopped);
    }

    #[tokio::test]
    async fn trigger_is_sticky_and_observed_late() {
        let handle = ShutdownHandle::new();
        let early = tokio::spawn({
            let handle = handle.clone();
            async move { handle.triggered().await }
        });
        tokio::task::yield_now().await;

        handle.shutdown();
        handle.shutdown();
        assert!(handle.is_triggered());
        early.await.unwrap();

        // A waiter that arrives after the fact still resolves.
        handle.triggered().await;
    }
}
