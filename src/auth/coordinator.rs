//! Single-flight token refresh.
//!
//! # States
//! ```text
//! idle ──(first 401)──▶ refreshing ──(refresh settles)──▶ idle
//!                           │
//!                           └─ later 401s queue a waiter instead of
//!                              issuing their own refresh
//! ```
//!
//! When the refresh settles every queued waiter receives the same outcome:
//! the new access token, or the same error. The queue is emptied on every
//! settle. The lock is never held across an await.

use std::future::Future;
use std::sync::Mutex;

use thiserror::Error;
use tokio::sync::oneshot;

/// Why a refresh did not produce a new token.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RefreshError {
    #[error("no refresh token stored")]
    NoRefreshToken,

    #[error("refresh rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("refresh request failed: {0}")]
    Transport(String),

    #[error("refresh response malformed: {0}")]
    Decode(String),

    #[error("could not persist refreshed tokens: {0}")]
    Storage(String),

    /// The task driving the refresh went away before it settled.
    #[error("refresh abandoned")]
    Abandoned,
}

/// New access token, or why there is none.
pub type Outcome = Result<String, RefreshError>;

#[derive(Default)]
struct RefreshState {
    refreshing: bool,
    waiters: Vec<oneshot::Sender<Outcome>>,
}

/// Refresh flag plus pending queue, shared by every request of a client.
#[derive(Default)]
pub struct RefreshCoordinator {
    state: Mutex<RefreshState>,
}

impl RefreshCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a refresh is in flight right now.
    pub fn is_refreshing(&self) -> bool {
        self.lock().refreshing
    }

    /// Number of requests queued behind the in-flight refresh.
    pub fn pending(&self) -> usize {
        self.lock().waiters.len()
    }

    /// Run `refresh` if nothing is in flight, otherwise wait for the refresh
    /// that is. Either way the caller gets the settled outcome.
    pub async fn refresh_or_wait<F, Fut>(&self, refresh: F) -> Outcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Outcome>,
    {
        let waiter = {
            let mut state = self.lock();
            if state.refreshing {
                let (tx, rx) = oneshot::channel();
                state.waiters.push(tx);
                Some(rx)
            } else {
                state.refreshing = true;
                None
            }
        };

        if let Some(rx) = waiter {
            tracing::debug!("Refresh in flight, queued behind it");
            return rx.await.unwrap_or(Err(RefreshError::Abandoned));
        }

        let mut guard = LeaderGuard {
            coordinator: self,
            settled: false,
        };
        let outcome = refresh().await;
        guard.settle(outcome.clone());
        outcome
    }

    fn settle(&self, outcome: Outcome) {
        let waiters = {
            let mut state = self.lock();
            state.refreshing = false;
            std::mem::take(&mut state.waiters)
        };

        tracing::debug!(
            waiters = waiters.len(),
            success = outcome.is_ok(),
            "Refresh settled, releasing queue"
        );
        for waiter in waiters {
            let _ = waiter.send(outcome.clone());
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RefreshState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Releases the queue even if the leading future is dropped mid-refresh.
struct LeaderGuard<'a> {
    coordinator: &'a RefreshCoordinator,
    settled: bool,
}

impl LeaderGuard<'_> {
    fn settle(&mut self, outcome: Outcome) {
        self.settled = true;
        self.coordinator.settle(outcome);
    }
}

impl Drop for LeaderGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.coordinator.settle(Err(RefreshError::Abandoned));
        }
    }
}
