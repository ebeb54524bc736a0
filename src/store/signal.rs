//! Readiness barrier
//!
//! A single-resolution signal the store fulfils when initialization reaches a
//! terminal state. Unlike a success-only wait, waiters are released on failure
//! too and receive the [`InitializationError`].

use tokio::sync::watch;

use crate::error::{InitializationError, StoreError};

/// Outcome of the current initialization session
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Readiness {
    /// Not initialized yet, or initialization in flight
    #[default]
    Pending,
    /// Initialization succeeded
    Ready,
    /// Initialization failed
    Failed(InitializationError),
}

impl Readiness {
    /// True once the session has a terminal outcome
    pub fn is_settled(&self) -> bool {
        !matches!(self, Readiness::Pending)
    }

    fn into_result(self) -> Result<(), StoreError> {
        match self {
            Readiness::Ready => Ok(()),
            Readiness::Failed(err) => Err(StoreError::Initialization(err)),
            Readiness::Pending => Err(StoreError::SignalClosed),
        }
    }
}

/// Readiness barrier shared by the store and its waiters
pub struct ReadySignal {
    sender: watch::Sender<Readiness>,
}

impl Default for ReadySignal {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadySignal {
    /// Create a pending signal
    pub fn new() -> Self {
        let (sender, _receiver) = watch::channel(Readiness::Pending);
        Self { sender }
    }

    /// Re-arm for a new session
    pub(crate) fn reset(&self) {
        self.sender.send_replace(Readiness::Pending);
    }

    /// Resolve the current session. Ignored if it already resolved.
    pub(crate) fn resolve(&self, outcome: Readiness) {
        self.sender.send_if_modified(|current| {
            if current.is_settled() {
                return false;
            }
            *current = outcome;
            true
        });
    }

    /// Current value
    pub fn current(&self) -> Readiness {
        self.sender.borrow().clone()
    }

    /// Wait until the current session settles
    pub async fn wait(&self) -> Result<(), StoreError> {
        let mut receiver = self.sender.subscribe();
        let outcome = receiver
            .wait_for(Readiness::is_settled)
            .await
            .map_err(|_| StoreError::SignalClosed)?
            .clone();
        outcome.into_result()
    }
}
