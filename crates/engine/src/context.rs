//! Per-operation cancellation and deadline.

use std::{future::Future, time::Duration};

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::{EngineError, ResultEngine};

/// Cancellation signal and optional deadline handed to every engine
/// operation.
///
/// When the token fires or the deadline passes, the database call in flight
/// is dropped, the open transaction rolls back and the operation returns
/// [`EngineError::Cancelled`].
#[derive(Clone, Debug, Default)]
pub struct OpContext {
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl OpContext {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    fn interrupted(&self) -> Option<EngineError> {
        if self.cancel.is_cancelled() {
            return Some(EngineError::Cancelled("operation cancelled".to_string()));
        }
        if self.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return Some(EngineError::Cancelled("deadline exceeded".to_string()));
        }
        None
    }

    /// Run `fut` unless the operation is cancelled or its deadline expires
    /// first.
    pub(crate) async fn guard<T>(
        &self,
        fut: impl Future<Output = ResultEngine<T>>,
    ) -> ResultEngine<T> {
        self.race(fut, "operation cancelled", "deadline exceeded")
            .await
    }

    /// Like [`guard`](Self::guard) for a `COMMIT`: once the commit was sent,
    /// an interruption leaves its outcome unknown to us.
    pub(crate) async fn guard_commit<T>(
        &self,
        fut: impl Future<Output = ResultEngine<T>>,
    ) -> ResultEngine<T> {
        if let Some(err) = self.interrupted() {
            return Err(err);
        }
        self.race(
            fut,
            "cancelled during commit, outcome indeterminate",
            "deadline exceeded during commit, outcome indeterminate",
        )
        .await
    }

    async fn race<T>(
        &self,
        fut: impl Future<Output = ResultEngine<T>>,
        cancelled: &str,
        expired: &str,
    ) -> ResultEngine<T> {
        let timed = async {
            match self.deadline {
                Some(deadline) => tokio::time::timeout_at(deadline, fut)
                    .await
                    .unwrap_or_else(|_| Err(EngineError::Cancelled(expired.to_string()))),
                None => fut.await,
            }
        };
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(EngineError::Cancelled(cancelled.to_string())),
            result = timed => result,
        }
    }
}
