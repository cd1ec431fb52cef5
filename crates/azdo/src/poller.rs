//! Bounded polling of long-running remote operations.
//!
//! The remote system queues some creations (projects) and reports an
//! operation id instead of the resource. [`OperationPoller::wait`] fetches
//! the operation status at a fixed interval until it is terminal or the
//! attempt budget is spent. [`poll_for`] is the same loop for "wait until
//! this lookup finds something", used for team discovery.

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use devhub_core::types::OperationStatus;

use crate::client::{ConflictAware, RemoteError, RemoteResourceClient};

/// Errors from waiting on a remote operation.
#[derive(Debug, thiserror::Error)]
pub enum OperationError {
    #[error("Operation {operation_id} failed")]
    Failed { operation_id: String },

    #[error("Operation {operation_id} did not finish after {attempts} attempts")]
    Timeout { operation_id: String, attempts: u32 },

    #[error(transparent)]
    Remote(#[from] RemoteError),
}

impl ConflictAware for OperationError {
    fn is_conflict(&self) -> bool {
        matches!(self, Self::Remote(e) if e.is_conflict())
    }
}

/// Suspends the current task. Injected so tests can run without waiting.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Production [`Sleeper`] backed by `tokio::time::sleep`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Interval and attempt ceiling of a polling loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl PollSettings {
    /// Project creation: every 2 s, at most 30 times.
    pub const OPERATION: Self = Self::new(Duration::from_secs(2), 30);

    /// Default-team discovery: every 3 s, at most 10 times.
    pub const TEAM_DISCOVERY: Self = Self::new(Duration::from_secs(3), 10);

    pub const fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }
}

/// Waits for remote operations to reach a terminal status.
pub struct OperationPoller {
    client: Arc<dyn RemoteResourceClient>,
    sleeper: Arc<dyn Sleeper>,
}

impl OperationPoller {
    pub fn new(client: Arc<dyn RemoteResourceClient>, sleeper: Arc<dyn Sleeper>) -> Self {
        Self { client, sleeper }
    }

    /// Poll `operation_id` until it succeeds, fails, or `settings`'
    /// attempt budget runs out.
    ///
    /// A status fetch error is logged and retried, except on the final
    /// attempt where it is returned. No sleep follows the final attempt.
    pub async fn wait(&self, operation_id: &str, settings: &PollSettings) -> Result<(), OperationError> {
        for attempt in 1..=settings.max_attempts {
            let last = attempt == settings.max_attempts;

            match self.client.get_operation_status(operation_id).await {
                Ok(OperationStatus::Succeeded) => {
                    tracing::info!(operation_id, attempt, "Operation succeeded");
                    return Ok(());
                }
                Ok(OperationStatus::Failed) => {
                    tracing::error!(operation_id, attempt, "Operation failed");
                    return Err(OperationError::Failed {
                        operation_id: operation_id.to_string(),
                    });
                }
                Ok(OperationStatus::Pending) => {
                    tracing::debug!(operation_id, attempt, "Operation still pending");
                }
                Err(e) if last => return Err(OperationError::Remote(e)),
                Err(e) => {
                    tracing::warn!(
                        operation_id,
                        attempt,
                        error = %e,
                        "Failed to fetch operation status, retrying",
                    );
                }
            }

            if !last {
                self.sleeper.sleep(settings.interval).await;
            }
        }

        Err(OperationError::Timeout {
            operation_id: operation_id.to_string(),
            attempts: settings.max_attempts,
        })
    }
}

/// Run `probe` up to `settings.max_attempts` times until it yields a value.
///
/// Probe errors are logged and count as an empty attempt. Returns `None`
/// once the budget is spent.
pub async fn poll_for<T, E, F, Fut>(
    sleeper: &dyn Sleeper,
    settings: &PollSettings,
    what: &str,
    mut probe: F,
) -> Option<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Option<T>, E>>,
    E: Display,
{
    for attempt in 1..=settings.max_attempts {
        match probe(attempt).await {
            Ok(Some(found)) => return Some(found),
            Ok(None) => tracing::debug!(attempt, what, "Not found yet"),
            Err(e) => tracing::warn!(attempt, what, error = %e, "Lookup failed, retrying"),
        }
        if attempt < settings.max_attempts {
            sleeper.sleep(settings.interval).await;
        }
    }
    None
}
