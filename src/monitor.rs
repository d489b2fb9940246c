//! Progress monitors
//!
//! Every lifecycle operation answers with a [`ProgressMonitor`] that tracks one
//! instance until the operation concludes. The server bumps the instance's
//! `updated` revision when an operation finishes, so a monitor holds the
//! revision seen when the operation was issued and waits for it to change.

use crate::error::ApiError;
use crate::executor::RequestExecutor;
use crate::types::{Instance, InstanceOperation, InstanceState, Revision};
use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

enum Tracking {
    /// Nothing to wait for; the operation was a no-op.
    Completed,
    Polling {
        executor: Arc<RequestExecutor>,
        baseline: Revision,
        accepted: Vec<InstanceOperation>,
    },
}

pub struct ProgressMonitor {
    resource_url: String,
    created_at: DateTime<Utc>,
    tracking: Tracking,
    poll_interval: Duration,
    last_observed: Mutex<Option<InstanceState>>,
}

impl fmt::Debug for ProgressMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("ProgressMonitor");
        s.field("resource_url", &self.resource_url)
            .field("created_at", &self.created_at);
        if let Tracking::Polling {
            baseline, accepted, ..
        } = &self.tracking
        {
            s.field("baseline", baseline).field("accepted", accepted);
        }
        s.finish()
    }
}

impl ProgressMonitor {
    pub fn new(
        executor: Arc<RequestExecutor>,
        resource_url: impl Into<String>,
        baseline: Revision,
        accepted: &[InstanceOperation],
    ) -> Self {
        Self {
            resource_url: resource_url.into(),
            created_at: Utc::now(),
            tracking: Tracking::Polling {
                executor,
                baseline,
                accepted: accepted.to_vec(),
            },
            poll_interval: DEFAULT_POLL_INTERVAL,
            last_observed: Mutex::new(None),
        }
    }

    /// A monitor that reports done without ever contacting the server.
    pub fn completed(resource_url: impl Into<String>) -> Self {
        Self {
            resource_url: resource_url.into(),
            created_at: Utc::now(),
            tracking: Tracking::Completed,
            poll_interval: DEFAULT_POLL_INTERVAL,
            last_observed: Mutex::new(Some(InstanceState::Done)),
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn resource_url(&self) -> &str {
        &self.resource_url
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn is_completed(&self) -> bool {
        matches!(self.tracking, Tracking::Completed)
    }

    /// Instance state seen by the most recent poll.
    pub fn last_observed_state(&self) -> Option<InstanceState> {
        *self.last_observed.lock()
    }

    /// Judge a polled instance.
    ///
    /// Unchanged revision or a state still processing means not done yet. A
    /// changed revision in the unavailable state, or one produced by an
    /// operation outside the accepted set, is an error.
    pub fn evaluate(&self, instance: &Instance) -> Result<bool, ApiError> {
        *self.last_observed.lock() = Some(instance.state);

        let (baseline, accepted) = match &self.tracking {
            Tracking::Completed => return Ok(true),
            Tracking::Polling {
                baseline, accepted, ..
            } => (baseline, accepted),
        };

        if instance.updated == *baseline || !instance.state.is_finished() {
            return Ok(false);
        }
        if instance.state == InstanceState::Unavailable {
            return Err(ApiError::InstanceUnavailable {
                url: self.resource_url.clone(),
            });
        }
        match instance.last_operation() {
            Some(operation) if accepted.contains(&operation) => Ok(true),
            _ => Err(ApiError::UnexpectedOperation {
                operation: instance.operation_name().to_string(),
                url: self.resource_url.clone(),
            }),
        }
    }

    /// Poll the instance once.
    pub async fn is_done(&self) -> Result<bool, ApiError> {
        let executor = match &self.tracking {
            Tracking::Completed => return Ok(true),
            Tracking::Polling { executor, .. } => executor,
        };

        let instance: Instance = executor
            .get_json(&self.resource_url)
            .await
            .map_err(|e| {
                if e.is_not_found() {
                    ApiError::ResourceDisappeared {
                        url: self.resource_url.clone(),
                    }
                } else {
                    e
                }
            })?;

        let done = self.evaluate(&instance)?;
        debug!(
            url = %self.resource_url,
            state = %instance.state,
            operation = instance.operation_name(),
            done,
            "Polled instance"
        );
        Ok(done)
    }

    /// Wait until done. A `timeout_minutes` of zero waits indefinitely.
    pub async fn wait_for_done(
        &self,
        timeout_minutes: u64,
        cancel: &CancellationToken,
    ) -> Result<(), ApiError> {
        let budget = match timeout_minutes {
            0 => None,
            minutes => Some(Duration::from_secs(minutes.saturating_mul(60))),
        };
        self.wait_for_done_within(budget, cancel).await
    }

    /// Wait until done or until `budget` has elapsed. Once the budget is spent
    /// the instance is checked one last time before giving up.
    pub async fn wait_for_done_within(
        &self,
        budget: Option<Duration>,
        cancel: &CancellationToken,
    ) -> Result<(), ApiError> {
        let started = Instant::now();

        loop {
            if cancel.is_cancelled() {
                return Err(self.cancelled());
            }
            if self.is_done().await? {
                info!(url = %self.resource_url, elapsed_ms = started.elapsed().as_millis() as u64, "Operation finished");
                return Ok(());
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(self.cancelled()),
                _ = sleep(self.poll_interval) => {}
            }

            if let Some(budget) = budget {
                let waited = started.elapsed();
                if waited >= budget {
                    if self.is_done().await? {
                        return Ok(());
                    }
                    return Err(ApiError::Timeout {
                        url: self.resource_url.clone(),
                        waited_secs: waited.as_secs(),
                        state: self
                            .last_observed_state()
                            .map(|s| s.to_string())
                            .unwrap_or_else(|| "unknown".to_string()),
                    });
                }
            }
        }
    }

    fn cancelled(&self) -> ApiError {
        ApiError::Cancelled {
            url: self.resource_url.clone(),
        }
    }
}

/// Wait for several monitors at once, failing on the first error.
pub async fn wait_all(
    monitors: &[ProgressMonitor],
    timeout_minutes: u64,
    cancel: &CancellationToken,
) -> Result<(), ApiError> {
    try_join_all(
        monitors
            .iter()
            .map(|monitor| monitor.wait_for_done(timeout_minutes, cancel)),
    )
    .await?;
    Ok(())
}
