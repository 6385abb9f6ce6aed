//! Hosting runtime for change handlers.
//!
//! Consumes a store's change feed on a tokio task and invokes the handler once
//! per write, in write order. A failed reaction is redelivered with linear
//! backoff until `max_attempts` is reached, after which the event is logged
//! and abandoned. Handlers do blocking store I/O, so each call runs on the
//! blocking thread pool.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::ReactorConfig;
use crate::error::HelpdeskError;
use crate::reactor::handler::{ChangeHandler, Reaction};
use crate::store::{ChangeEvent, ChangeStream};

/// Redelivery policy for failed reactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total deliveries per event, including the first.
    pub max_attempts: u32,
    /// Base delay; attempt `n` waits `n * backoff`.
    pub backoff: Duration,
}

impl RetryPolicy {
    /// Build a policy from reactor configuration.
    pub fn from_config(config: &ReactorConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            backoff: Duration::from_millis(config.retry_backoff_ms),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&ReactorConfig::default())
    }
}

/// Counters reported when the runtime stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuntimeStats {
    /// Change events received.
    pub delivered: u64,
    /// Events that produced a resolution reaction.
    pub fired: u64,
    /// Redeliveries after a failed reaction.
    pub retries: u64,
    /// Events given up on after `max_attempts`.
    pub abandoned: u64,
}

/// A running change handler bound to one change stream.
///
/// Dropping the runtime without calling `shutdown` lets the detached task
/// drain the queued events and stop.
#[derive(Debug)]
pub struct TriggerRuntime {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<RuntimeStats>,
}

impl TriggerRuntime {
    /// Spawn the runtime on the current tokio runtime.
    pub fn spawn<H>(changes: ChangeStream, handler: H, policy: RetryPolicy) -> Self
    where
        H: ChangeHandler + 'static,
    {
        let (shutdown, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(run(changes, handler, policy, shutdown_rx));
        Self { shutdown, task }
    }

    /// Stop accepting events once the queue is drained, and wait for it.
    pub async fn shutdown(self) -> RuntimeStats {
        let _ = self.shutdown.send(());
        match self.task.await {
            Ok(stats) => stats,
            Err(err) => {
                error!(error = %err, "trigger runtime task failed");
                RuntimeStats::default()
            }
        }
    }
}

async fn run<H: ChangeHandler + 'static>(
    mut changes: ChangeStream,
    handler: H,
    policy: RetryPolicy,
    mut shutdown: oneshot::Receiver<()>,
) -> RuntimeStats {
    let handler = Arc::new(handler);
    let mut stats = RuntimeStats::default();
    info!(max_attempts = policy.max_attempts, "trigger runtime started");

    loop {
        tokio::select! {
            biased;
            event = changes.recv() => match event {
                Some(event) => deliver(&handler, &event, policy, &mut stats).await,
                None => {
                    debug!("change feed closed");
                    break;
                }
            },
            _ = &mut shutdown => {
                while let Some(event) = changes.try_recv() {
                    deliver(&handler, &event, policy, &mut stats).await;
                }
                break;
            }
        }
    }

    info!(
        delivered = stats.delivered,
        fired = stats.fired,
        retries = stats.retries,
        abandoned = stats.abandoned,
        "trigger runtime stopped"
    );
    stats
}

async fn deliver<H: ChangeHandler + 'static>(
    handler: &Arc<H>,
    event: &ChangeEvent,
    policy: RetryPolicy,
    stats: &mut RuntimeStats,
) {
    stats.delivered += 1;
    let mut attempt: u32 = 1;

    loop {
        let outcome = tokio::task::spawn_blocking({
            let handler = Arc::clone(handler);
            let event = event.clone();
            move || handler.handle(&event)
        })
        .await
        .unwrap_or_else(|err| {
            Err(HelpdeskError::reactor(&event.document_id, err.to_string()))
        });

        match outcome {
            Ok(Reaction::Ignored) => return,
            Ok(Reaction::Resolved { .. }) => {
                stats.fired += 1;
                return;
            }
            Err(err) if attempt < policy.max_attempts => {
                warn!(
                    request_id = %event.document_id,
                    attempt,
                    error = %err,
                    "reaction failed, redelivering"
                );
                stats.retries += 1;
                tokio::time::sleep(policy.backoff * attempt).await;
                attempt += 1;
            }
            Err(err) => {
                error!(
                    request_id = %event.document_id,
                    attempts = attempt,
                    error = %err,
                    "reaction abandoned"
                );
                stats.abandoned += 1;
                return;
            }
        }
    }
}
