//! Readiness polling
//!
//! The poller ticks at `start + k * interval` until the workload reports as
//! many ready replicas as it declares, the deadline passes, or shutdown is
//! requested. The outcome is returned as an explicit terminal state.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use function_checker_common::ReadinessConfig;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::kubernetes::workloads::{statefulsets, ReplicaCounts};
use crate::kubernetes::{K8sClient, K8sResult};
use crate::shutdown::ShutdownCoordinator;

/// Stand-in for "never" when `start + duration` does not fit in an `Instant`
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

fn instant_after(start: Instant, duration: Duration) -> Instant {
    start
        .checked_add(duration)
        .unwrap_or_else(|| start + FAR_FUTURE)
}

/// Something whose replica readiness can be observed
#[async_trait]
pub trait ReplicaSource: Send + Sync {
    /// Fetch the current declared and ready replica counts
    async fn replica_counts(&self) -> K8sResult<ReplicaCounts>;

    /// Label used in logs and report entries
    fn describe(&self) -> String;
}

/// Replica counts of a StatefulSet read from the API server
#[derive(Debug, Clone)]
pub struct StatefulSetReplicas {
    client: K8sClient,
    namespace: String,
    name: String,
}

impl StatefulSetReplicas {
    pub fn new(client: K8sClient, namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            client,
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

#[async_trait]
impl ReplicaSource for StatefulSetReplicas {
    async fn replica_counts(&self) -> K8sResult<ReplicaCounts> {
        statefulsets::get_replica_counts(&self.client, &self.namespace, &self.name).await
    }

    fn describe(&self) -> String {
        format!("{}/statefulsets/{}", self.namespace, self.name)
    }
}

/// Terminal state of one wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadinessOutcome {
    /// All declared replicas were ready on the last tick
    Ready { waited: Duration, ticks: u32 },
    /// The deadline passed first
    TimedOut { ticks: u32 },
    /// Shutdown was requested while waiting
    Cancelled { ticks: u32 },
}

impl fmt::Display for ReadinessOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadinessOutcome::Ready { waited, ticks } => {
                write!(f, "ready after {:?} ({} checks)", waited, ticks)
            }
            ReadinessOutcome::TimedOut { ticks } => write!(f, "timed out after {} checks", ticks),
            ReadinessOutcome::Cancelled { ticks } => write!(f, "cancelled after {} checks", ticks),
        }
    }
}

/// Bounded readiness poller
#[derive(Debug, Clone, Copy)]
pub struct ReadinessPoller {
    timeout: Duration,
    interval: Duration,
}

impl ReadinessPoller {
    /// `interval` must be non-zero
    pub fn new(timeout: Duration, interval: Duration) -> Self {
        Self { timeout, interval }
    }

    pub fn from_config(config: &ReadinessConfig) -> Self {
        Self::new(
            Duration::from_secs(config.timeout_secs),
            Duration::from_secs(config.interval_secs),
        )
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Upper bound on status fetches for one wait: `ceil(timeout / interval)`
    pub fn max_ticks(&self) -> u128 {
        self.timeout.as_nanos().div_ceil(self.interval.as_nanos())
    }

    /// Poll `source` until ready, timed out, or cancelled
    ///
    /// A fetch error leaves the state unchanged. An in-flight fetch is not
    /// interrupted by shutdown; cancellation is observed between ticks.
    pub async fn wait(
        &self,
        source: &dyn ReplicaSource,
        shutdown: &ShutdownCoordinator,
    ) -> ReadinessOutcome {
        let target = source.describe();
        info!(workload = %target, timeout = ?self.timeout, "Waiting for workload to become ready");

        let start = Instant::now();
        let deadline = tokio::time::sleep_until(instant_after(start, self.timeout));
        tokio::pin!(deadline);

        let mut ticker =
            tokio::time::interval_at(instant_after(start, self.interval), self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut ticks = 0u32;

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    warn!(workload = %target, ticks, "Readiness wait cancelled");
                    return ReadinessOutcome::Cancelled { ticks };
                }
                _ = &mut deadline => {
                    warn!(workload = %target, ticks, "Timed out waiting for workload readiness");
                    return ReadinessOutcome::TimedOut { ticks };
                }
                _ = ticker.tick() => {
                    ticks += 1;
                    match source.replica_counts().await {
                        Ok(counts) if counts.is_ready() => {
                            let waited = start.elapsed();
                            info!(workload = %target, elapsed = ?waited, ticks, "Workload is ready");
                            return ReadinessOutcome::Ready { waited, ticks };
                        }
                        Ok(counts) => {
                            debug!(
                                workload = %target,
                                declared = counts.declared,
                                ready = counts.ready,
                                "Workload not ready yet"
                            );
                        }
                        Err(e) => {
                            debug!(workload = %target, error = %e, "Failed to fetch workload status");
                        }
                    }
                }
            }
        }
    }
}
