// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Periodic reconciler for stalled, abandoned, and backlogged jobs.
//!
//! Each pass runs three sweeps in order: time out stalled active jobs,
//! fail jobs whose worker went offline, then drain the backlog onto
//! whatever workers are free, including ones freed by the first two
//! sweeps. One bad record never stops a pass.

use std::sync::Arc;
use std::time::Duration;

use encore_core::{Clock, JobStatus};
use encore_storage::{JobFilter, Store};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::dispatch::SelectPolicy;

/// Comment recorded when a job sat in one status past its threshold.
pub const TIMEOUT_COMMENT: &str = "timeout";
/// Comment recorded when a job's worker stopped polling.
pub const OFFLINE_COMMENT: &str = "worker offline";

/// Per-status stall thresholds: how long a job may sit unchanged in a
/// status before a pass fails it.
#[derive(Debug, Clone)]
pub struct StallThresholds {
    pub assigned: Duration,
    pub pending: Duration,
    pub acknowledged: Duration,
    pub recording: Duration,
    pub uploading: Duration,
}

impl Default for StallThresholds {
    fn default() -> Self {
        Self {
            assigned: Duration::from_secs(60),
            pending: Duration::from_secs(60),
            acknowledged: Duration::from_secs(5 * 60),
            recording: Duration::from_secs(30 * 60),
            uploading: Duration::from_secs(60 * 60),
        }
    }
}

impl StallThresholds {
    fn for_status(&self, status: JobStatus) -> Option<Duration> {
        match status {
            JobStatus::Assigned => Some(self.assigned),
            JobStatus::Pending => Some(self.pending),
            JobStatus::Acknowledged => Some(self.acknowledged),
            JobStatus::Recording => Some(self.recording),
            JobStatus::Uploading => Some(self.uploading),
            _ => None,
        }
    }
}

/// What one maintenance pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassSummary {
    pub timed_out: usize,
    pub reclaimed: usize,
    pub drained: usize,
}

/// The maintenance loop.
pub struct Maintenance<C: Clock> {
    store: Store,
    clock: C,
    policy: Arc<dyn SelectPolicy>,
    interval: Duration,
    online_threshold: Duration,
    thresholds: StallThresholds,
}

impl<C: Clock> Maintenance<C> {
    pub fn new(
        store: Store,
        clock: C,
        policy: Arc<dyn SelectPolicy>,
        interval: Duration,
        online_threshold: Duration,
        thresholds: StallThresholds,
    ) -> Self {
        Self {
            store,
            clock,
            policy,
            interval,
            online_threshold,
            thresholds,
        }
    }

    /// Run passes on the configured interval until cancelled. The token
    /// is only checked between passes, never mid-mutation.
    pub async fn run(self, cancel: CancellationToken) {
        info!(interval_ms = self.interval.as_millis() as u64, "starting maintenance loop");
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick of an interval fires immediately; consume it so
        // the first real pass happens one interval after startup.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("maintenance loop stopped");
                    return;
                }
                _ = ticker.tick() => {
                    let summary = self.pass();
                    info!(
                        timed_out = summary.timed_out,
                        reclaimed = summary.reclaimed,
                        drained = summary.drained,
                        "maintenance pass complete"
                    );
                }
            }
        }
    }

    /// One reconciliation pass.
    pub fn pass(&self) -> PassSummary {
        let mut summary = PassSummary::default();
        self.sweep_stalled(&mut summary);
        self.reclaim_offline(&mut summary);
        self.drain_backlog(&mut summary);
        summary
    }

    /// Fail active jobs that sat in one status past its threshold.
    fn sweep_stalled(&self, summary: &mut PassSummary) {
        let now_ms = self.clock.epoch_ms();
        for job in self.store.list_jobs(JobFilter::Active) {
            let Some(threshold) = self.thresholds.for_status(job.status) else {
                continue;
            };
            if now_ms.saturating_sub(job.updated_at_ms) <= threshold.as_millis() as u64 {
                continue;
            }
            match self.store.finish_job(
                &job.id,
                JobStatus::Failed,
                Some(TIMEOUT_COMMENT.to_string()),
                now_ms,
            ) {
                Ok(_) => {
                    warn!(job_id = %job.id, status = %job.status, "timed out stalled job");
                    summary.timed_out += 1;
                }
                Err(e) => warn!(job_id = %job.id, error = %e, "could not time out job"),
            }
        }
    }

    /// Fail active jobs whose owning worker is no longer online.
    fn reclaim_offline(&self, summary: &mut PassSummary) {
        let now_ms = self.clock.epoch_ms();
        for job in self.store.list_jobs(JobFilter::Active) {
            let Some(worker_id) = &job.worker_id else {
                continue;
            };
            let online = match self.store.get_worker(worker_id) {
                Ok(worker) => worker.online(now_ms, self.online_threshold),
                Err(_) => false,
            };
            if online {
                continue;
            }
            match self.store.finish_job(
                &job.id,
                JobStatus::Failed,
                Some(OFFLINE_COMMENT.to_string()),
                now_ms,
            ) {
                Ok(_) => {
                    warn!(job_id = %job.id, worker_id = %worker_id, "reclaimed job from offline worker");
                    summary.reclaimed += 1;
                }
                Err(e) => warn!(job_id = %job.id, error = %e, "could not reclaim job"),
            }
        }
    }

    /// Pair backlogged jobs (oldest first) with available workers until
    /// either list empties.
    fn drain_backlog(&self, summary: &mut PassSummary) {
        let now_ms = self.clock.epoch_ms();
        let backlog = self.store.list_jobs(JobFilter::Backlogged);
        if backlog.is_empty() {
            return;
        }
        let mut available = self.store.available_workers(now_ms, self.online_threshold);

        for job in backlog {
            if available.is_empty() {
                debug!("no available workers left, backlog drain stopping");
                return;
            }
            let Some(worker) = self.policy.choose(&available) else {
                return;
            };
            let worker_id = worker.id.clone();

            match self.store.assign_job_to_worker(&job.id, &worker_id, now_ms) {
                Ok(()) => {
                    info!(job_id = %job.id, worker_id = %worker_id, "drained backlogged job");
                    summary.drained += 1;
                }
                Err(e) => {
                    warn!(job_id = %job.id, worker_id = %worker_id, error = %e, "backlog drain assignment failed");
                }
            }
            // Taken or conflicted, this worker is out of the pool either way.
            available.retain(|w| w.id != worker_id);
        }
    }
}

#[cfg(test)]
#[path = "maintenance_tests.rs"]
mod tests;
