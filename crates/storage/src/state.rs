// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Materialized state from WAL replay.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use encore_core::{Job, JobStatus, Worker};
use serde::{Deserialize, Serialize};

use crate::Event;

/// Job listing filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobFilter {
    /// Worker set and status between `Assigned` and `Uploading`.
    Active,
    /// Awaiting assignment.
    Backlogged,
    /// Successful or failed.
    Terminal,
}

/// Materialized state built from WAL events.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct DispatchState {
    #[serde(default)]
    pub jobs: HashMap<String, Job>,
    #[serde(default)]
    pub workers: HashMap<String, Worker>,
    /// API key allowlist.
    #[serde(default)]
    pub keys: HashSet<String>,
}

impl DispatchState {
    /// Apply an event to derive state changes.
    ///
    /// # Idempotency Requirement
    ///
    /// **All event handlers MUST be idempotent.** Applying the same event
    /// twice must produce the same state as applying it once; recovery
    /// may replay events that were already folded into a snapshot.
    ///
    /// Guidelines:
    /// - Use assignment instead of mutation (`+=`)
    /// - Guard inserts with existence checks
    /// - Guard status flips with current-status checks
    /// - Timestamps only ever move forward (`Job::touch`,
    ///   `Worker::record_poll`)
    pub fn apply(&mut self, event: &Event) {
        match event {
            Event::WorkerRegistered { id, at_ms } => {
                self.workers
                    .entry(id.clone())
                    .or_insert_with(|| Worker::new(id.clone(), *at_ms));
            }

            Event::WorkerPolled { id, at_ms } => {
                if let Some(worker) = self.workers.get_mut(id) {
                    worker.record_poll(*at_ms);
                }
            }

            Event::JobCreated { job } => {
                if !self.jobs.contains_key(&job.id) {
                    self.jobs.insert(job.id.clone(), job.clone());
                }
            }

            Event::JobAssigned {
                job_id,
                worker_id,
                at_ms,
            } => {
                if let Some(job) = self.jobs.get_mut(job_id) {
                    job.worker_id = Some(worker_id.clone());
                    job.status = JobStatus::Assigned;
                    job.touch(*at_ms);
                }
                if let Some(worker) = self.workers.get_mut(worker_id) {
                    worker.current_job_id = Some(job_id.clone());
                }
            }

            Event::JobDelivered { job_id, at_ms } => {
                if let Some(job) = self.jobs.get_mut(job_id) {
                    if job.status == JobStatus::Assigned {
                        job.status = JobStatus::Pending;
                        job.touch(*at_ms);
                    }
                }
            }

            Event::JobProgressed {
                job_id,
                status,
                comment,
                at_ms,
            } => {
                if let Some(job) = self.jobs.get_mut(job_id) {
                    job.status = *status;
                    job.comment = comment.clone();
                    job.touch(*at_ms);
                }
            }

            Event::JobFinished {
                job_id,
                status,
                comment,
                at_ms,
            } => {
                let owner = match self.jobs.get_mut(job_id) {
                    Some(job) => {
                        job.status = *status;
                        job.comment = comment.clone();
                        job.touch(*at_ms);
                        job.worker_id.clone()
                    }
                    None => None,
                };
                if let Some(worker) = owner.and_then(|id| self.workers.get_mut(&id)) {
                    if worker.current_job_id.as_deref() == Some(job_id) {
                        worker.current_job_id = None;
                    }
                }
            }

            Event::KeyAuthorized { key } => {
                self.keys.insert(key.clone());
            }

            Event::KeyRevoked { key } => {
                self.keys.remove(key);
            }
        }
    }

    /// Jobs matching `filter`, oldest first (creation time, then id).
    pub fn jobs_matching(&self, filter: JobFilter) -> Vec<Job> {
        let mut jobs: Vec<Job> = self
            .jobs
            .values()
            .filter(|j| match filter {
                JobFilter::Active => j.worker_id.is_some() && j.status.is_active(),
                JobFilter::Backlogged => j.status == JobStatus::Backlogged,
                JobFilter::Terminal => j.status.is_terminal(),
            })
            .cloned()
            .collect();
        jobs.sort_by(|a, b| {
            a.created_at_ms
                .cmp(&b.created_at_ms)
                .then_with(|| a.id.cmp(&b.id))
        });
        jobs
    }

    /// The job bound to `worker_id` that the worker has not pulled yet.
    pub fn assigned_job_for(&self, worker_id: &str) -> Option<&Job> {
        self.jobs.values().find(|j| {
            j.status == JobStatus::Assigned && j.worker_id.as_deref() == Some(worker_id)
        })
    }

    /// Online workers with no current job, sorted by id.
    pub fn available_workers(&self, now_ms: u64, threshold: Duration) -> Vec<Worker> {
        let mut workers: Vec<Worker> = self
            .workers
            .values()
            .filter(|w| w.available(now_ms, threshold))
            .cloned()
            .collect();
        workers.sort_by(|a, b| a.id.cmp(&b.id));
        workers
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
