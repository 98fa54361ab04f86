// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The transactional store facade.
//!
//! Every mutation validates against the current state, appends and
//! flushes the resulting event to the WAL, and only then folds it into
//! the materialized state. The single lock makes each operation a
//! serializable transaction; readers outside the lock see consistent
//! point-in-time copies.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use encore_core::{Job, JobPayload, JobStatus, Worker};
use parking_lot::Mutex;
use tracing::info;

use crate::{DispatchState, Event, JobFilter, Snapshot, StoreError, Wal, WalError};

const WAL_FILE: &str = "events.wal";
const SNAPSHOT_FILE: &str = "snapshot.json";

/// Result of an accepted status report.
#[derive(Debug, Clone)]
pub struct StatusChange {
    /// Status before the report was applied.
    pub from: JobStatus,
    /// The updated job.
    pub job: Job,
}

/// Handle to the dispatch store. Cheap to clone; all clones share the
/// same serialized state.
#[derive(Clone)]
pub struct Store {
    inner: Arc<Mutex<StoreInner>>,
}

struct StoreInner {
    state: DispatchState,
    wal: Wal,
    snapshot_path: PathBuf,
}

impl StoreInner {
    /// Append + flush the event, then fold it into state. The apply runs
    /// only after the event is durable, so a failed write changes
    /// nothing the caller can observe.
    fn commit(&mut self, event: Event) -> Result<(), StoreError> {
        self.wal.append(&event)?;
        self.wal.flush()?;
        self.state.apply(&event);
        Ok(())
    }
}

impl Store {
    /// Open the store rooted at `state_dir`: load the snapshot if one
    /// exists, then replay WAL entries recorded after it.
    pub fn open(state_dir: &Path) -> Result<Self, StoreError> {
        std::fs::create_dir_all(state_dir).map_err(WalError::from)?;
        let wal_path = state_dir.join(WAL_FILE);
        let snapshot_path = state_dir.join(SNAPSHOT_FILE);

        let (mut state, snapshot_seq) = match Snapshot::load(&snapshot_path)? {
            Some(snapshot) => (snapshot.state, snapshot.seq),
            None => (DispatchState::default(), 0),
        };

        let mut wal = Wal::open(&wal_path)?;
        let replay = wal.entries_after(snapshot_seq)?;
        if !replay.is_empty() {
            info!(entries = replay.len(), "replaying WAL entries after snapshot");
        }
        for entry in &replay {
            state.apply(&entry.event);
        }
        wal.align_seq(snapshot_seq);

        Ok(Self {
            inner: Arc::new(Mutex::new(StoreInner {
                state,
                wal,
                snapshot_path,
            })),
        })
    }

    // ---- reads ----

    pub fn get_job(&self, id: &str) -> Result<Job, StoreError> {
        self.inner
            .lock()
            .state
            .jobs
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::JobNotFound(id.to_string()))
    }

    pub fn get_worker(&self, id: &str) -> Result<Worker, StoreError> {
        self.inner
            .lock()
            .state
            .workers
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::WorkerNotFound(id.to_string()))
    }

    pub fn list_jobs(&self, filter: JobFilter) -> Vec<Job> {
        self.inner.lock().state.jobs_matching(filter)
    }

    pub fn list_workers(&self) -> Vec<Worker> {
        let mut workers: Vec<Worker> = self.inner.lock().state.workers.values().cloned().collect();
        workers.sort_by(|a, b| a.id.cmp(&b.id));
        workers
    }

    pub fn available_workers(&self, now_ms: u64, threshold: Duration) -> Vec<Worker> {
        self.inner.lock().state.available_workers(now_ms, threshold)
    }

    /// Consistent point-in-time copy of the whole state, for diagnostics
    /// and invariant checks.
    pub fn state(&self) -> DispatchState {
        self.inner.lock().state.clone()
    }

    // ---- API key allowlist ----

    pub fn key_valid(&self, key: &str) -> bool {
        self.inner.lock().state.keys.contains(key)
    }

    pub fn authorize_key(&self, key: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        if inner.state.keys.contains(key) {
            return Ok(());
        }
        inner.commit(Event::KeyAuthorized {
            key: key.to_string(),
        })
    }

    pub fn revoke_key(&self, key: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        if !inner.state.keys.contains(key) {
            return Ok(());
        }
        inner.commit(Event::KeyRevoked {
            key: key.to_string(),
        })
    }

    // ---- workers ----

    /// The poll upsert: create the worker on first contact, otherwise
    /// refresh its heartbeat. Returns the record after the update.
    /// This is the only way worker records come into being.
    pub fn record_poll(&self, id: &str, now_ms: u64) -> Result<Worker, StoreError> {
        let mut inner = self.inner.lock();
        let event = if inner.state.workers.contains_key(id) {
            Event::WorkerPolled {
                id: id.to_string(),
                at_ms: now_ms,
            }
        } else {
            Event::WorkerRegistered {
                id: id.to_string(),
                at_ms: now_ms,
            }
        };
        inner.commit(event)?;
        inner
            .state
            .workers
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::WorkerNotFound(id.to_string()))
    }

    // ---- jobs ----

    /// Insert a new job awaiting dispatch.
    pub fn create_job(
        &self,
        id: &str,
        payload: JobPayload,
        now_ms: u64,
    ) -> Result<Job, StoreError> {
        let mut inner = self.inner.lock();
        if inner.state.jobs.contains_key(id) {
            return Err(StoreError::DuplicateJob(id.to_string()));
        }
        let job = Job::new(id, payload, now_ms);
        inner.commit(Event::JobCreated { job: job.clone() })?;
        Ok(job)
    }

    /// Atomically bind a backlogged job to a free worker: sets both
    /// pointers and flips the job to `Assigned`.
    pub fn assign_job_to_worker(
        &self,
        job_id: &str,
        worker_id: &str,
        now_ms: u64,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();

        let job = inner
            .state
            .jobs
            .get(job_id)
            .ok_or_else(|| StoreError::JobNotFound(job_id.to_string()))?;
        if job.status != JobStatus::Backlogged || job.worker_id.is_some() {
            return Err(StoreError::AssignConflict(format!(
                "job {job_id} is not awaiting assignment (status {})",
                job.status
            )));
        }

        let worker = inner
            .state
            .workers
            .get(worker_id)
            .ok_or_else(|| StoreError::WorkerNotFound(worker_id.to_string()))?;
        if let Some(current) = &worker.current_job_id {
            return Err(StoreError::AssignConflict(format!(
                "worker {worker_id} already owns job {current}"
            )));
        }

        inner.commit(Event::JobAssigned {
            job_id: job_id.to_string(),
            worker_id: worker_id.to_string(),
            at_ms: now_ms,
        })
    }

    /// Atomically hand the worker its assigned-but-undelivered job,
    /// advancing it to `Pending`. `None` when there is nothing to pull.
    ///
    /// If the write fails the job stays `Assigned` and nothing is
    /// returned, so a poll can never deliver without recording it.
    pub fn deliver_assigned(
        &self,
        worker_id: &str,
        now_ms: u64,
    ) -> Result<Option<Job>, StoreError> {
        let mut inner = self.inner.lock();
        let Some(job_id) = inner.state.assigned_job_for(worker_id).map(|j| j.id.clone()) else {
            return Ok(None);
        };
        inner.commit(Event::JobDelivered {
            job_id: job_id.clone(),
            at_ms: now_ms,
        })?;
        Ok(inner.state.jobs.get(&job_id).cloned())
    }

    /// Terminal write: status + comment + owner pointer clear, one
    /// transaction. Rejects non-terminal targets.
    pub fn finish_job(
        &self,
        job_id: &str,
        status: JobStatus,
        comment: Option<String>,
        now_ms: u64,
    ) -> Result<Job, StoreError> {
        if !status.is_terminal() {
            return Err(StoreError::NotTerminal(status));
        }
        let mut inner = self.inner.lock();
        Self::transition(&mut inner, job_id, status, comment, now_ms)
    }

    /// A worker-reported transition: existence, ownership, and state
    /// machine checks plus the write, as one transaction.
    pub fn report_status(
        &self,
        worker_id: &str,
        job_id: &str,
        status: JobStatus,
        comment: Option<String>,
        now_ms: u64,
    ) -> Result<StatusChange, StoreError> {
        let mut inner = self.inner.lock();

        let worker = inner
            .state
            .workers
            .get(worker_id)
            .ok_or_else(|| StoreError::WorkerNotFound(worker_id.to_string()))?;
        let owned = worker.current_job_id.clone();

        let job = inner
            .state
            .jobs
            .get(job_id)
            .ok_or_else(|| StoreError::JobNotFound(job_id.to_string()))?;
        let from = job.status;

        if owned.as_deref() != Some(job_id) {
            return Err(StoreError::NotOwner {
                worker_id: worker_id.to_string(),
                job_id: job_id.to_string(),
            });
        }

        let job = Self::transition(&mut inner, job_id, status, comment, now_ms)?;
        Ok(StatusChange { from, job })
    }

    fn transition(
        inner: &mut StoreInner,
        job_id: &str,
        status: JobStatus,
        comment: Option<String>,
        now_ms: u64,
    ) -> Result<Job, StoreError> {
        let job = inner
            .state
            .jobs
            .get(job_id)
            .ok_or_else(|| StoreError::JobNotFound(job_id.to_string()))?;
        let from = job.status;
        if !from.can_transition_to(status) {
            return Err(StoreError::InvalidTransition { from, to: status });
        }

        let event = if status.is_terminal() {
            Event::JobFinished {
                job_id: job_id.to_string(),
                status,
                comment,
                at_ms: now_ms,
            }
        } else {
            Event::JobProgressed {
                job_id: job_id.to_string(),
                status,
                comment,
                at_ms: now_ms,
            }
        };
        inner.commit(event)?;

        inner
            .state
            .jobs
            .get(job_id)
            .cloned()
            .ok_or_else(|| StoreError::JobNotFound(job_id.to_string()))
    }

    // ---- durability ----

    /// Write a snapshot of the current state and compact the WAL down to
    /// entries newer than it.
    pub fn checkpoint(&self) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        let seq = inner.wal.write_seq();
        Snapshot::save(&inner.snapshot_path, seq, &inner.state)?;
        inner.wal.truncate_before(seq + 1)?;
        info!(seq, "checkpointed store");
        Ok(())
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
