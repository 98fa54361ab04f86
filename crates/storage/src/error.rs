// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Store error taxonomy.

use encore_core::JobStatus;
use thiserror::Error;

use crate::{SnapshotError, WalError};

/// Errors surfaced by [`crate::Store`] operations.
///
/// `JobNotFound` and `WorkerNotFound` are sentinels: the worker-facing
/// surface maps them to client errors, everything I/O-shaped maps to a
/// server error.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no job found: {0}")]
    JobNotFound(String),

    #[error("worker not found: {0}")]
    WorkerNotFound(String),

    #[error("job already exists: {0}")]
    DuplicateJob(String),

    #[error("worker {worker_id} does not own job {job_id}")]
    NotOwner { worker_id: String, job_id: String },

    #[error("invalid status transition: {from} -> {to}")]
    InvalidTransition { from: JobStatus, to: JobStatus },

    #[error("status {0} is not terminal")]
    NotTerminal(JobStatus),

    #[error("assignment conflict: {0}")]
    AssignConflict(String),

    #[error("WAL error: {0}")]
    Wal(#[from] WalError),

    #[error("snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),
}

impl StoreError {
    /// True for errors caused by the caller asserting state the store
    /// denies, as opposed to storage failures.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, StoreError::Wal(_) | StoreError::Snapshot(_))
    }
}
