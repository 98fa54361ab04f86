// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persisted state-change events.
//!
//! Events are facts about what happened; [`crate::DispatchState`] is
//! derived by folding them. Validation happens before an event is
//! emitted; an event in the WAL is always applicable.

use encore_core::{Job, JobStatus};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A worker's first successful poll created its record.
    WorkerRegistered { id: String, at_ms: u64 },

    /// Heartbeat: refresh a worker's `last_poll`.
    WorkerPolled { id: String, at_ms: u64 },

    /// A job record was inserted (always backlogged, no owner).
    JobCreated { job: Job },

    /// A backlogged job was bound to a free worker.
    JobAssigned {
        job_id: String,
        worker_id: String,
        at_ms: u64,
    },

    /// An assigned job was handed to its worker by the poll endpoint.
    JobDelivered { job_id: String, at_ms: u64 },

    /// A worker reported non-terminal progress.
    JobProgressed {
        job_id: String,
        status: JobStatus,
        comment: Option<String>,
        at_ms: u64,
    },

    /// A job reached a terminal status; the owner's pointer is cleared.
    JobFinished {
        job_id: String,
        status: JobStatus,
        comment: Option<String>,
        at_ms: u64,
    },

    /// An API key was added to the allowlist.
    KeyAuthorized { key: String },

    /// An API key was removed from the allowlist.
    KeyRevoked { key: String },
}
