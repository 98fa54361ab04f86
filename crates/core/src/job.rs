// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job record and status state machine.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a job.
///
/// The discriminants are the wire encoding workers use when reporting
/// transitions; the values are frozen and must never be renumbered.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum JobStatus {
    /// Waiting for a worker to free up.
    Backlogged = 1,
    /// Bound to a worker that has not pulled it yet.
    Assigned = 2,
    /// Delivered to the worker via poll.
    Pending = 3,
    /// Worker has begun preparation.
    Acknowledged = 4,
    /// Worker is capturing the replay.
    Recording = 5,
    /// Worker is uploading the artifact.
    Uploading = 6,
    /// Terminal: completed without error.
    Successful = 7,
    /// Terminal: gave up, with a reason.
    Failed = 8,
}

crate::simple_display! {
    JobStatus {
        Backlogged => "backlogged",
        Assigned => "assigned",
        Pending => "pending",
        Acknowledged => "acknowledged",
        Recording => "recording",
        Uploading => "uploading",
        Successful => "successful",
        Failed => "failed",
    }
}

impl JobStatus {
    /// Wire integer for this status.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Decode a wire integer; `None` when out of range.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(JobStatus::Backlogged),
            2 => Some(JobStatus::Assigned),
            3 => Some(JobStatus::Pending),
            4 => Some(JobStatus::Acknowledged),
            5 => Some(JobStatus::Recording),
            6 => Some(JobStatus::Uploading),
            7 => Some(JobStatus::Successful),
            8 => Some(JobStatus::Failed),
            _ => None,
        }
    }

    /// Terminal statuses are sinks; no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Successful | JobStatus::Failed)
    }

    /// Active: bound to a worker and not yet terminal.
    pub fn is_active(self) -> bool {
        JobStatus::Assigned <= self && self <= JobStatus::Uploading
    }

    /// Statuses a worker may legally put in a status report.
    pub fn is_reportable(self) -> bool {
        self >= JobStatus::Acknowledged
    }

    /// Whether the state machine permits `self -> next`.
    ///
    /// Worker-driven progress may skip forward but never moves backward,
    /// and repeating the current status is not a transition.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        use JobStatus::*;
        if self.is_terminal() {
            return false;
        }
        match next {
            Failed => true,
            Successful => self != Backlogged,
            Assigned => self == Backlogged,
            Pending => self == Assigned,
            Acknowledged | Recording | Uploading => {
                matches!(self, Pending | Acknowledged | Recording) && next > self
            }
            Backlogged => false,
        }
    }
}

/// Worker-facing job metadata.
///
/// The core passes this through untouched; `extra` carries any
/// supplementary fields the producer attached.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobPayload {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl JobPayload {
    pub fn new(title: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            extra: serde_json::Map::new(),
        }
    }
}

/// A record-and-upload job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// Externally supplied identifier.
    pub id: String,
    pub payload: JobPayload,
    /// Owning worker; set on assignment, never reassigned while
    /// non-terminal. Kept on terminal jobs for audit.
    pub worker_id: Option<String>,
    pub status: JobStatus,
    /// Reason accompanying the latest transition (failure cause, etc.).
    pub comment: Option<String>,
    pub created_at_ms: u64,
    pub updated_at_ms: u64,
}

impl Job {
    /// Create a new job awaiting dispatch.
    pub fn new(id: impl Into<String>, payload: JobPayload, now_ms: u64) -> Self {
        Self {
            id: id.into(),
            payload,
            worker_id: None,
            status: JobStatus::Backlogged,
            comment: None,
            created_at_ms: now_ms,
            updated_at_ms: now_ms,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Refresh `updated_at_ms`, keeping it monotonically non-decreasing.
    pub fn touch(&mut self, now_ms: u64) {
        self.updated_at_ms = self.updated_at_ms.max(now_ms);
    }
}

/// Test builder for [`Job`] records.
#[cfg(any(test, feature = "test-support"))]
pub struct JobBuilder {
    job: Job,
}

#[cfg(any(test, feature = "test-support"))]
impl Default for JobBuilder {
    fn default() -> Self {
        Self {
            job: Job::new("job-1", JobPayload::new("test title", "test author"), 1_000),
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
impl JobBuilder {
    pub fn id(mut self, v: impl Into<String>) -> Self {
        self.job.id = v.into();
        self
    }

    pub fn status(mut self, v: JobStatus) -> Self {
        self.job.status = v;
        self
    }

    pub fn worker_id(mut self, v: impl Into<String>) -> Self {
        self.job.worker_id = Some(v.into());
        self
    }

    pub fn comment(mut self, v: impl Into<String>) -> Self {
        self.job.comment = Some(v.into());
        self
    }

    pub fn created_at_ms(mut self, v: u64) -> Self {
        self.job.created_at_ms = v;
        self
    }

    pub fn updated_at_ms(mut self, v: u64) -> Self {
        self.job.updated_at_ms = v;
        self
    }

    pub fn build(self) -> Job {
        self.job
    }
}

#[cfg(any(test, feature = "test-support"))]
impl Job {
    /// Create a builder with test defaults.
    pub fn builder() -> JobBuilder {
        JobBuilder::default()
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
