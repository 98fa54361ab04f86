// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker record and presence predicates.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A remote agent that pulls jobs and reports progress.
///
/// Workers are created on first poll and persist indefinitely; retirement
/// is simply the absence of further polls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Worker {
    /// Client-generated identifier.
    pub id: String,
    /// Most recent heartbeat, epoch milliseconds. Monotonically
    /// non-decreasing.
    pub last_poll_ms: u64,
    /// Job this worker currently owns, if any.
    pub current_job_id: Option<String>,
}

impl Worker {
    pub fn new(id: impl Into<String>, now_ms: u64) -> Self {
        Self {
            id: id.into(),
            last_poll_ms: now_ms,
            current_job_id: None,
        }
    }

    /// Online: last poll within the presence threshold.
    pub fn online(&self, now_ms: u64, threshold: Duration) -> bool {
        now_ms.saturating_sub(self.last_poll_ms) < threshold.as_millis() as u64
    }

    /// Available: online with no job in hand.
    pub fn available(&self, now_ms: u64, threshold: Duration) -> bool {
        self.online(now_ms, threshold) && self.current_job_id.is_none()
    }

    /// Refresh `last_poll_ms`, keeping it monotonically non-decreasing.
    pub fn record_poll(&mut self, now_ms: u64) {
        self.last_poll_ms = self.last_poll_ms.max(now_ms);
    }
}

/// Test builder for [`Worker`] records.
#[cfg(any(test, feature = "test-support"))]
pub struct WorkerBuilder {
    worker: Worker,
}

#[cfg(any(test, feature = "test-support"))]
impl Default for WorkerBuilder {
    fn default() -> Self {
        Self {
            worker: Worker::new("w1", 1_000),
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
impl WorkerBuilder {
    pub fn id(mut self, v: impl Into<String>) -> Self {
        self.worker.id = v.into();
        self
    }

    pub fn last_poll_ms(mut self, v: u64) -> Self {
        self.worker.last_poll_ms = v;
        self
    }

    pub fn current_job_id(mut self, v: impl Into<String>) -> Self {
        self.worker.current_job_id = Some(v.into());
        self
    }

    pub fn build(self) -> Worker {
        self.worker
    }
}

#[cfg(any(test, feature = "test-support"))]
impl Worker {
    /// Create a builder with test defaults.
    pub fn builder() -> WorkerBuilder {
        WorkerBuilder::default()
    }
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
