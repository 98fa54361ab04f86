// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Intake adaptor: converts externally proposed candidates into jobs.
//!
//! Candidates arrive on a single channel, serializing creation. Each one
//! is filtered by a title pattern, then held until enough approvals
//! arrive; the outcome of every created job is emitted on a report
//! channel for whatever surface (chat bot, log) is watching.

use std::collections::HashMap;

use encore_core::{Clock, JobPayload};
use regex::Regex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::dispatch::{Dispatch, Dispatcher};

/// Titles must look like `player | artist - song [difficulty]`.
pub const DEFAULT_TITLE_PATTERN: &str = r".+\|.+-.+\[.+\]";

/// An externally proposed job: a score post somebody wants recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub id: String,
    pub title: String,
    pub author: String,
}

impl Candidate {
    fn into_payload(self) -> JobPayload {
        JobPayload::new(self.title, self.author)
    }
}

/// Outcome of an approved candidate, for the reporting surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntakeReport {
    Assigned { job_id: String, worker_id: String },
    Backlogged { job_id: String },
    Dropped { job_id: String, reason: String },
}

/// Intake tuning.
#[derive(Debug, Clone)]
pub struct IntakeConfig {
    /// Approvals required before a candidate becomes a job.
    pub approvals_needed: u32,
    /// Candidates whose title does not match are silently skipped.
    pub title_pattern: Regex,
    /// Channel capacity; producers block when it fills.
    pub capacity: usize,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        // The default pattern is a constant known to compile.
        #[allow(clippy::unwrap_used)]
        let title_pattern = Regex::new(DEFAULT_TITLE_PATTERN).unwrap();
        Self {
            approvals_needed: 2,
            title_pattern,
            capacity: 64,
        }
    }
}

enum Msg {
    Candidate(Candidate),
    Approval { id: String },
}

/// Producer handle. Dropping every clone closes the channel; the
/// consumer drains what is queued and exits.
#[derive(Clone)]
pub struct Intake {
    tx: mpsc::Sender<Msg>,
}

impl Intake {
    /// Propose a candidate. Returns false when intake has shut down.
    pub async fn submit(&self, candidate: Candidate) -> bool {
        self.tx.send(Msg::Candidate(candidate)).await.is_ok()
    }

    /// Record one approval for a pending candidate.
    pub async fn approve(&self, id: &str) -> bool {
        self.tx
            .send(Msg::Approval { id: id.to_string() })
            .await
            .is_ok()
    }
}

/// Spawn the intake consumer task.
pub fn spawn<C: Clock + 'static>(
    dispatcher: Dispatcher<C>,
    config: IntakeConfig,
) -> (Intake, mpsc::Receiver<IntakeReport>, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::channel(config.capacity);
    let (report_tx, report_rx) = mpsc::channel(config.capacity);

    let handle = tokio::spawn(async move {
        let mut pending: HashMap<String, (Candidate, u32)> = HashMap::new();

        while let Some(msg) = rx.recv().await {
            match msg {
                Msg::Candidate(candidate) => {
                    if !config.title_pattern.is_match(&candidate.title) {
                        debug!(
                            candidate_id = %candidate.id,
                            title = %candidate.title,
                            "title does not match, skipping"
                        );
                        continue;
                    }
                    info!(
                        candidate_id = %candidate.id,
                        title = %candidate.title,
                        "candidate awaiting approval"
                    );
                    pending
                        .entry(candidate.id.clone())
                        .or_insert((candidate, 0));
                }

                Msg::Approval { id } => {
                    let Some((_, count)) = pending.get_mut(&id) else {
                        continue;
                    };
                    *count += 1;
                    if *count < config.approvals_needed {
                        continue;
                    }
                    let Some((candidate, _)) = pending.remove(&id) else {
                        continue;
                    };

                    let report = match dispatcher.create(&id, candidate.into_payload()) {
                        Ok(Dispatch::Assigned { worker_id }) => IntakeReport::Assigned {
                            job_id: id,
                            worker_id,
                        },
                        Ok(Dispatch::Backlogged) => IntakeReport::Backlogged { job_id: id },
                        Err(e) => {
                            warn!(job_id = %id, error = %e, "intake job creation failed");
                            IntakeReport::Dropped {
                                job_id: id,
                                reason: e.to_string(),
                            }
                        }
                    };
                    let _ = report_tx.send(report).await;
                }
            }
        }
        info!("intake channel closed, consumer exiting");
    });

    (Intake { tx }, report_rx, handle)
}

#[cfg(test)]
#[path = "intake_tests.rs"]
mod tests;
