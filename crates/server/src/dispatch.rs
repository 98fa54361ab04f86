// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job intake and worker selection.

use std::sync::Arc;
use std::time::Duration;

use encore_core::{Clock, JobPayload, Worker};
use encore_storage::{Store, StoreError};
use rand::seq::IndexedRandom;
use tracing::{debug, info};

/// How a created job was placed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Bound to a worker immediately.
    Assigned { worker_id: String },
    /// No worker could take it; the maintenance loop will drain it.
    Backlogged,
}

/// Picks the worker a job gets bound to.
///
/// Implementations must be pure selection: no side effects, no I/O.
/// Swapping in a least-recently-used policy is a drop-in replacement.
pub trait SelectPolicy: Send + Sync {
    /// Pick one of the candidate workers; `None` when the slice is empty.
    fn choose<'a>(&self, candidates: &'a [Worker]) -> Option<&'a Worker>;
}

/// Uniform random selection over the available workers.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomSelect;

impl SelectPolicy for RandomSelect {
    fn choose<'a>(&self, candidates: &'a [Worker]) -> Option<&'a Worker> {
        candidates.choose(&mut rand::rng())
    }
}

/// Retries when a selected worker takes another job concurrently.
const ASSIGN_ATTEMPTS: usize = 3;

/// Creates jobs and binds them to available workers.
#[derive(Clone)]
pub struct Dispatcher<C: Clock> {
    store: Store,
    policy: Arc<dyn SelectPolicy>,
    clock: C,
    online_threshold: Duration,
}

impl<C: Clock> Dispatcher<C> {
    pub fn new(
        store: Store,
        policy: Arc<dyn SelectPolicy>,
        clock: C,
        online_threshold: Duration,
    ) -> Self {
        Self {
            store,
            policy,
            clock,
            online_threshold,
        }
    }

    /// Insert a new job and dispatch it: assign to an available worker,
    /// or leave it backlogged when none can take it.
    ///
    /// Duplicate ids are rejected without touching existing state.
    pub fn create(&self, id: &str, payload: JobPayload) -> Result<Dispatch, StoreError> {
        let now_ms = self.clock.epoch_ms();
        self.store.create_job(id, payload, now_ms)?;

        for _ in 0..ASSIGN_ATTEMPTS {
            let candidates = self.store.available_workers(now_ms, self.online_threshold);
            let Some(worker) = self.policy.choose(&candidates) else {
                info!(job_id = id, "no workers available, job backlogged");
                return Ok(Dispatch::Backlogged);
            };
            let worker_id = worker.id.clone();

            match self.store.assign_job_to_worker(id, &worker_id, now_ms) {
                Ok(()) => {
                    info!(job_id = id, worker_id = %worker_id, "assigned job");
                    return Ok(Dispatch::Assigned { worker_id });
                }
                Err(StoreError::AssignConflict(reason)) => {
                    debug!(job_id = id, reason, "assignment raced, retrying selection");
                }
                Err(e) => return Err(e),
            }
        }

        info!(job_id = id, "assignment attempts exhausted, job backlogged");
        Ok(Dispatch::Backlogged)
    }
}

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;
