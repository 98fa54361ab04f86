// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `POST /poll`: heartbeat and pull, one call doing both.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use encore_core::{Clock, JobPayload, JobStatus};

use super::{bad_request, parse_body, store_failure, ServeCtx};

const ENDPOINT: &str = "/poll";

#[derive(Debug, Deserialize)]
struct PollBody {
    worker: Option<String>,
}

/// The job as delivered to a worker: id plus the pass-through payload.
#[derive(Debug, Serialize)]
struct JobBody {
    id: String,
    #[serde(flatten)]
    payload: JobPayload,
}

pub(super) async fn handle<C: Clock + 'static>(
    State(ctx): State<Arc<ServeCtx<C>>>,
    body: Bytes,
) -> Response {
    let body: PollBody = match parse_body(ENDPOINT, &body) {
        Ok(body) => body,
        Err(response) => return response,
    };
    let Some(worker_id) = body.worker else {
        return bad_request("missing required field: 'worker'");
    };

    // Heartbeat first: the upsert refreshes last_poll even when the
    // worker is mid-job, so in-flight work does not read as offline.
    let now_ms = ctx.clock.epoch_ms();
    let worker = match ctx.store.record_poll(&worker_id, now_ms) {
        Ok(worker) => worker,
        Err(e) => return store_failure(ENDPOINT, &e),
    };

    // A held job that is already past `Assigned` was pulled on an
    // earlier poll and is never redelivered. A held job still in
    // `Assigned` is this worker's own undelivered assignment and falls
    // through to delivery below.
    if let Some(held_id) = &worker.current_job_id {
        let in_flight = ctx
            .store
            .get_job(held_id)
            .is_ok_and(|job| job.status > JobStatus::Assigned);
        if in_flight {
            debug!(endpoint = ENDPOINT, worker_id = %worker_id, job_id = %held_id, "worker already has a job");
            return StatusCode::NO_CONTENT.into_response();
        }
    }

    match ctx.store.deliver_assigned(&worker_id, now_ms) {
        Ok(Some(job)) => {
            info!(endpoint = ENDPOINT, job_id = %job.id, worker_id = %worker_id, "delivering job");
            (
                StatusCode::OK,
                Json(JobBody {
                    id: job.id,
                    payload: job.payload,
                }),
            )
                .into_response()
        }
        Ok(None) => {
            debug!(endpoint = ENDPOINT, worker_id = %worker_id, "no new job");
            StatusCode::NO_CONTENT.into_response()
        }
        // At-most-once delivery: if the transition did not commit, the
        // job must not go out. The next maintenance pass recovers it.
        Err(e) => {
            warn!(endpoint = ENDPOINT, worker_id = %worker_id, error = %e, "delivery write failed, answering no work");
            StatusCode::NO_CONTENT.into_response()
        }
    }
}

#[cfg(test)]
#[path = "poll_tests.rs"]
mod tests;
