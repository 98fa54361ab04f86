// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `POST /jobs/status`: worker-reported status transitions.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use tracing::{debug, info};

use encore_core::{Clock, JobStatus};
use encore_storage::StoreError;

use super::{bad_request, parse_body, store_failure, ServeCtx};

const ENDPOINT: &str = "/jobs/status";

#[derive(Debug, Deserialize)]
struct StatusBody {
    worker: Option<String>,
    job: Option<String>,
    status: Option<i64>,
    comment: Option<String>,
}

pub(super) async fn handle<C: Clock + 'static>(
    State(ctx): State<Arc<ServeCtx<C>>>,
    body: Bytes,
) -> Response {
    let body: StatusBody = match parse_body(ENDPOINT, &body) {
        Ok(body) => body,
        Err(response) => return response,
    };
    let Some(worker_id) = body.worker else {
        return bad_request("missing required field: 'worker'");
    };
    let Some(job_id) = body.job else {
        return bad_request("missing required field: 'job'");
    };
    let Some(code) = body.status else {
        return bad_request("missing required field: 'status'");
    };

    // Workers may only report acknowledged and later; delivery states
    // belong to the server.
    let status = u8::try_from(code).ok().and_then(JobStatus::from_code);
    let Some(status) = status.filter(|s| s.is_reportable()) else {
        debug!(endpoint = ENDPOINT, code, "invalid status code");
        return bad_request("invalid status");
    };

    let now_ms = ctx.clock.epoch_ms();
    match ctx
        .store
        .report_status(&worker_id, &job_id, status, body.comment, now_ms)
    {
        Ok(change) => {
            info!(
                endpoint = ENDPOINT,
                job_id = %change.job.id,
                worker_id = %worker_id,
                from = %change.from,
                to = %change.job.status,
                "updated job status"
            );
            StatusCode::OK.into_response()
        }
        Err(StoreError::WorkerNotFound(_)) => bad_request("worker is not registered"),
        Err(StoreError::JobNotFound(_)) => bad_request("no such job"),
        Err(StoreError::NotOwner { .. }) => bad_request("worker does not own that job"),
        Err(StoreError::InvalidTransition { .. }) => bad_request("disallowed status transition"),
        Err(e) if e.is_client_error() => bad_request(e.to_string()),
        Err(e) => store_failure(ENDPOINT, &e),
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
