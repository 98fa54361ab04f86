// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `POST /jobs/create`: programmatic job intake.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use encore_core::{Clock, JobPayload};
use encore_storage::StoreError;

use super::{bad_request, parse_body, store_failure, ServeCtx};
use crate::dispatch::Dispatch;

const ENDPOINT: &str = "/jobs/create";

#[derive(Debug, Deserialize)]
struct CreateBody {
    id: Option<String>,
    #[serde(flatten)]
    payload: JobPayload,
}

#[derive(Debug, Serialize)]
struct CreateResponse {
    disposition: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    worker: Option<String>,
}

pub(super) async fn handle<C: Clock + 'static>(
    State(ctx): State<Arc<ServeCtx<C>>>,
    body: Bytes,
) -> Response {
    let body: CreateBody = match parse_body(ENDPOINT, &body) {
        Ok(body) => body,
        Err(response) => return response,
    };
    let Some(id) = body.id else {
        return bad_request("missing required field: 'id'");
    };

    match ctx.dispatcher.create(&id, body.payload) {
        Ok(Dispatch::Assigned { worker_id }) => (
            StatusCode::OK,
            Json(CreateResponse {
                disposition: "assigned",
                worker: Some(worker_id),
            }),
        )
            .into_response(),
        Ok(Dispatch::Backlogged) => (
            StatusCode::OK,
            Json(CreateResponse {
                disposition: "backlogged",
                worker: None,
            }),
        )
            .into_response(),
        Err(StoreError::DuplicateJob(_)) => {
            (StatusCode::CONFLICT, "job already exists").into_response()
        }
        Err(e) if e.is_client_error() => bad_request(e.to_string()),
        Err(e) => store_failure(ENDPOINT, &e),
    }
}

#[cfg(test)]
#[path = "create_tests.rs"]
mod tests;
