// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Operator read endpoints: job and worker listings.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use encore_core::Clock;
use encore_storage::JobFilter;

use super::{bad_request, ServeCtx};

#[derive(Debug, Deserialize)]
pub(super) struct ListQuery {
    filter: Option<String>,
}

/// `GET /jobs?filter=active|backlog|terminal` (default: active).
pub(super) async fn list_jobs<C: Clock + 'static>(
    State(ctx): State<Arc<ServeCtx<C>>>,
    Query(query): Query<ListQuery>,
) -> Response {
    let filter = match query.filter.as_deref() {
        None | Some("active") => JobFilter::Active,
        Some("backlog") | Some("backlogged") => JobFilter::Backlogged,
        Some("terminal") => JobFilter::Terminal,
        Some(other) => return bad_request(format!("unknown filter: {other}")),
    };
    Json(ctx.store.list_jobs(filter)).into_response()
}

/// `GET /workers?filter=online|all` (default: all).
pub(super) async fn list_workers<C: Clock + 'static>(
    State(ctx): State<Arc<ServeCtx<C>>>,
    Query(query): Query<ListQuery>,
) -> Response {
    let workers = ctx.store.list_workers();
    match query.filter.as_deref() {
        None | Some("all") => Json(workers).into_response(),
        Some("online") => {
            let now_ms = ctx.clock.epoch_ms();
            let online: Vec<_> = workers
                .into_iter()
                .filter(|w| w.online(now_ms, ctx.online_threshold))
                .collect();
            Json(online).into_response()
        }
        Some(other) => bad_request(format!("unknown filter: {other}")),
    }
}

#[cfg(test)]
#[path = "admin_tests.rs"]
mod tests;
