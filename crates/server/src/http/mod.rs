// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker-facing HTTP surface.
//!
//! Every route sits behind the API-key layer: the `Authorization` header
//! must carry a key from the store's allowlist. Handlers parse bodies
//! themselves so malformed input maps to the protocol's plain-text 400s.

mod admin;
mod create;
mod poll;
mod status;

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::de::DeserializeOwned;
use tracing::{debug, error, warn};

use encore_core::Clock;
use encore_storage::{Store, StoreError};

use crate::dispatch::Dispatcher;

/// Per-request deadline; handlers never block on anything slower than
/// the store, so hitting this means something is wedged.
const REQUEST_DEADLINE: Duration = Duration::from_secs(10);

/// Shared server context for all request handlers.
pub struct ServeCtx<C: Clock> {
    pub store: Store,
    pub dispatcher: Dispatcher<C>,
    pub clock: C,
    pub online_threshold: Duration,
}

/// Build the router over a shared context.
pub fn router<C: Clock + 'static>(ctx: Arc<ServeCtx<C>>) -> Router {
    Router::new()
        .route("/poll", post(poll::handle::<C>))
        .route("/jobs/status", post(status::handle::<C>))
        .route("/jobs/create", post(create::handle::<C>))
        .route("/jobs", get(admin::list_jobs::<C>))
        .route("/workers", get(admin::list_workers::<C>))
        .route_layer(middleware::from_fn_with_state(
            ctx.clone(),
            require_api_key::<C>,
        ))
        .layer(middleware::from_fn(request_deadline))
        .with_state(ctx)
}

/// Bound every request's handling time.
async fn request_deadline(req: Request, next: Next) -> Response {
    let path = req.uri().path().to_string();
    match tokio::time::timeout(REQUEST_DEADLINE, next.run(req)).await {
        Ok(response) => response,
        Err(_) => {
            warn!(endpoint = %path, "request exceeded deadline");
            (StatusCode::INTERNAL_SERVER_ERROR, "request timed out").into_response()
        }
    }
}

/// Reject requests whose `Authorization` header is not an allowlisted key.
async fn require_api_key<C: Clock + 'static>(
    State(ctx): State<Arc<ServeCtx<C>>>,
    req: Request,
    next: Next,
) -> Response {
    let authorized = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|key| ctx.store.key_valid(key));

    if !authorized {
        return (StatusCode::UNAUTHORIZED, "unauthorized").into_response();
    }
    next.run(req).await
}

/// Plain-text client error.
pub(crate) fn bad_request(message: impl Into<String>) -> Response {
    (StatusCode::BAD_REQUEST, message.into()).into_response()
}

/// Log a storage failure with its endpoint and answer 500.
pub(crate) fn store_failure(endpoint: &'static str, err: &StoreError) -> Response {
    error!(endpoint, error = %err, "store error");
    (StatusCode::INTERNAL_SERVER_ERROR, "storage error").into_response()
}

/// Parse a JSON body, mapping failures to the protocol's 400 text.
pub(crate) fn parse_body<T: DeserializeOwned>(
    endpoint: &'static str,
    bytes: &[u8],
) -> Result<T, Response> {
    serde_json::from_slice(bytes).map_err(|e| {
        debug!(endpoint, error = %e, "invalid request body");
        bad_request("invalid request body")
    })
}

#[cfg(test)]
pub(crate) mod test_ctx;

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
