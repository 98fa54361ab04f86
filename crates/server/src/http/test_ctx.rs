// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for endpoint tests.

use std::sync::Arc;
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use tempfile::{tempdir, TempDir};
use tower::ServiceExt;

use encore_core::FakeClock;
use encore_storage::Store;

use crate::dispatch::{Dispatcher, RandomSelect, SelectPolicy};
use crate::http::{router, ServeCtx};

pub(crate) const KEY: &str = "test-key";
pub(crate) const THRESHOLD: Duration = Duration::from_secs(30);

pub(crate) struct Harness {
    // Held so the state directory outlives the store.
    #[allow(dead_code)]
    pub dir: TempDir,
    pub store: Store,
    pub clock: FakeClock,
    pub router: Router,
}

pub(crate) fn harness() -> Harness {
    let dir = tempdir().unwrap();
    let store = Store::open(dir.path()).unwrap();
    store.authorize_key(KEY).unwrap();
    let clock = FakeClock::new();
    let policy: Arc<dyn SelectPolicy> = Arc::new(RandomSelect);
    let dispatcher = Dispatcher::new(store.clone(), policy, clock.clone(), THRESHOLD);
    let ctx = Arc::new(ServeCtx {
        store: store.clone(),
        dispatcher,
        clock: clock.clone(),
        online_threshold: THRESHOLD,
    });
    Harness {
        dir,
        store,
        clock,
        router: router(ctx),
    }
}

pub(crate) async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Bytes) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, body)
}

pub(crate) async fn post_raw(
    router: &Router,
    path: &str,
    key: Option<&str>,
    body: &str,
) -> (StatusCode, Bytes) {
    let mut builder = Request::builder()
        .method("POST")
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(key) = key {
        builder = builder.header(header::AUTHORIZATION, key);
    }
    let request = builder.body(Body::from(body.to_string())).unwrap();
    send(router, request).await
}

/// Authenticated POST with a JSON body.
pub(crate) async fn post(
    router: &Router,
    path: &str,
    body: serde_json::Value,
) -> (StatusCode, Bytes) {
    post_raw(router, path, Some(KEY), &body.to_string()).await
}

/// Authenticated GET.
pub(crate) async fn get(router: &Router, path: &str) -> (StatusCode, Bytes) {
    let request = Request::builder()
        .method("GET")
        .uri(path)
        .header(header::AUTHORIZATION, KEY)
        .body(Body::empty())
        .unwrap();
    send(router, request).await
}

pub(crate) fn json(bytes: &Bytes) -> serde_json::Value {
    serde_json::from_slice(bytes).unwrap()
}

/// Poll as `worker`, asserting the expected status code. Returns the
/// body for 200 responses.
pub(crate) async fn poll(
    harness: &Harness,
    worker: &str,
    expect: StatusCode,
) -> Option<serde_json::Value> {
    let (status, body) = post(
        &harness.router,
        "/poll",
        serde_json::json!({ "worker": worker }),
    )
    .await;
    assert_eq!(status, expect, "poll body: {}", String::from_utf8_lossy(&body));
    (expect == StatusCode::OK).then(|| json(&body))
}
