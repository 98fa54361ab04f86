// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Spec harness: the full dispatch stack on a fake clock.

use std::sync::Arc;
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use tempfile::{tempdir, TempDir};
use tower::ServiceExt;

use encore_core::FakeClock;
use encore_server::{
    router, Dispatcher, Maintenance, RandomSelect, SelectPolicy, ServeCtx, StallThresholds,
};
use encore_storage::Store;

pub(crate) const KEY: &str = "spec-key";
pub(crate) const ONLINE_THRESHOLD: Duration = Duration::from_secs(30);

pub(crate) struct World {
    // Keeps the state directory alive for the test's duration.
    _dir: TempDir,
    pub store: Store,
    pub clock: FakeClock,
    pub router: Router,
    maintenance: Maintenance<FakeClock>,
}

impl World {
    /// One maintenance pass, as if the interval elapsed.
    pub fn maintenance_tick(&self) {
        self.maintenance.pass();
    }

    /// Tear the stack down, keeping the state directory for reopening.
    pub fn into_state_dir(self) -> TempDir {
        self._dir
    }
}

pub(crate) fn world() -> World {
    let dir = tempdir().unwrap();
    let store = Store::open(dir.path()).unwrap();
    store.authorize_key(KEY).unwrap();

    let clock = FakeClock::new();
    let policy: Arc<dyn SelectPolicy> = Arc::new(RandomSelect);
    let dispatcher = Dispatcher::new(
        store.clone(),
        Arc::clone(&policy),
        clock.clone(),
        ONLINE_THRESHOLD,
    );
    let maintenance = Maintenance::new(
        store.clone(),
        clock.clone(),
        policy,
        Duration::from_secs(600),
        ONLINE_THRESHOLD,
        StallThresholds::default(),
    );
    let ctx = Arc::new(ServeCtx {
        store: store.clone(),
        dispatcher,
        clock: clock.clone(),
        online_threshold: ONLINE_THRESHOLD,
    });

    World {
        _dir: dir,
        store,
        clock: clock.clone(),
        router: router(ctx),
        maintenance,
    }
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Bytes) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, body)
}

async fn post(router: &Router, path: &str, body: serde_json::Value) -> (StatusCode, Bytes) {
    let request = Request::builder()
        .method("POST")
        .uri(path)
        .header(header::AUTHORIZATION, KEY)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(router, request).await
}

/// Poll as `worker`; returns the status and, on 200, the delivered job.
pub(crate) async fn poll(world: &World, worker: &str) -> (StatusCode, Option<serde_json::Value>) {
    let (status, body) = post(
        &world.router,
        "/poll",
        serde_json::json!({ "worker": worker }),
    )
    .await;
    let job = (status == StatusCode::OK).then(|| serde_json::from_slice(&body).unwrap());
    (status, job)
}

/// Create a job through the intake endpoint.
pub(crate) async fn create_job(
    world: &World,
    id: &str,
) -> (StatusCode, Option<serde_json::Value>) {
    let (status, body) = post(
        &world.router,
        "/jobs/create",
        serde_json::json!({ "id": id, "title": "p | a - s [d]", "author": "poster" }),
    )
    .await;
    let response = (status == StatusCode::OK).then(|| serde_json::from_slice(&body).unwrap());
    (status, response)
}

/// Report a status transition for a job.
pub(crate) async fn report(
    world: &World,
    worker: &str,
    job: &str,
    code: u8,
    comment: Option<&str>,
) -> StatusCode {
    let mut body = serde_json::json!({ "worker": worker, "job": job, "status": code });
    if let Some(comment) = comment {
        body["comment"] = serde_json::Value::String(comment.to_string());
    }
    let (status, _) = post(&world.router, "/jobs/status", body).await;
    status
}
