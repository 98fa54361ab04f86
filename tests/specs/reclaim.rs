// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reclaim specs: stalled jobs and vanished workers.

use std::time::Duration;

use axum::http::StatusCode;
use encore_core::JobStatus;

use super::prelude::*;

#[tokio::test]
async fn recording_timeout_reclaim() {
    let world = world();
    poll(&world, "w1").await;
    create_job(&world, "j1").await;
    poll(&world, "w1").await;
    assert_eq!(report(&world, "w1", "j1", 5, None).await, StatusCode::OK);

    // The worker keeps polling but the recording never progresses.
    world.clock.advance(Duration::from_secs(31 * 60));
    let (status, _) = poll(&world, "w1").await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    world.maintenance_tick();

    let job = world.store.get_job("j1").unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.comment.as_deref(), Some("timeout"));
    assert_eq!(world.store.get_worker("w1").unwrap().current_job_id, None);
}

#[tokio::test]
async fn offline_worker_reclaim() {
    let world = world();
    poll(&world, "w1").await;
    create_job(&world, "j1").await;
    poll(&world, "w1").await;

    // The worker stops polling entirely; its presence ages out but the
    // job has not hit its stall threshold yet.
    world.clock.advance(Duration::from_secs(45));
    world.maintenance_tick();

    let job = world.store.get_job("j1").unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.comment.as_deref(), Some("worker offline"));
    assert_eq!(world.store.get_worker("w1").unwrap().current_job_id, None);
}

#[tokio::test]
async fn reclaimed_job_frees_the_worker_for_new_work() {
    let world = world();
    poll(&world, "w1").await;
    create_job(&world, "j1").await;
    poll(&world, "w1").await;

    world.clock.advance(Duration::from_secs(45));
    world.maintenance_tick();

    // Back online: the worker polls again and can take fresh work.
    poll(&world, "w1").await;
    create_job(&world, "j2").await;
    let (status, job) = poll(&world, "w1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(job.unwrap()["id"], "j2");
}
