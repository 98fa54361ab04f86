// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ownership and idempotence specs.

use axum::http::StatusCode;
use encore_core::JobStatus;

use super::prelude::*;

#[tokio::test]
async fn mismatched_ownership_rejection() {
    let world = world();
    poll(&world, "w1").await;
    create_job(&world, "j1").await;
    poll(&world, "w1").await;
    poll(&world, "w2").await;
    let w2_last_poll = world.store.get_worker("w2").unwrap().last_poll_ms;

    // w2 reports on w1's job: rejected, nothing recorded.
    let status = report(&world, "w2", "j1", 5, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(world.store.get_job("j1").unwrap().status, JobStatus::Pending);

    // The status endpoint is not a heartbeat.
    assert_eq!(
        world.store.get_worker("w2").unwrap().last_poll_ms,
        w2_last_poll
    );
}

#[tokio::test]
async fn poll_with_in_flight_job_is_idempotent() {
    let world = world();
    poll(&world, "w1").await;
    create_job(&world, "j1").await;
    poll(&world, "w1").await;

    let before = world.store.get_job("j1").unwrap();
    for _ in 0..3 {
        let (status, _) = poll(&world, "w1").await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }
    assert_eq!(world.store.get_job("j1").unwrap(), before);
}

#[tokio::test]
async fn same_status_report_is_a_rejected_no_op() {
    let world = world();
    poll(&world, "w1").await;
    create_job(&world, "j1").await;
    poll(&world, "w1").await;
    assert_eq!(report(&world, "w1", "j1", 5, None).await, StatusCode::OK);

    let status = report(&world, "w1", "j1", 5, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        world.store.get_job("j1").unwrap().status,
        JobStatus::Recording
    );
}

#[tokio::test]
async fn state_survives_restart() {
    let dir;
    {
        let world = world();
        poll(&world, "w1").await;
        create_job(&world, "j1").await;
        poll(&world, "w1").await;
        report(&world, "w1", "j1", 8, Some("screen capture died")).await;
        dir = world.into_state_dir();
    }

    let store = encore_storage::Store::open(dir.path()).unwrap();
    let job = store.get_job("j1").unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.comment.as_deref(), Some("screen capture died"));
    assert_eq!(store.get_worker("w1").unwrap().current_job_id, None);
}
