// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dispatch specs: immediate assignment, backlog, drain.

use axum::http::StatusCode;
use encore_core::JobStatus;

use super::prelude::*;

#[tokio::test]
async fn immediate_dispatch() {
    let world = world();

    // Worker registers through its first poll.
    let (status, _) = poll(&world, "w1").await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    // Intake creates a job; the online worker gets it.
    let (status, response) = create_job(&world, "j1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response.unwrap()["disposition"], "assigned");

    // Next poll delivers it, advanced to pending.
    let (status, job) = poll(&world, "w1").await;
    assert_eq!(status, StatusCode::OK);
    let job = job.unwrap();
    assert_eq!(job["id"], "j1");
    assert_eq!(job["title"], "p | a - s [d]");

    assert_eq!(world.store.get_job("j1").unwrap().status, JobStatus::Pending);
    assert_eq!(
        world.store.get_worker("w1").unwrap().current_job_id.as_deref(),
        Some("j1")
    );
}

#[tokio::test]
async fn backlog_then_drain() {
    let world = world();

    // No workers online: the job lands in the backlog.
    let (_, response) = create_job(&world, "j1").await;
    assert_eq!(response.unwrap()["disposition"], "backlogged");
    assert_eq!(
        world.store.get_job("j1").unwrap().status,
        JobStatus::Backlogged
    );

    // A worker appears, then the maintenance tick pairs them up.
    let (status, _) = poll(&world, "w1").await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    world.maintenance_tick();
    assert_eq!(
        world.store.get_job("j1").unwrap().status,
        JobStatus::Assigned
    );

    // The worker's next poll picks it up.
    let (status, job) = poll(&world, "w1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(job.unwrap()["id"], "j1");
}

#[tokio::test]
async fn duplicate_create_conflicts_without_state_change() {
    let world = world();
    create_job(&world, "j1").await;
    let before = world.store.get_job("j1").unwrap();

    let (status, _) = create_job(&world, "j1").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(world.store.get_job("j1").unwrap(), before);
}
