// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Happy-path lifecycle spec.

use axum::http::StatusCode;
use encore_core::JobStatus;

use super::prelude::*;

#[tokio::test]
async fn full_lifecycle_to_success() {
    let world = world();
    poll(&world, "w1").await;
    create_job(&world, "j1").await;
    let (status, _) = poll(&world, "w1").await;
    assert_eq!(status, StatusCode::OK);

    // Acknowledged → Recording → Uploading → Successful, in order.
    for code in [4, 5, 6, 7] {
        assert_eq!(
            report(&world, "w1", "j1", code, None).await,
            StatusCode::OK,
            "status code {code}"
        );
    }

    let job = world.store.get_job("j1").unwrap();
    assert_eq!(job.status, JobStatus::Successful);
    assert_eq!(job.comment, None);
    assert_eq!(world.store.get_worker("w1").unwrap().current_job_id, None);

    // The freed worker can take the next job right away.
    create_job(&world, "j2").await;
    let (status, job) = poll(&world, "w1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(job.unwrap()["id"], "j2");
}

#[tokio::test]
async fn skipping_forward_is_allowed() {
    let world = world();
    poll(&world, "w1").await;
    create_job(&world, "j1").await;
    poll(&world, "w1").await;

    // Straight from pending to recording, then to successful.
    assert_eq!(report(&world, "w1", "j1", 5, None).await, StatusCode::OK);
    assert_eq!(report(&world, "w1", "j1", 7, None).await, StatusCode::OK);
    assert_eq!(
        world.store.get_job("j1").unwrap().status,
        JobStatus::Successful
    );
}
