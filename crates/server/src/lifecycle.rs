// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Server lifecycle: configuration, startup, graceful shutdown.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use encore_core::SystemClock;
use encore_storage::{Store, StoreError};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::dispatch::{Dispatcher, RandomSelect, SelectPolicy};
use crate::http::{self, ServeCtx};
use crate::intake::{self, IntakeConfig, IntakeReport};
use crate::maintenance::{Maintenance, StallThresholds};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root state directory (WAL + snapshot).
    pub state_dir: PathBuf,
    /// HTTP bind port.
    pub port: u16,
    /// API keys seeded into the allowlist at startup.
    pub api_keys: Vec<String>,
    /// Maintenance pass cadence.
    pub maintenance_interval: Duration,
    /// Worker presence window.
    pub online_threshold: Duration,
    /// Approvals required before intake creates a job.
    pub intake_approvals: u32,
}

impl Config {
    /// Load configuration from the environment.
    pub fn load() -> Result<Self, LifecycleError> {
        Ok(Self {
            state_dir: crate::env::state_dir()?,
            port: crate::env::port(),
            api_keys: crate::env::api_keys(),
            maintenance_interval: crate::env::maintenance_interval(),
            online_threshold: crate::env::online_threshold(),
            intake_approvals: crate::env::intake_approvals(),
        })
    }
}

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("could not determine state directory")]
    NoStateDir,

    #[error("failed to bind {0}: {1}")]
    BindFailed(SocketAddr, #[source] std::io::Error),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Run the server until a shutdown signal arrives.
///
/// Teardown order: stop accepting HTTP requests, cancel maintenance
/// between passes, drain the intake channel, then checkpoint the store.
pub async fn run(config: Config) -> Result<(), LifecycleError> {
    let store = Store::open(&config.state_dir)?;
    for key in &config.api_keys {
        store.authorize_key(key)?;
    }
    if config.api_keys.is_empty() && store.state().keys.is_empty() {
        warn!("API key allowlist is empty; every request will be rejected");
    }

    let clock = SystemClock;
    let policy: Arc<dyn SelectPolicy> = Arc::new(RandomSelect);
    let dispatcher = Dispatcher::new(
        store.clone(),
        Arc::clone(&policy),
        clock.clone(),
        config.online_threshold,
    );

    let cancel = CancellationToken::new();
    let maintenance = Maintenance::new(
        store.clone(),
        clock.clone(),
        policy,
        config.maintenance_interval,
        config.online_threshold,
        StallThresholds::default(),
    );
    let maintenance_task = tokio::spawn(maintenance.run(cancel.clone()));

    let (intake, mut reports, intake_task) = intake::spawn(
        dispatcher.clone(),
        IntakeConfig {
            approvals_needed: config.intake_approvals,
            ..IntakeConfig::default()
        },
    );
    let report_task = tokio::spawn(async move {
        while let Some(report) = reports.recv().await {
            match report {
                IntakeReport::Assigned { job_id, worker_id } => {
                    info!(job_id, worker_id, "intake: job assigned")
                }
                IntakeReport::Backlogged { job_id } => {
                    info!(job_id, "intake: job backlogged")
                }
                IntakeReport::Dropped { job_id, reason } => {
                    warn!(job_id, reason, "intake: job dropped")
                }
            }
        }
    });

    let ctx = Arc::new(ServeCtx {
        store: store.clone(),
        dispatcher,
        clock,
        online_threshold: config.online_threshold,
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| LifecycleError::BindFailed(addr, e))?;
    info!(%addr, "listening");

    axum::serve(listener, http::router(ctx))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("HTTP surface stopped, shutting down");
    cancel.cancel();
    let _ = maintenance_task.await;

    drop(intake);
    let _ = intake_task.await;
    let _ = report_task.await;

    store.checkpoint()?;
    info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received");
}
