// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Snapshot persistence for crash recovery.
//!
//! Snapshots store the complete materialized state at a point in time,
//! identified by the WAL sequence number. Recovery loads the snapshot
//! and replays WAL entries after that sequence.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::DispatchState;

/// Current snapshot schema version
pub const CURRENT_SNAPSHOT_VERSION: u32 = 1;

/// Errors that can occur in snapshot operations
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A snapshot of the materialized state at a point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// Schema version
    #[serde(rename = "v")]
    pub version: u32,
    /// WAL sequence number at the time of snapshot
    pub seq: u64,
    /// The complete materialized state
    pub state: DispatchState,
    /// When this snapshot was created
    pub created_at: DateTime<Utc>,
}

/// Move `path` aside to `path.bak`, replacing any previous backup.
pub(crate) fn rotate_to_bak(path: &Path) -> std::io::Result<PathBuf> {
    let bak = path.with_extension("bak");
    if bak.exists() {
        fs::remove_file(&bak)?;
    }
    fs::rename(path, &bak)?;
    Ok(bak)
}

impl Snapshot {
    /// Load the snapshot at `path`.
    ///
    /// Missing file is `None`. A corrupt or unknown-version snapshot is
    /// rotated to `.bak` and recovery proceeds from the WAL alone.
    pub fn load(path: &Path) -> Result<Option<Snapshot>, SnapshotError> {
        if !path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(path)?;
        match serde_json::from_slice::<Snapshot>(&bytes) {
            Ok(snapshot) if snapshot.version == CURRENT_SNAPSHOT_VERSION => Ok(Some(snapshot)),
            Ok(snapshot) => {
                let bak = rotate_to_bak(path)?;
                warn!(
                    version = snapshot.version,
                    bak = %bak.display(),
                    "unknown snapshot version, rotated aside"
                );
                Ok(None)
            }
            Err(e) => {
                let bak = rotate_to_bak(path)?;
                warn!(
                    error = %e,
                    bak = %bak.display(),
                    "corrupt snapshot, rotated aside"
                );
                Ok(None)
            }
        }
    }

    /// Write a snapshot atomically (write to temp, then rename).
    pub fn save(path: &Path, seq: u64, state: &DispatchState) -> Result<(), SnapshotError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let snapshot = Snapshot {
            version: CURRENT_SNAPSHOT_VERSION,
            seq,
            state: state.clone(),
            created_at: Utc::now(),
        };
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec(&snapshot)?)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
