// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the server crate.

use std::path::PathBuf;
use std::time::Duration;

use crate::lifecycle::LifecycleError;

/// Resolve state directory: ENCORE_STATE_DIR > XDG_STATE_HOME/encore > ~/.local/state/encore
pub fn state_dir() -> Result<PathBuf, LifecycleError> {
    if let Ok(dir) = std::env::var("ENCORE_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("encore"));
    }
    let home = std::env::var("HOME").map_err(|_| LifecycleError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".local/state/encore"))
}

/// HTTP bind port (default 4000)
pub fn port() -> u16 {
    std::env::var("ENCORE_PORT")
        .ok()
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(4000)
}

/// API keys seeded into the allowlist at startup, comma-separated.
pub fn api_keys() -> Vec<String> {
    std::env::var("ENCORE_API_KEYS")
        .ok()
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Maintenance pass cadence (default 10 minutes)
pub fn maintenance_interval() -> Duration {
    std::env::var("ENCORE_MAINTENANCE_INTERVAL_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(600))
}

/// Worker presence window (default 30 seconds)
pub fn online_threshold() -> Duration {
    std::env::var("ENCORE_ONLINE_THRESHOLD_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(30))
}

/// Approvals required before intake creates a job (default 2)
pub fn intake_approvals() -> u32 {
    std::env::var("ENCORE_INTAKE_APPROVALS")
        .ok()
        .and_then(|s| s.parse::<u32>().ok())
        .unwrap_or(2)
}
