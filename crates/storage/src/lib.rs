// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! encore-storage: event-sourced persistence for the dispatch core.
//!
//! The [`Store`] is the single owner of all persistent state. Every
//! mutation is validated under one lock, appended to the write-ahead log,
//! and then folded into the materialized [`DispatchState`], so the
//! worker/job pointer invariants are never observable broken and a failed
//! log write leaves state untouched.

mod error;
mod event;
mod snapshot;
mod state;
mod store;
mod wal;

pub use error::StoreError;
pub use event::Event;
pub use snapshot::{Snapshot, SnapshotError, CURRENT_SNAPSHOT_VERSION};
pub use state::{DispatchState, JobFilter};
pub use store::{StatusChange, Store};
pub use wal::{Wal, WalEntry, WalError};
