// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only write-ahead log of dispatch events.
//!
//! One JSON entry per line, each carrying a monotonically increasing
//! sequence number. A corrupt tail (partial write, disk trouble) is
//! rotated to `.bak` at open and recovery continues from the valid
//! prefix.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::snapshot::rotate_to_bak;
use crate::Event;

/// Errors from WAL operations.
#[derive(Debug, Error)]
pub enum WalError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("encode error: {0}")]
    Encode(#[from] serde_json::Error),
}

/// A single persisted event with its sequence number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalEntry {
    pub seq: u64,
    pub event: Event,
}

/// The write-ahead log.
pub struct Wal {
    path: PathBuf,
    writer: BufWriter<File>,
    write_seq: u64,
}

struct ReadOutcome {
    entries: Vec<WalEntry>,
    corrupt: bool,
}

/// Read the valid prefix of a WAL file, stopping at the first entry that
/// fails to parse (including non-UTF-8 data).
fn read_valid_entries(path: &Path) -> Result<ReadOutcome, WalError> {
    let bytes = fs::read(path)?;
    let mut entries = Vec::new();
    let mut corrupt = false;
    for line in bytes.split(|b| *b == b'\n') {
        if line.is_empty() {
            continue;
        }
        let parsed = std::str::from_utf8(line)
            .ok()
            .and_then(|s| serde_json::from_str::<WalEntry>(s).ok());
        match parsed {
            Some(entry) => entries.push(entry),
            None => {
                corrupt = true;
                break;
            }
        }
    }
    Ok(ReadOutcome { entries, corrupt })
}

fn write_entries(path: &Path, entries: &[WalEntry]) -> Result<(), WalError> {
    let mut writer = BufWriter::new(File::create(path)?);
    for entry in entries {
        serde_json::to_writer(&mut writer, entry)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

impl Wal {
    /// Open (or create) the WAL at `path`.
    ///
    /// A corrupt tail is rotated to `.bak`; the valid prefix is kept.
    pub fn open(path: &Path) -> Result<Self, WalError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let outcome = if path.exists() {
            read_valid_entries(path)?
        } else {
            ReadOutcome {
                entries: Vec::new(),
                corrupt: false,
            }
        };

        if outcome.corrupt {
            let bak = rotate_to_bak(path)?;
            warn!(
                path = %path.display(),
                bak = %bak.display(),
                kept = outcome.entries.len(),
                "WAL has a corrupt tail; rotated original, keeping valid prefix"
            );
            write_entries(path, &outcome.entries)?;
        }

        let write_seq = outcome.entries.last().map(|e| e.seq).unwrap_or(0);
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
            write_seq,
        })
    }

    /// Append an event, returning its sequence number.
    ///
    /// Buffered; call [`Wal::flush`] before treating the event as durable.
    pub fn append(&mut self, event: &Event) -> Result<u64, WalError> {
        let seq = self.write_seq + 1;
        let entry = WalEntry {
            seq,
            event: event.clone(),
        };
        serde_json::to_writer(&mut self.writer, &entry)?;
        self.writer.write_all(b"\n")?;
        self.write_seq = seq;
        Ok(seq)
    }

    pub fn flush(&mut self) -> Result<(), WalError> {
        self.writer.flush()?;
        Ok(())
    }

    /// Highest sequence number written so far.
    pub fn write_seq(&self) -> u64 {
        self.write_seq
    }

    /// Raise the sequence floor after a snapshot restore, so sequence
    /// numbers stay monotonic even when the log itself was compacted.
    pub fn align_seq(&mut self, floor: u64) {
        if self.write_seq < floor {
            self.write_seq = floor;
        }
    }

    /// Entries with sequence numbers greater than `seq`, in order.
    /// Stops at the first corrupt entry.
    pub fn entries_after(&mut self, seq: u64) -> Result<Vec<WalEntry>, WalError> {
        self.flush()?;
        let outcome = read_valid_entries(&self.path)?;
        Ok(outcome
            .entries
            .into_iter()
            .filter(|e| e.seq > seq)
            .collect())
    }

    /// Drop entries with sequence numbers below `seq` (already folded
    /// into a snapshot).
    pub fn truncate_before(&mut self, seq: u64) -> Result<(), WalError> {
        self.flush()?;
        let kept: Vec<WalEntry> = read_valid_entries(&self.path)?
            .entries
            .into_iter()
            .filter(|e| e.seq >= seq)
            .collect();

        let tmp = self.path.with_extension("wal.tmp");
        write_entries(&tmp, &kept)?;
        fs::rename(&tmp, &self.path)?;

        // The old handle points at the replaced inode; reopen.
        let file = OpenOptions::new().append(true).open(&self.path)?;
        self.writer = BufWriter::new(file);
        Ok(())
    }
}

#[cfg(test)]
#[path = "wal_tests.rs"]
mod tests;
