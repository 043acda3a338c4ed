//! # Write Journal
//!
//! Append-only JSON-lines log of every coordinated write the registrar
//! makes: one [`JournalEntry`] per line, each holding the full
//! [`LedgerWriteRecord`] at the time the write settled.
//!
//! The journal is an operational recovery aid, never a source of truth —
//! the ledgers are. After a restart, [`WriteJournal::replay`] rebuilds
//! the `logical_write_id → per-ledger transaction` mapping so an operator
//! can [`refresh`](docket_quorum::Coordinator::refresh) writes that were
//! in flight when the process died.
//!
//! A crash mid-append leaves a torn final line; loading tolerates exactly
//! that (the trailing partial entry is dropped with a warning). A corrupt
//! line anywhere else is an error, because it means something other than
//! this process wrote to the file.

use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use docket_core::{LogicalWriteId, Timestamp};
use docket_quorum::LedgerWriteRecord;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failures while appending to or loading the write journal.
#[derive(Debug, Error)]
pub enum JournalError {
    /// Filesystem failure.
    #[error("journal i/o failed: {0}")]
    Io(#[from] std::io::Error),

    /// An entry could not be serialized for appending.
    #[error("journal entry could not be serialized: {0}")]
    Serialize(#[source] serde_json::Error),

    /// A non-trailing line does not parse as a journal entry.
    #[error("journal line {line} is corrupt: {source}")]
    Corrupt {
        /// 1-based line number.
        line: usize,
        /// The parse failure.
        #[source]
        source: serde_json::Error,
    },
}

// ---------------------------------------------------------------------------
// Entries
// ---------------------------------------------------------------------------

/// One journal line: a write record and when it was journaled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Wall-clock time of the append. Informational; ledger timestamps
    /// are the authoritative ones.
    pub recorded_at: Timestamp,
    /// The write's full per-ledger bookkeeping.
    pub record: LedgerWriteRecord,
}

// ---------------------------------------------------------------------------
// The journal
// ---------------------------------------------------------------------------

/// An append-only JSON-lines journal of coordinated writes.
#[derive(Debug)]
pub struct WriteJournal {
    path: PathBuf,
    file: Mutex<File>,
}

impl WriteJournal {
    /// Open (creating if needed) a journal at `path`.
    ///
    /// Parent directories are created. An existing journal is appended
    /// to, never truncated.
    ///
    /// # Errors
    ///
    /// Returns [`JournalError::Io`] if the file cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, JournalError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    /// The file this journal appends to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one write record as a JSON line and sync it to disk.
    ///
    /// # Errors
    ///
    /// Returns [`JournalError::Serialize`] if the record does not
    /// serialize, or [`JournalError::Io`] on write failure.
    pub fn append(&self, record: &LedgerWriteRecord) -> Result<(), JournalError> {
        let entry = JournalEntry {
            recorded_at: Timestamp::now(),
            record: record.clone(),
        };
        let mut line = serde_json::to_string(&entry).map_err(JournalError::Serialize)?;
        line.push('\n');

        let mut file = self.file.lock();
        file.write_all(line.as_bytes())?;
        file.sync_data()?;
        Ok(())
    }

    /// Load every entry from a journal file, in append order.
    ///
    /// A missing file is an empty journal. A torn trailing line is
    /// dropped with a warning.
    ///
    /// # Errors
    ///
    /// Returns [`JournalError::Corrupt`] for an unparsable non-trailing
    /// line.
    pub fn load(path: impl AsRef<Path>) -> Result<Vec<JournalEntry>, JournalError> {
        let path = path.as_ref();
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let lines: Vec<String> = BufReader::new(file).lines().collect::<Result<_, _>>()?;

        let mut entries = Vec::with_capacity(lines.len());
        for (index, line) in lines.iter().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(line) {
                Ok(entry) => entries.push(entry),
                Err(source) if index + 1 == lines.len() => {
                    tracing::warn!(
                        path = %path.display(),
                        "dropping truncated trailing journal entry: {source}"
                    );
                    break;
                }
                Err(source) => {
                    return Err(JournalError::Corrupt {
                        line: index + 1,
                        source,
                    })
                }
            }
        }
        Ok(entries)
    }

    /// Rebuild the latest record per logical write from a journal file.
    ///
    /// Later entries for the same write supersede earlier ones.
    ///
    /// # Errors
    ///
    /// As [`WriteJournal::load`].
    pub fn replay(
        path: impl AsRef<Path>,
    ) -> Result<BTreeMap<LogicalWriteId, LedgerWriteRecord>, JournalError> {
        let mut records = BTreeMap::new();
        for entry in Self::load(path)? {
            records.insert(entry.record.logical_write_id.clone(), entry.record);
        }
        Ok(records)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
