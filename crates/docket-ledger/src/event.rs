//! # Registry Events — Append-Only Change Feed
//!
//! Every accepted mutation appends exactly one event to the hosting
//! ledger's log. Sequence numbers are dense and start at 1, so a poller
//! that remembers the highest sequence it has processed can resume with
//! `events_since(seen)` and miss nothing. After a chain reorganization
//! the log is truncated together with the state it describes; consumers
//! that observe a sequence number move backwards must re-read from their
//! last durable cursor.

use serde::{Deserialize, Serialize};

use docket_core::{CaseId, ContentDigest, EvidenceId, Timestamp};

/// What kind of mutation an event records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A case was opened.
    CaseOpened,
    /// An evidence entry was registered on a case.
    EvidenceRegistered,
    /// A case was closed.
    CaseClosed,
}

impl EventKind {
    /// Canonical name, matching the serialized form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CaseOpened => "case_opened",
            Self::EvidenceRegistered => "evidence_registered",
            Self::CaseClosed => "case_closed",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One entry in a ledger's registry event log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryEvent {
    /// Position in the log. Dense, starting at 1.
    pub sequence: u64,
    /// The kind of mutation recorded.
    pub kind: EventKind,
    /// Case the mutation touched.
    pub case_id: CaseId,
    /// Evidence entry, for [`EventKind::EvidenceRegistered`] events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence_id: Option<EvidenceId>,
    /// Content fingerprint for evidence events, summary fingerprint for
    /// case lifecycle events.
    pub fingerprint: ContentDigest,
    /// Block time of the write that produced the event.
    pub timestamp: Timestamp,
    /// Height of the block that carried the write.
    pub block_height: u64,
    /// Transaction that carried the write.
    pub tx_id: String,
}
