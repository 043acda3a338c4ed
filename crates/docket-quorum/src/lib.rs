//! # docket-quorum — Multi-Ledger Write Coordination
//!
//! Fans every registry write out across a topology of ledgers and tracks
//! how far each copy got:
//!
//! - **Topology** ([`topology`]): the fixed set of ledgers a deployment
//!   writes to — exactly one primary plus any number of redundants —
//!   declared in YAML and validated before anything starts.
//!
//! - **Policy** ([`policy`]): the durability threshold (how many
//!   redundant confirmations a write needs beyond the primary) and the
//!   shared exponential-backoff retry schedule.
//!
//! - **Write tracking** ([`write`]): per-ledger status bookkeeping for
//!   one logical write, from all-`Pending` through confirmation,
//!   degradation, or reorg invalidation.
//!
//! - **Coordinator** ([`coordinator`]): the write path itself. Primary
//!   first and authoritative; redundants fan out concurrently and only
//!   ever degrade a write, never fail it. [`Coordinator::refresh`]
//!   reconciles records against chain reorganizations after the fact.

pub mod coordinator;
pub mod policy;
pub mod topology;
pub mod write;

// Re-export primary types.
pub use coordinator::{CancelHandle, Coordinator, CoordinatorError};
pub use policy::{QuorumPolicy, RetryConfig};
pub use topology::{LedgerEntry, LedgerRole, LedgerTopology, TopologyConfig, TopologyError};
pub use write::{LedgerWriteRecord, WriteOutcome, WriteStatus};
