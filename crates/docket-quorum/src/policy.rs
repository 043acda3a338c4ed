//! # Quorum Policy — When Is a Write Durable?
//!
//! A write is durable once the primary ledger has confirmed it and enough
//! redundant ledgers corroborate. "Enough" is deployment policy, not a
//! constant: a single-ledger development setup needs zero corroboration,
//! a production topology typically wants primary-plus-one.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Durability threshold for multi-ledger writes.
///
/// The primary is always required; this policy only counts redundant
/// confirmations on top of it. Partial confirmation below the threshold
/// leaves a write registered-but-not-durable, which is a representable
/// state rather than an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuorumPolicy {
    /// Redundant confirmations required beyond the primary.
    pub redundant_required: usize,
}

impl QuorumPolicy {
    /// The default policy for a topology with `redundant_count` redundant
    /// ledgers: primary-plus-one when redundants exist, primary-only
    /// otherwise.
    pub fn for_topology(redundant_count: usize) -> Self {
        Self {
            redundant_required: redundant_count.min(1),
        }
    }

    /// Evaluate durability against this policy.
    pub fn is_durable(&self, primary_confirmed: bool, confirmed_redundants: usize) -> bool {
        primary_confirmed && confirmed_redundants >= self.redundant_required
    }
}

/// Maximum number of retry attempts after the initial submission.
const DEFAULT_MAX_RETRIES: u32 = 3;

/// Base delay between retries (doubles each attempt: 200ms, 400ms, 800ms).
const DEFAULT_BASE_DELAY_MS: u64 = 200;

/// Ceiling on any single backoff delay.
const DEFAULT_MAX_DELAY_MS: u64 = 5_000;

/// Backoff schedule for ledger submissions and confirmation polls.
///
/// `max_retries` counts attempts after the initial one, mirroring the
/// doubling schedule used for upstream HTTP calls. Tests shrink the
/// delays rather than the shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    /// Retry attempts after the initial one.
    pub max_retries: u32,
    /// First delay; doubles on every subsequent attempt.
    pub base_delay: Duration,
    /// Upper bound applied to every delay.
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: Duration::from_millis(DEFAULT_BASE_DELAY_MS),
            max_delay: Duration::from_millis(DEFAULT_MAX_DELAY_MS),
        }
    }
}

impl RetryConfig {
    /// The delay to sleep after the given zero-based attempt.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.base_delay
            .saturating_mul(factor)
            .min(self.max_delay)
    }

    /// A schedule with millisecond-scale delays for tests.
    pub fn fast() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: Duration::from_millis(2),
            max_delay: Duration::from_millis(20),
        }
    }
}
