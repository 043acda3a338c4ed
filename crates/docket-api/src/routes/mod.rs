//! # Route Modules
//!
//! One module per concern, each exposing a `router()` that the
//! application assembles in [`crate::app`].

pub mod cases;
pub mod events;
pub mod verify;

use docket_ledger::LedgerError;

use crate::error::AppError;

/// Map a ledger read failure to an API error.
///
/// Transient failures (an unreachable ledger) surface as 503 so clients
/// retry; anything else is an internal fault.
pub(crate) fn ledger_read_error(err: LedgerError) -> AppError {
    if err.is_transient() {
        AppError::Unavailable(err.to_string())
    } else {
        AppError::Internal(err.to_string())
    }
}
