//! # Event Polling API
//!
//! Serves the append-only registry event log so downstream consumers
//! (notification services, mirrors, auditors) can poll for new activity
//! without a push channel.

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use docket_core::LedgerId;
use docket_ledger::RegistryEvent;

use crate::error::AppError;
use crate::routes::ledger_read_error;
use crate::state::AppState;

// ── DTOs ────────────────────────────────────────────────────────────

/// Query parameters for event polling.
#[derive(Debug, Deserialize, IntoParams)]
pub struct EventsParams {
    /// Return events with sequence strictly greater than this. Defaults
    /// to 0 (the full log).
    pub since: Option<u64>,
    /// Ledger to poll. Defaults to the primary.
    pub ledger: Option<String>,
}

/// One page of registry events.
#[derive(Debug, Serialize, ToSchema)]
pub struct EventPage {
    /// Ledger the events came from.
    pub ledger: String,
    /// The `since` cursor this page answers.
    pub since: u64,
    /// Cursor to pass as `since` on the next poll.
    pub next_since: u64,
    /// The events, in sequence order.
    #[schema(value_type = Vec<Object>)]
    pub events: Vec<RegistryEvent>,
}

// ── Router ──────────────────────────────────────────────────────────

/// Build the events router.
pub fn router() -> Router<AppState> {
    Router::new().route("/v1/events", get(poll_events))
}

// ── Handler ─────────────────────────────────────────────────────────

/// GET /v1/events — Poll the registry event stream. Public.
#[utoipa::path(
    get,
    path = "/v1/events",
    params(EventsParams),
    responses(
        (status = 200, description = "Events after the given cursor", body = EventPage),
        (status = 404, description = "Unknown ledger", body = crate::error::ErrorBody),
        (status = 503, description = "Ledger unreachable", body = crate::error::ErrorBody),
    ),
    tag = "events"
)]
pub(crate) async fn poll_events(
    State(state): State<AppState>,
    Query(params): Query<EventsParams>,
) -> Result<Json<EventPage>, AppError> {
    let since = params.since.unwrap_or(0);

    let backend = match &params.ledger {
        Some(name) => {
            let ledger_id = LedgerId::new(name.clone())?;
            state
                .topology
                .get(&ledger_id)
                .ok_or_else(|| AppError::NotFound(format!("unknown ledger {ledger_id}")))?
        }
        None => state.topology.primary(),
    };

    let events = backend.events_since(since).map_err(ledger_read_error)?;
    let next_since = events.last().map_or(since, |e| e.sequence);

    Ok(Json(EventPage {
        ledger: backend.ledger_id().as_str().to_string(),
        since,
        next_since,
        events,
    }))
}
