//! # Public Verification API
//!
//! The verification endpoint is the registry's reason to exist: anyone
//! holding a candidate file can ask every configured ledger whether the
//! bytes match what was registered, without credentials and without
//! touching the write path.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::routing::post;
use axum::{Json, Router};
use serde::Serialize;
use utoipa::ToSchema;

use docket_core::{CaseId, EvidenceId, Timestamp};
use docket_verify::LedgerConfirmation;

use crate::error::AppError;
use crate::state::AppState;

// ── Response DTO ────────────────────────────────────────────────────

/// Outcome of verifying candidate bytes against every configured ledger.
#[derive(Debug, Serialize, ToSchema)]
pub struct VerificationReport {
    /// Case the candidate was checked against.
    pub case_id: String,
    /// Evidence entry the candidate was checked against.
    pub evidence_id: String,
    /// Overall verdict: `verified`, `fingerprint_mismatch`,
    /// `unregistered`, or `unverifiable`.
    pub verdict: String,
    /// Human-readable confirmation summary.
    pub summary: String,
    /// Whether any reachable ledger holds the record.
    pub registered: bool,
    /// Whether the candidate bytes hash to the registered fingerprint.
    pub fingerprint_match: bool,
    /// Count of non-invalidated ledger confirmations.
    pub confirmation_count: usize,
    /// Per-ledger detail, including explorer links where configured.
    #[schema(value_type = Vec<Object>)]
    pub confirmations: Vec<LedgerConfirmation>,
    /// Registration time according to the first confirming ledger.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub registered_at: Option<Timestamp>,
}

// ── Router ──────────────────────────────────────────────────────────

/// Build the verification router.
pub fn router() -> Router<AppState> {
    Router::new().route("/v1/verify/:case_id/:evidence_id", post(verify_evidence))
}

// ── Handler ─────────────────────────────────────────────────────────

/// POST /v1/verify/:case_id/:evidence_id — Verify candidate bytes.
///
/// Public, never authenticated. An unreachable ledger never fails the
/// request; it shows up as a confirmation with `reachable = false`, and
/// zero reachable confirmations yield the `unverifiable` verdict.
#[utoipa::path(
    post,
    path = "/v1/verify/{case_id}/{evidence_id}",
    params(
        ("case_id" = String, Path, description = "Case identifier"),
        ("evidence_id" = String, Path, description = "Evidence identifier"),
    ),
    request_body(content = Vec<u8>, content_type = "application/octet-stream"),
    responses(
        (status = 200, description = "Verification outcome", body = VerificationReport),
        (status = 422, description = "Malformed identifier", body = crate::error::ErrorBody),
    ),
    tag = "verify"
)]
pub(crate) async fn verify_evidence(
    State(state): State<AppState>,
    Path((case_id, evidence_id)): Path<(String, String)>,
    bytes: Bytes,
) -> Result<Json<VerificationReport>, AppError> {
    let case_id = CaseId::new(case_id)?;
    let evidence_id = EvidenceId::new(evidence_id)?;

    let result = state.reader.verify(&case_id, &evidence_id, &bytes);
    let confirmation_count = result.confirmation_count();
    let summary = format!(
        "{confirmation_count} of {} configured ledgers confirm this evidence",
        result.confirmations.len()
    );
    tracing::info!(
        case_id = %case_id,
        evidence_id = %evidence_id,
        verdict = result.verdict().as_str(),
        confirmations = confirmation_count,
        "verification served"
    );

    Ok(Json(VerificationReport {
        case_id: case_id.as_str().to_string(),
        evidence_id: evidence_id.as_str().to_string(),
        verdict: result.verdict().as_str().to_string(),
        summary,
        registered: result.registered,
        fingerprint_match: result.fingerprint_match,
        confirmation_count,
        confirmations: result.confirmations,
        registered_at: result.registered_at,
    }))
}
