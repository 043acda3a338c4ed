//! # Case Intake & Read API
//!
//! Intake routes feed the registrar (the sole ledger writer); read
//! routes serve case and evidence records straight from the primary
//! ledger.
//!
//! ## Endpoints
//!
//! - `POST /v1/cases` — open a case
//! - `GET /v1/cases/:case_id` — get a case record (public)
//! - `GET /v1/cases/:case_id/evidence` — list evidence records (public)
//! - `POST /v1/cases/:case_id/evidence` — register evidence bytes
//! - `POST /v1/cases/:case_id/close` — close a case

use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use docket_core::{CaseId, CaseSummary, EvidenceCategory, EvidenceId, Jurisdiction, OwnerId};
use docket_ledger::{CaseRecord, EvidenceRecord};
use docket_registrar::{CaseIntake, CaseReceipt, CloseReceipt, EvidenceIntake, EvidenceReceipt};

use crate::error::AppError;
use crate::routes::ledger_read_error;
use crate::state::AppState;

// ── Request/Response DTOs ───────────────────────────────────────────

/// Request to open a new case.
#[derive(Debug, Deserialize, ToSchema)]
pub struct OpenCaseRequest {
    /// Pre-claimed case identifier; the primary ledger allocates one
    /// when absent.
    #[serde(default)]
    #[schema(example = "GA-FULTON-2025-001")]
    pub client_case_id: Option<String>,
    /// Principal that will own the case.
    #[schema(example = "tenant-7081")]
    pub owner: String,
    /// Jurisdiction tag for identifier allocation.
    #[schema(example = "GA-FULTON")]
    pub jurisdiction: String,
    /// Structured case summary; only its fingerprint reaches a ledger.
    #[schema(value_type = Object)]
    pub summary: CaseSummary,
}

/// Query parameters accompanying raw evidence bytes.
#[derive(Debug, Deserialize, IntoParams)]
pub struct RegisterEvidenceParams {
    /// Calling principal; must own the target case.
    pub owner: String,
    /// Identifier for the entry; derived from the content fingerprint
    /// when absent.
    pub evidence_id: Option<String>,
    /// Coarse evidence category (`photo`, `document`, ...).
    pub category: String,
    /// Free-text caption.
    pub description: Option<String>,
}

/// Request to close a case.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CloseCaseRequest {
    /// Calling principal; must own the case.
    #[schema(example = "tenant-7081")]
    pub owner: String,
}

/// Signed case receipt, serialized verbatim.
#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct CaseReceiptBody(#[schema(value_type = Object)] pub CaseReceipt);

/// Signed evidence receipt, serialized verbatim.
#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct EvidenceReceiptBody(#[schema(value_type = Object)] pub EvidenceReceipt);

/// Signed close receipt, serialized verbatim.
#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct CloseReceiptBody(#[schema(value_type = Object)] pub CloseReceipt);

/// A case record as held by the primary ledger.
#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct CaseRecordBody(#[schema(value_type = Object)] pub CaseRecord);

/// Evidence records as held by the primary ledger.
#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct EvidenceListBody(#[schema(value_type = Vec<Object>)] pub Vec<EvidenceRecord>);

// ── Router ──────────────────────────────────────────────────────────

/// Build the cases router with intake and public read endpoints.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/cases", post(open_case))
        .route("/v1/cases/:case_id", get(get_case))
        .route(
            "/v1/cases/:case_id/evidence",
            get(list_evidence).post(register_evidence),
        )
        .route("/v1/cases/:case_id/close", post(close_case))
}

// ── Handlers ────────────────────────────────────────────────────────

/// POST /v1/cases — Open a new case.
#[utoipa::path(
    post,
    path = "/v1/cases",
    request_body = OpenCaseRequest,
    responses(
        (status = 201, description = "Case registered; signed receipt returned", body = CaseReceiptBody),
        (status = 422, description = "Validation error", body = crate::error::ErrorBody),
        (status = 409, description = "Client-supplied case id already registered", body = crate::error::ErrorBody),
    ),
    tag = "cases"
)]
pub(crate) async fn open_case(
    State(state): State<AppState>,
    body: Result<Json<OpenCaseRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CaseReceiptBody>), AppError> {
    let Json(req) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let intake = CaseIntake {
        client_case_id: req.client_case_id.map(CaseId::new).transpose()?,
        owner: OwnerId::new(req.owner)?,
        jurisdiction: Jurisdiction::new(req.jurisdiction)?,
        summary: req.summary,
    };
    let receipt = state.registrar.register_case(intake).await?;
    Ok((StatusCode::CREATED, Json(CaseReceiptBody(receipt))))
}

/// GET /v1/cases/:case_id — Get a case record. Public.
#[utoipa::path(
    get,
    path = "/v1/cases/{case_id}",
    params(("case_id" = String, Path, description = "Case identifier")),
    responses(
        (status = 200, description = "Case record", body = CaseRecordBody),
        (status = 404, description = "Case not found", body = crate::error::ErrorBody),
    ),
    tag = "cases"
)]
pub(crate) async fn get_case(
    State(state): State<AppState>,
    Path(case_id): Path<String>,
) -> Result<Json<CaseRecordBody>, AppError> {
    let case_id = CaseId::new(case_id)?;
    state
        .topology
        .primary()
        .get_case(&case_id)
        .map_err(ledger_read_error)?
        .map(|record| Json(CaseRecordBody(record)))
        .ok_or_else(|| AppError::NotFound(format!("case {case_id} not found")))
}

/// GET /v1/cases/:case_id/evidence — List evidence records. Public.
#[utoipa::path(
    get,
    path = "/v1/cases/{case_id}/evidence",
    params(("case_id" = String, Path, description = "Case identifier")),
    responses(
        (status = 200, description = "Evidence records for the case", body = EvidenceListBody),
        (status = 404, description = "Case not found", body = crate::error::ErrorBody),
    ),
    tag = "cases"
)]
pub(crate) async fn list_evidence(
    State(state): State<AppState>,
    Path(case_id): Path<String>,
) -> Result<Json<EvidenceListBody>, AppError> {
    let case_id = CaseId::new(case_id)?;
    state
        .topology
        .primary()
        .get_evidence(&case_id)
        .map_err(ledger_read_error)?
        .map(|records| Json(EvidenceListBody(records)))
        .ok_or_else(|| AppError::NotFound(format!("case {case_id} not found")))
}

/// POST /v1/cases/:case_id/evidence — Register evidence bytes.
///
/// The body is the raw file; descriptive fields travel as query
/// parameters so the bytes are never wrapped or re-encoded.
#[utoipa::path(
    post,
    path = "/v1/cases/{case_id}/evidence",
    params(
        ("case_id" = String, Path, description = "Case identifier"),
        RegisterEvidenceParams,
    ),
    request_body(content = Vec<u8>, content_type = "application/octet-stream"),
    responses(
        (status = 201, description = "Evidence registered; signed receipt returned", body = EvidenceReceiptBody),
        (status = 403, description = "Caller does not own the case", body = crate::error::ErrorBody),
        (status = 409, description = "Conflicting evidence id, or case closed", body = crate::error::ErrorBody),
        (status = 422, description = "Validation error", body = crate::error::ErrorBody),
        (status = 503, description = "Evidence store unavailable", body = crate::error::ErrorBody),
    ),
    tag = "cases"
)]
pub(crate) async fn register_evidence(
    State(state): State<AppState>,
    Path(case_id): Path<String>,
    Query(params): Query<RegisterEvidenceParams>,
    bytes: Bytes,
) -> Result<(StatusCode, Json<EvidenceReceiptBody>), AppError> {
    if bytes.is_empty() {
        return Err(AppError::Validation("evidence body must not be empty".into()));
    }
    let case_id = CaseId::new(case_id)?;
    let intake = EvidenceIntake {
        owner: OwnerId::new(params.owner)?,
        evidence_id: params.evidence_id.map(EvidenceId::new).transpose()?,
        category: params.category.parse::<EvidenceCategory>()?,
        description: params.description,
    };
    let receipt = state
        .registrar
        .register_evidence(case_id, &bytes, intake)
        .await?;
    Ok((StatusCode::CREATED, Json(EvidenceReceiptBody(receipt))))
}

/// POST /v1/cases/:case_id/close — Close a case, freezing its evidence.
#[utoipa::path(
    post,
    path = "/v1/cases/{case_id}/close",
    params(("case_id" = String, Path, description = "Case identifier")),
    request_body = CloseCaseRequest,
    responses(
        (status = 200, description = "Case closed; signed receipt returned", body = CloseReceiptBody),
        (status = 403, description = "Caller does not own the case", body = crate::error::ErrorBody),
        (status = 404, description = "Case not found", body = crate::error::ErrorBody),
    ),
    tag = "cases"
)]
pub(crate) async fn close_case(
    State(state): State<AppState>,
    Path(case_id): Path<String>,
    body: Result<Json<CloseCaseRequest>, JsonRejection>,
) -> Result<Json<CloseReceiptBody>, AppError> {
    let Json(req) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let case_id = CaseId::new(case_id)?;
    let owner = OwnerId::new(req.owner)?;
    let receipt = state.registrar.close_case(case_id, owner).await?;
    Ok(Json(CloseReceiptBody(receipt)))
}
