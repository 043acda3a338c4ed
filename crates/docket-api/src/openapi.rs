//! # OpenAPI Specification Assembly
//!
//! Assembles all utoipa-documented routes into a single OpenAPI spec,
//! served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

/// Assembled OpenAPI spec for the entire API surface.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Docket Registry API",
        version = "0.2.7",
        description = "Tamper-evident case and evidence registry: case intake, content-fingerprinted evidence registration across redundant ledgers, and public verification.",
        license(name = "BUSL-1.1")
    ),
    paths(
        // Cases
        crate::routes::cases::open_case,
        crate::routes::cases::get_case,
        crate::routes::cases::list_evidence,
        crate::routes::cases::register_evidence,
        crate::routes::cases::close_case,
        // Verification
        crate::routes::verify::verify_evidence,
        // Events
        crate::routes::events::poll_events,
    ),
    components(schemas(
        // Request DTOs
        crate::routes::cases::OpenCaseRequest,
        crate::routes::cases::CloseCaseRequest,
        // Response DTOs
        crate::routes::cases::CaseReceiptBody,
        crate::routes::cases::EvidenceReceiptBody,
        crate::routes::cases::CloseReceiptBody,
        crate::routes::cases::CaseRecordBody,
        crate::routes::cases::EvidenceListBody,
        crate::routes::verify::VerificationReport,
        crate::routes::events::EventPage,
        // Error types
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "cases", description = "Case intake and public case reads"),
        (name = "verify", description = "Public evidence verification"),
        (name = "events", description = "Registry event polling"),
    )
)]
pub struct ApiDoc;

/// Build the OpenAPI router.
///
/// Serves the OpenAPI JSON spec at `/openapi.json`.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

/// GET /openapi.json — Return the generated OpenAPI specification.
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
