//! # docket-api — Axum HTTP Surface for the Docket Registry
//!
//! The registry's public face: intake routes that feed the registrar,
//! public reads served straight from the ledgers, and the verification
//! endpoint any third party can call without credentials.
//!
//! ## API Surface
//!
//! | Route                                  | Module              | Auth  |
//! |----------------------------------------|---------------------|-------|
//! | `POST /v1/cases`                       | [`routes::cases`]   | token |
//! | `GET /v1/cases/:id`                    | [`routes::cases`]   | none  |
//! | `GET /v1/cases/:id/evidence`           | [`routes::cases`]   | none  |
//! | `POST /v1/cases/:id/evidence`          | [`routes::cases`]   | token |
//! | `POST /v1/cases/:id/close`             | [`routes::cases`]   | token |
//! | `POST /v1/verify/:case_id/:evidence_id`| [`routes::verify`]  | none  |
//! | `GET /v1/events`                       | [`routes::events`]  | none  |
//!
//! Write authentication is a single optional static bearer token; the
//! real authorization boundary is the contract's case-owner check.
//!
//! ## OpenAPI
//!
//! Auto-generated spec via utoipa derive macros at `/openapi.json`.

pub mod auth;
pub mod error;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::middleware::from_fn;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::auth::AuthConfig;
use crate::state::AppState;

/// Assemble the full application router with all routes and middleware.
///
/// The cases router carries the auth middleware (which waves reads
/// through); the verification and event surfaces are mounted outside it
/// entirely, as are the health probes.
pub fn app(state: AppState) -> Router {
    let auth_config = AuthConfig {
        token: state.config.auth_token.clone(),
    };

    // Intake routes, with write auth.
    let intake = Router::new()
        .merge(routes::cases::router())
        .layer(from_fn(auth::auth_middleware))
        .layer(axum::Extension(auth_config));

    // Public verification surface.
    let public = Router::new()
        .merge(routes::verify::router())
        .merge(routes::events::router())
        .merge(openapi::router());

    // Unauthenticated health probes.
    let health = Router::new()
        .route("/health/liveness", axum::routing::get(liveness))
        .route("/health/readiness", axum::routing::get(readiness));

    Router::new()
        .merge(health)
        .merge(intake)
        .merge(public)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Liveness probe — always returns 200 if the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe — returns 200 when the application is ready to serve.
async fn readiness() -> &'static str {
    "ready"
}
