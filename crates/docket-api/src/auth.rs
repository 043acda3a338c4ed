//! # Write Authentication Middleware
//!
//! Optional static bearer token guarding the intake (write) routes.
//!
//! Reads are public: anyone must be able to fetch case records and
//! verify evidence without credentials, so the middleware passes `GET`
//! and `HEAD` requests through untouched. Mutating requests require
//! `Authorization: Bearer <token>` matching the configured `AUTH_TOKEN`.
//! When no token is configured, write authentication is disabled and
//! only the contract's case-owner check applies.

use axum::extract::Request;
use axum::http::{header, Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use subtle::ConstantTimeEq;

use crate::error::{ErrorBody, ErrorDetail};

/// Auth configuration injected into request extensions.
///
/// Custom `Debug` redacts the token value to prevent credential leakage
/// in logs.
#[derive(Clone)]
pub struct AuthConfig {
    pub token: Option<String>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Constant-time comparison of bearer tokens.
///
/// Prevents timing side-channels that could reveal token length or
/// prefix. When lengths differ, performs a dummy comparison to avoid
/// leaking length information through timing variance.
fn constant_time_token_eq(provided: &str, expected: &str) -> bool {
    let provided = provided.as_bytes();
    let expected = expected.as_bytes();
    if provided.len() != expected.len() {
        let _ = expected.ct_eq(expected);
        return false;
    }
    provided.ct_eq(expected).into()
}

/// Validate the Bearer token on mutating requests.
///
/// `GET` and `HEAD` requests bypass the check entirely. For everything
/// else, the `Authorization` header must carry the configured token;
/// when [`AuthConfig::token`] is `None` all requests are allowed.
pub async fn auth_middleware(request: Request, next: Next) -> Response {
    if request.method() == Method::GET || request.method() == Method::HEAD {
        return next.run(request).await;
    }

    let expected_token = request.extensions().get::<AuthConfig>().cloned();

    match expected_token {
        Some(AuthConfig {
            token: Some(ref expected),
        }) => {
            let auth_header = request
                .headers()
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok());

            match auth_header {
                Some(header_value) if header_value.starts_with("Bearer ") => {
                    let provided = &header_value[7..];
                    if constant_time_token_eq(provided, expected) {
                        next.run(request).await
                    } else {
                        tracing::warn!("authentication failed: invalid bearer token");
                        unauthorized_response("invalid bearer token")
                    }
                }
                Some(_) => {
                    tracing::warn!("authentication failed: non-Bearer authorization scheme");
                    unauthorized_response("authorization header must use Bearer scheme")
                }
                None => {
                    tracing::warn!("authentication failed: missing authorization header");
                    unauthorized_response("missing authorization header")
                }
            }
        }
        _ => next.run(request).await,
    }
}

fn unauthorized_response(message: &str) -> Response {
    let body = ErrorBody {
        error: ErrorDetail {
            code: "UNAUTHORIZED".to_string(),
            message: message.to_string(),
            details: None,
        },
    };
    (StatusCode::UNAUTHORIZED, Json(body)).into_response()
}
