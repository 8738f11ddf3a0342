// ============================================================================
// Axum Extractors
// ============================================================================
//
// AdminSession: extracts and verifies the session cookie. Every admin-facing
// handler takes this extractor first, so an unauthenticated caller is
// rejected with 401 before any other work happens.
//
// ============================================================================

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use serde_json::json;
use std::sync::Arc;

use crate::context::AppContext;
use crate::session::{SESSION_COOKIE_NAME, SessionClaims};

/// Extractor for a verified operator session
///
/// Usage:
/// ```rust,ignore
/// async fn handler(session: AdminSession, ...) -> Result<...> {
///     let operator = &session.0.username;
///     // ...
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AdminSession(pub SessionClaims);

#[async_trait]
impl FromRequestParts<Arc<AppContext>> for AdminSession {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppContext>,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);

        let token = jar
            .get(SESSION_COOKIE_NAME)
            .map(|cookie| cookie.value().to_string())
            .ok_or_else(|| unauthorized("Authentication required"))?;

        match state.sessions.verify(&token) {
            Ok(claims) => Ok(AdminSession(claims)),
            Err(e) => {
                tracing::warn!(error = %e, "Session verification failed");
                Err(unauthorized("Invalid or expired session"))
            }
        }
    }
}

fn unauthorized(message: &str) -> Response {
    let body = json!({
        "error": message,
        "error_code": "UNAUTHORIZED",
        "status": StatusCode::UNAUTHORIZED.as_u16(),
    });
    (StatusCode::UNAUTHORIZED, axum::Json(body)).into_response()
}
