// ============================================================================
// Admin Login Routes
// ============================================================================
//
// Endpoints:
// - POST /admin/login - Verify credentials, issue session cookie (rate-limited)
// - GET /admin/login - Session probe (200 if authenticated, else 401)
// - DELETE /admin/login - Logout: clear the session cookie (idempotent)
//
// ============================================================================

use axum::{
    Json,
    extract::{ConnectInfo, State},
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use subtle::ConstantTimeEq;

use crate::context::AppContext;
use crate::error::AppError;
use crate::metrics;
use crate::ratelimit::{LoginRateLimiter, RateLimitDecision};
use crate::session::SESSION_COOKIE_NAME;
use crate::utils::extract_client_ip;

/// Request body for admin login
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// POST /admin/login
/// Verifies operator credentials and issues the session cookie.
///
/// The rate limiter is consulted BEFORE credentials are evaluated, so a
/// locked-out client is rejected even with the correct password. A
/// successful login clears the client's rate-limit entry.
pub async fn login(
    State(app_context): State<Arc<AppContext>>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    jar: CookieJar,
    Json(request): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let client_ip = extract_client_ip(&headers, peer.map(|ConnectInfo(addr)| addr));
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok());
    let client_id = LoginRateLimiter::client_id(client_ip.as_deref(), user_agent);

    let remaining = match app_context.rate_limiter.check(&client_id) {
        RateLimitDecision::Locked { retry_after_secs } => {
            metrics::LOGIN_LOCKOUTS_TOTAL.inc();
            tracing::warn!(
                ip = %client_ip.as_deref().unwrap_or("unknown"),
                retry_after_secs = retry_after_secs,
                "Login attempt rejected by rate limiter"
            );
            return Err(AppError::RateLimited { retry_after_secs });
        }
        RateLimitDecision::Allowed { remaining } => remaining,
    };

    // Constant-time username comparison; the password check goes through
    // bcrypt which is constant-time by construction.
    let username_ok: bool = request
        .username
        .as_bytes()
        .ct_eq(app_context.config.admin_username.as_bytes())
        .into();
    let password_ok =
        bcrypt::verify(&request.password, &app_context.config.admin_password_hash)
            .unwrap_or(false);

    if !(username_ok && password_ok) {
        metrics::LOGIN_FAILURES_TOTAL.inc();
        tracing::warn!(
            ip = %client_ip.as_deref().unwrap_or("unknown"),
            remaining_attempts = remaining,
            "Invalid admin credentials"
        );
        return Err(AppError::auth("Invalid username or password"));
    }

    app_context.rate_limiter.reset(&client_id);

    let (token, expires_at) = app_context.sessions.issue(&request.username);
    let jar = jar.add(app_context.sessions.session_cookie(token));

    tracing::info!(username = %request.username, "Admin logged in");

    Ok((
        StatusCode::OK,
        jar,
        Json(json!({
            "success": true,
            "expiresAt": expires_at.to_rfc3339(),
        })),
    ))
}

/// GET /admin/login
/// Session probe: reports whether the caller holds a valid session.
pub async fn session_probe(
    State(app_context): State<Arc<AppContext>>,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    let claims = jar
        .get(SESSION_COOKIE_NAME)
        .and_then(|cookie| app_context.sessions.verify(cookie.value()).ok());

    match claims {
        Some(claims) => Ok((
            StatusCode::OK,
            Json(json!({
                "authenticated": true,
                "username": claims.username,
                "expiresAt": claims.expires_at.to_rfc3339(),
            })),
        )),
        None => Err(AppError::auth("Not authenticated")),
    }
}

/// DELETE /admin/login
/// Logout. Clears the session cookie unconditionally; calling it without a
/// valid session is a harmless no-op, so it stays idempotent.
pub async fn logout(
    State(app_context): State<Arc<AppContext>>,
    jar: CookieJar,
) -> impl IntoResponse {
    let jar = jar.add(app_context.sessions.clear_cookie());

    (StatusCode::OK, jar, Json(json!({ "success": true })))
}
