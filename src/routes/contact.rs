// ============================================================================
// Contact Intake Routes
// ============================================================================
//
// Endpoints:
// - POST /contact - Accept a public contact/booking form submission
//
// ============================================================================

use axum::{
    Json,
    extract::{ConnectInfo, State},
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::context::AppContext;
use crate::error::AppError;
use crate::message::NewMessage;
use crate::metrics;
use crate::utils::{extract_client_ip, log_safe_id};

/// Request body for a contact/booking submission. Only name and email are
/// required; the form sends whatever the visitor filled in.
#[derive(Debug, Deserialize)]
pub struct ContactRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub message: String,
    /// Which service line the inquiry concerns
    #[serde(default)]
    pub subject: Option<String>,
    /// Preferred booking date (free-form, as entered)
    #[serde(default)]
    pub date: Option<String>,
    /// Preferred booking time
    #[serde(default)]
    pub time: Option<String>,
}

/// POST /contact
/// Validates and persists an untrusted public submission.
///
/// The acknowledgement is deliberately generic: no internal id leaks to the
/// public caller, and store failures surface as a generic server error.
pub async fn submit_contact(
    State(app_context): State<Arc<AppContext>>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    Json(request): Json<ContactRequest>,
) -> Result<impl IntoResponse, AppError> {
    let name = request.name.trim();
    let email = request.email.trim();
    if name.is_empty() || email.is_empty() {
        return Err(AppError::validation("Name and email are required"));
    }

    // Best-effort origin metadata for later moderation/audit context
    let ip_address = extract_client_ip(&headers, peer.map(|ConnectInfo(addr)| addr));
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string());

    let submission = NewMessage {
        name: name.to_string(),
        email: email.to_string(),
        phone: request.phone.filter(|v| !v.is_empty()),
        company: request.company.filter(|v| !v.is_empty()),
        message: request.message,
        service: request.subject.filter(|v| !v.is_empty()),
        preferred_date: request.date.filter(|v| !v.is_empty()),
        preferred_time: request.time.filter(|v| !v.is_empty()),
        ip_address,
        user_agent,
    };

    let receipt = app_context.store.insert(&submission).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to persist contact submission");
        AppError::store(e.to_string())
    })?;

    metrics::CONTACT_SUBMISSIONS_TOTAL.inc();
    tracing::info!(
        message_id = receipt.id,
        submitter_hash = %log_safe_id(&submission.email, &app_context.config.hash_salt),
        "Contact submission stored"
    );

    Ok((
        StatusCode::OK,
        Json(json!({
            "success": true,
            "message": "Thank you for your inquiry. We will get back to you shortly."
        })),
    ))
}
