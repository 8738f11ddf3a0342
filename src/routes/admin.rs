// ============================================================================
// Moderation Routes
// ============================================================================
//
// Endpoints (session required):
// - GET /admin/messages - List messages with status filter, search, paging
// - PATCH /admin/messages - Transition a message's status
// - DELETE /admin/messages?id= - Delete a message
// - GET /admin/stats - Aggregate counters (bounded timeout, zeros fallback)
//
// ============================================================================

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use crate::config::STATS_TIMEOUT_SECS;
use crate::context::AppContext;
use crate::error::AppError;
use crate::message::{MessageFilter, MessageStats, MessageStatus};
use crate::routes::extractors::AdminSession;

/// Query parameters for the message listing
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    /// One of unread/read/archived, or "all"/unset for no filter
    pub status: Option<String>,
    /// Case-insensitive substring search over name, email, message
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Parses an optional status filter; "all", the empty string and absence all
/// mean "no filter".
pub(super) fn parse_status_filter(raw: Option<&str>) -> Result<Option<MessageStatus>, AppError> {
    match raw {
        None | Some("") | Some("all") => Ok(None),
        Some(value) => MessageStatus::parse(value).map(Some).ok_or_else(|| {
            AppError::validation(format!(
                "Invalid status '{}': expected one of unread, read, archived",
                value
            ))
        }),
    }
}

/// GET /admin/messages
pub async fn list_messages(
    State(app_context): State<Arc<AppContext>>,
    _session: AdminSession,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let filter = MessageFilter {
        status: parse_status_filter(query.status.as_deref())?,
        search: query.search.filter(|s| !s.is_empty()),
        limit: query.limit,
        offset: query.offset,
    };

    let messages = app_context.store.query(&filter).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to list messages");
        AppError::store(e.to_string())
    })?;

    Ok((
        StatusCode::OK,
        Json(json!({
            "success": true,
            "count": messages.len(),
            "messages": messages,
        })),
    ))
}

/// Request body for a status transition
#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub id: i64,
    pub status: String,
}

/// PATCH /admin/messages
/// Transitions a message to the requested status. Unknown ids are a
/// successful no-op (moderation actions are idempotent); unknown status
/// values are rejected and leave the row unchanged.
pub async fn update_message_status(
    State(app_context): State<Arc<AppContext>>,
    _session: AdminSession,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<impl IntoResponse, AppError> {
    let status = MessageStatus::parse(&request.status).ok_or_else(|| {
        AppError::validation(format!(
            "Invalid status '{}': expected one of unread, read, archived",
            request.status
        ))
    })?;

    app_context
        .store
        .update_status(request.id, status)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, id = request.id, "Failed to update message status");
            AppError::store(e.to_string())
        })?;

    tracing::info!(id = request.id, status = %status, "Message status updated");

    Ok((StatusCode::OK, Json(json!({ "success": true }))))
}

/// Query parameters for message deletion
#[derive(Debug, Deserialize)]
pub struct DeleteQuery {
    pub id: Option<i64>,
}

/// DELETE /admin/messages?id=
/// Removes a message regardless of its current status. Deleting an already
/// deleted id succeeds as a no-op.
pub async fn delete_message(
    State(app_context): State<Arc<AppContext>>,
    _session: AdminSession,
    Query(query): Query<DeleteQuery>,
) -> Result<impl IntoResponse, AppError> {
    let id = query
        .id
        .ok_or_else(|| AppError::validation("Missing message id"))?;

    app_context.store.delete(id).await.map_err(|e| {
        tracing::error!(error = %e, id = id, "Failed to delete message");
        AppError::store(e.to_string())
    })?;

    tracing::info!(id = id, "Message deleted");

    Ok((StatusCode::OK, Json(json!({ "success": true }))))
}

/// GET /admin/stats
/// Aggregate dashboard counters.
///
/// A slow or failing aggregation must never block or fail the admin page
/// load: the call is bounded by a timeout and degrades to zero-valued stats.
pub async fn stats(
    State(app_context): State<Arc<AppContext>>,
    _session: AdminSession,
) -> Result<impl IntoResponse, AppError> {
    let stats = match tokio::time::timeout(
        Duration::from_secs(STATS_TIMEOUT_SECS),
        app_context.store.stats(),
    )
    .await
    {
        Ok(Ok(stats)) => stats,
        Ok(Err(e)) => {
            tracing::error!(error = %e, "Stats aggregation failed, serving zeros");
            MessageStats::zero()
        }
        Err(_) => {
            tracing::warn!(
                timeout_secs = STATS_TIMEOUT_SECS,
                "Stats aggregation timed out, serving zeros"
            );
            MessageStats::zero()
        }
    };

    Ok((
        StatusCode::OK,
        Json(json!({
            "success": true,
            "stats": stats,
        })),
    ))
}
