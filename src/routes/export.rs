// ============================================================================
// Export Routes
// ============================================================================
//
// Endpoints (session required):
// - GET /admin/export?format=json|csv&status= - Download a filtered export
//
// ============================================================================

use axum::{
    extract::{Query, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;

use crate::config::EXPORT_ROW_CAP;
use crate::context::AppContext;
use crate::error::AppError;
use crate::export::{ExportFormat, export_filename, to_csv, to_json};
use crate::message::MessageFilter;
use crate::metrics;
use crate::routes::admin::parse_status_filter;
use crate::routes::extractors::AdminSession;

/// Query parameters for an export download
#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    /// csv or json; defaults to json
    pub format: Option<String>,
    /// Optional status filter, same values as the listing
    pub status: Option<String>,
}

/// GET /admin/export
/// Serializes a filtered message set and serves it as a file download. The
/// operation is read-only; the payload is fully built in memory before being
/// sent, so a failure never looks like a complete file.
pub async fn export_messages(
    State(app_context): State<Arc<AppContext>>,
    _session: AdminSession,
    Query(query): Query<ExportQuery>,
) -> Result<impl IntoResponse, AppError> {
    let format = match query.format.as_deref() {
        None | Some("") => ExportFormat::Json,
        Some(value) => ExportFormat::parse(value).ok_or_else(|| {
            AppError::validation(format!(
                "Invalid export format '{}': expected csv or json",
                value
            ))
        })?,
    };

    let filter = MessageFilter {
        status: parse_status_filter(query.status.as_deref())?,
        search: None,
        // Safety cap, not pagination: exports are point-in-time snapshots
        limit: Some(EXPORT_ROW_CAP),
        offset: None,
    };

    let messages = app_context.store.query(&filter).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to read messages for export");
        AppError::store(e.to_string())
    })?;

    let body = match format {
        ExportFormat::Csv => to_csv(&messages),
        ExportFormat::Json => to_json(&messages),
    }
    .map_err(|e| {
        tracing::error!(error = %e, "Failed to serialize export");
        AppError::export(e.to_string())
    })?;

    let filename = export_filename(format, Utc::now().date_naive());
    metrics::EXPORTS_TOTAL.inc();
    tracing::info!(
        rows = messages.len(),
        format = format.extension(),
        "Export served"
    );

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, format.content_type().to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        body,
    ))
}
