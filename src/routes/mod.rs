// ============================================================================
// Axum Routes Module
// ============================================================================
//
// Structure:
// - mod.rs: Main router assembly and middleware layering
// - contact.rs: Public contact form intake
// - login.rs: Admin login/logout/session probe (rate-limited)
// - admin.rs: Message moderation (list, status transitions, delete, stats)
// - export.rs: CSV/JSON export downloads
// - health.rs: Health check and metrics endpoints
// - extractors.rs: Custom Axum extractors (session cookie auth)
// - middleware.rs: Request logging, security headers
//
// ============================================================================

mod admin;
mod contact;
mod export;
mod extractors;
mod health;
mod login;
mod middleware;

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::context::AppContext;

/// Create the main application router with all routes
pub fn create_router(app_context: Arc<AppContext>) -> Router {
    Router::new()
        // Health and monitoring
        .route("/health", get(health::health_check))
        .route("/metrics", get(health::metrics))
        // Public contact form intake
        .route("/contact", post(contact::submit_contact))
        // Admin session lifecycle (login is rate-limited in the handler)
        .route(
            "/admin/login",
            post(login::login)
                .get(login::session_probe)
                .delete(login::logout),
        )
        // Moderation
        .route(
            "/admin/messages",
            get(admin::list_messages)
                .patch(admin::update_message_status)
                .delete(admin::delete_message),
        )
        .route("/admin/stats", get(admin::stats))
        // Export downloads
        .route("/admin/export", get(export::export_messages))
        // Apply middleware (order matters - last added runs first)
        .layer(
            ServiceBuilder::new()
                // Tracing layer (outermost - runs first)
                .layer(TraceLayer::new_for_http())
                // Request logging
                .layer(axum::middleware::from_fn(middleware::request_logging))
                // Security headers
                .layer(axum::middleware::from_fn(middleware::security_headers))
                .into_inner(),
        )
        .with_state(app_context)
}
