use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use inquiry_server::config::{Config, RATE_LIMIT_SWEEP_INTERVAL_SECS};
use inquiry_server::context::AppContext;
use inquiry_server::ratelimit::{self, LoginRateLimiter};
use inquiry_server::routes;
use inquiry_server::session::SessionManager;
use inquiry_server::store::{InMemoryMessageStore, MessageStore, PostgresMessageStore};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Arc::new(Config::from_env()?);

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.rust_log.clone()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("=== Inquiry server starting ===");
    info!("Port: {}", config.port);

    if config.default_admin_password {
        tracing::warn!(
            "ADMIN_PASSWORD/ADMIN_PASSWORD_HASH not set; using the documented \
             insecure default credentials. Do NOT run production like this."
        );
    }
    if config.generated_session_secret {
        tracing::warn!(
            "SESSION_SECRET not set; generated a random secret. Sessions will \
             not survive a restart."
        );
    }

    // Initialize the persistent store. The Postgres store creates its schema
    // on demand, so a fresh database serves the first request without a
    // manual migration step.
    let store: Arc<dyn MessageStore> = match &config.database_url {
        Some(database_url) => {
            info!("Connecting to database...");
            let store = PostgresMessageStore::connect(database_url)
                .await
                .context("Failed to initialize message store")?;
            info!("Connected to database");
            Arc::new(store)
        }
        None => {
            tracing::warn!(
                "DATABASE_URL not set; using the in-memory store. Submissions \
                 will not survive a restart."
            );
            Arc::new(InMemoryMessageStore::new())
        }
    };

    // Login rate limiter with its periodic garbage-collection sweep
    let rate_limiter = Arc::new(LoginRateLimiter::new());
    tokio::spawn(ratelimit::run_sweeper(
        rate_limiter.clone(),
        Duration::from_secs(RATE_LIMIT_SWEEP_INTERVAL_SECS),
    ));

    let sessions = SessionManager::new(&config)?;

    let app_context = Arc::new(AppContext::new(
        store,
        sessions,
        rate_limiter,
        config.clone(),
    ));
    let app = routes::create_router(app_context);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received. Shutting down...");
}
