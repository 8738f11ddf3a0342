use anyhow::{Context, Result};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;

// ============================================================================
// Configuration Constants
// ============================================================================

// Default port value
const DEFAULT_PORT: u16 = 8080;

// Documented insecure defaults, only used when the corresponding environment
// variables are unset. The server logs a warning at startup when they are in
// effect; they must never be used in production.
const DEFAULT_ADMIN_USERNAME: &str = "admin";
const DEFAULT_ADMIN_PASSWORD: &str = "admin123";

/// Session cookie lifetime (days)
pub const SESSION_TTL_DAYS: i64 = 7;

// Login rate limiting policy. These are fixed constants, not configuration:
// the thresholds are part of the abuse-mitigation contract.
pub const RATE_LIMIT_MAX_ATTEMPTS: u32 = 5;
pub const RATE_LIMIT_WINDOW_SECS: i64 = 15 * 60;
pub const RATE_LIMIT_LOCKOUT_SECS: i64 = 30 * 60;
pub const RATE_LIMIT_SWEEP_INTERVAL_SECS: u64 = 3600;

/// Safety cap on exported rows to bound memory use
pub const EXPORT_ROW_CAP: i64 = 10_000;

/// Bounded timeout for dashboard statistics aggregation (seconds).
/// A slow aggregation must never block the admin page load.
pub const STATS_TIMEOUT_SECS: u64 = 5;

// Listing pagination bounds
pub const DEFAULT_PAGE_LIMIT: i64 = 50;
pub const MAX_PAGE_LIMIT: i64 = 500;

// ============================================================================
// Configuration Structure
// ============================================================================

#[derive(Clone, Debug)]
pub struct Config {
    /// HTTP listen port
    pub port: u16,
    /// Postgres connection string. When unset the server falls back to the
    /// in-memory store (local development only).
    pub database_url: Option<String>,
    /// Admin operator username
    pub admin_username: String,
    /// bcrypt hash of the admin operator password
    pub admin_password_hash: String,
    /// Secret key for signing session tokens
    pub session_secret: String,
    /// Whether session cookies carry the Secure flag (set behind TLS)
    pub cookie_secure: bool,
    /// Salt for log-safe identifier hashing
    pub hash_salt: String,
    /// Tracing filter directive (RUST_LOG)
    pub rust_log: String,
    /// True when the documented insecure default credentials are in effect
    pub default_admin_password: bool,
    /// True when the session secret was generated at startup (sessions will
    /// not survive a restart)
    pub generated_session_secret: bool,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// Recognized variables: PORT, DATABASE_URL, ADMIN_USERNAME,
    /// ADMIN_PASSWORD_HASH (preferred) or ADMIN_PASSWORD, SESSION_SECRET,
    /// COOKIE_SECURE, LOG_HASH_SALT, RUST_LOG.
    pub fn from_env() -> Result<Self> {
        let port = match std::env::var("PORT") {
            Ok(v) => v.parse::<u16>().context("PORT is not a valid port number")?,
            Err(_) => DEFAULT_PORT,
        };

        let database_url = std::env::var("DATABASE_URL").ok().filter(|v| !v.is_empty());

        let admin_username = std::env::var("ADMIN_USERNAME")
            .unwrap_or_else(|_| DEFAULT_ADMIN_USERNAME.to_string());

        // Credentials are always compared against a bcrypt hash. A plaintext
        // ADMIN_PASSWORD is hashed once at startup; ADMIN_PASSWORD_HASH takes
        // precedence so deployments never have to put the plaintext in the
        // environment.
        let (admin_password_hash, default_admin_password) =
            match std::env::var("ADMIN_PASSWORD_HASH") {
                Ok(hash) if !hash.is_empty() => (hash, false),
                _ => match std::env::var("ADMIN_PASSWORD") {
                    Ok(password) if !password.is_empty() => (
                        bcrypt::hash(&password, bcrypt::DEFAULT_COST)
                            .context("Failed to hash ADMIN_PASSWORD")?,
                        false,
                    ),
                    _ => (
                        bcrypt::hash(DEFAULT_ADMIN_PASSWORD, bcrypt::DEFAULT_COST)
                            .context("Failed to hash default admin password")?,
                        true,
                    ),
                },
            };

        let (session_secret, generated_session_secret) = match std::env::var("SESSION_SECRET") {
            Ok(secret) if !secret.is_empty() => (secret, false),
            _ => (generate_secret(), true),
        };

        let cookie_secure = std::env::var("COOKIE_SECURE")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let hash_salt =
            std::env::var("LOG_HASH_SALT").unwrap_or_else(|_| "inquiry-log-salt".to_string());

        let rust_log = std::env::var("RUST_LOG")
            .unwrap_or_else(|_| "info,tower_http=warn,sqlx=warn".to_string());

        Ok(Self {
            port,
            database_url,
            admin_username,
            admin_password_hash,
            session_secret,
            cookie_secure,
            hash_salt,
            rust_log,
            default_admin_password,
            generated_session_secret,
        })
    }
}

fn generate_secret() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
