// ============================================================================
// Session Authenticator
// ============================================================================
//
// Issues and validates the operator session token carried in an HttpOnly
// SameSite=Lax cookie. Tokens are HMAC-SHA256 signed over
// `username.expiry.nonce`; the MAC is verified on every admin request, so
// cookie presence alone proves nothing.
//
// ============================================================================

use anyhow::{Context, Result, bail};
use axum_extra::extract::cookie::{Cookie, SameSite};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use uuid::Uuid;

use crate::config::{Config, SESSION_TTL_DAYS};

/// Name of the operator session cookie
pub const SESSION_COOKIE_NAME: &str = "admin_session";

type HmacSha256 = Hmac<Sha256>;

/// Verified contents of a session token.
#[derive(Debug, Clone)]
pub struct SessionClaims {
    pub username: String,
    pub expires_at: DateTime<Utc>,
}

/// Creates and verifies session tokens and builds their cookies.
pub struct SessionManager {
    mac: HmacSha256,
    ttl: Duration,
    cookie_secure: bool,
}

impl SessionManager {
    pub fn new(config: &Config) -> Result<Self> {
        let mac = HmacSha256::new_from_slice(config.session_secret.as_bytes())
            .context("Failed to initialize session signing key")?;
        Ok(Self {
            mac,
            ttl: Duration::days(SESSION_TTL_DAYS),
            cookie_secure: config.cookie_secure,
        })
    }

    /// Issues a signed token for the given operator.
    pub fn issue(&self, username: &str) -> (String, DateTime<Utc>) {
        let expires_at = Utc::now() + self.ttl;
        let nonce = Uuid::new_v4();
        let payload = format!("{}.{}.{}", username, expires_at.timestamp(), nonce);
        (self.sign_payload(&payload), expires_at)
    }

    /// Verifies signature and expiry of a presented token.
    pub fn verify(&self, token: &str) -> Result<SessionClaims> {
        let (payload_b64, mac_b64) = token
            .split_once('|')
            .context("Malformed session token")?;

        let payload = URL_SAFE_NO_PAD
            .decode(payload_b64)
            .context("Malformed session token payload")?;
        let mac_bytes = URL_SAFE_NO_PAD
            .decode(mac_b64)
            .context("Malformed session token signature")?;

        // Constant-time comparison via the Mac verifier
        let mut mac = self.mac.clone();
        mac.update(&payload);
        mac.verify_slice(&mac_bytes)
            .context("Session token signature mismatch")?;

        let payload = String::from_utf8(payload).context("Session token payload is not UTF-8")?;
        // Payload layout: username.expiry.nonce; the username may itself
        // contain dots, so parse from the right.
        let mut parts = payload.rsplitn(3, '.');
        let _nonce = parts.next().context("Session token missing nonce")?;
        let expiry = parts.next().context("Session token missing expiry")?;
        let username = parts.next().context("Session token missing username")?;

        let expiry: i64 = expiry.parse().context("Session token expiry is not a number")?;
        let expires_at = DateTime::<Utc>::from_timestamp(expiry, 0)
            .context("Session token expiry out of range")?;

        if expires_at <= Utc::now() {
            bail!("Session expired");
        }

        Ok(SessionClaims {
            username: username.to_string(),
            expires_at,
        })
    }

    fn sign_payload(&self, payload: &str) -> String {
        let mut mac = self.mac.clone();
        mac.update(payload.as_bytes());
        let signature = mac.finalize().into_bytes();
        format!(
            "{}|{}",
            URL_SAFE_NO_PAD.encode(payload.as_bytes()),
            URL_SAFE_NO_PAD.encode(signature)
        )
    }

    /// Builds the session cookie carrying a freshly issued token.
    pub fn session_cookie(&self, token: String) -> Cookie<'static> {
        let mut cookie = Cookie::new(SESSION_COOKIE_NAME, token);
        cookie.set_http_only(true);
        cookie.set_same_site(SameSite::Lax);
        cookie.set_path("/");
        cookie.set_secure(self.cookie_secure);
        cookie.set_max_age(time::Duration::days(SESSION_TTL_DAYS));
        cookie
    }

    /// Builds an expired cookie that clears the session client-side.
    pub fn clear_cookie(&self) -> Cookie<'static> {
        let mut cookie = Cookie::new(SESSION_COOKIE_NAME, "");
        cookie.set_http_only(true);
        cookie.set_same_site(SameSite::Lax);
        cookie.set_path("/");
        cookie.set_secure(self.cookie_secure);
        cookie.set_max_age(time::Duration::ZERO);
        cookie
    }
}
