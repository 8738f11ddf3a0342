use std::sync::Arc;

use crate::config::Config;
use crate::ratelimit::LoginRateLimiter;
use crate::session::SessionManager;
use crate::store::MessageStore;

/// Application context containing shared dependencies
/// This reduces parameter passing and makes it easier to add new dependencies
pub struct AppContext {
    pub store: Arc<dyn MessageStore>,
    pub sessions: SessionManager,
    pub rate_limiter: Arc<LoginRateLimiter>,
    pub config: Arc<Config>,
}

impl AppContext {
    /// Creates a new application context
    pub fn new(
        store: Arc<dyn MessageStore>,
        sessions: SessionManager,
        rate_limiter: Arc<LoginRateLimiter>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            store,
            sessions,
            rate_limiter,
            config,
        }
    }
}
