// ============================================================================
// Login Rate Limiter
// ============================================================================
//
// In-process, per-client counter that bounds credential-guessing against the
// admin login endpoint. Single-instance by design: it does not coordinate
// across server processes. Horizontally scaled deployments need a shared
// counter store instead.
//
// ============================================================================

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::config::{
    RATE_LIMIT_LOCKOUT_SECS, RATE_LIMIT_MAX_ATTEMPTS, RATE_LIMIT_WINDOW_SECS,
};

/// Per-client login attempt counter.
#[derive(Debug, Clone, Copy)]
struct AttemptEntry {
    attempts: u32,
    first_attempt: DateTime<Utc>,
    locked_until: Option<DateTime<Utc>>,
}

impl AttemptEntry {
    fn fresh(now: DateTime<Utc>) -> Self {
        Self {
            attempts: 1,
            first_attempt: now,
            locked_until: None,
        }
    }
}

/// Outcome of a rate-limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    /// The attempt may proceed; `remaining` attempts are left in the window.
    Allowed { remaining: u32 },
    /// The client is locked out; reject without evaluating credentials.
    Locked { retry_after_secs: i64 },
}

/// Bounds login attempts per client identifier.
///
/// Mutations are short, synchronous, single-key read-modify-write operations
/// with no cross-key invariants, so a plain mutex around the map is enough.
/// The limiter is an owned, injected value (not a module global) so tests
/// can instantiate isolated instances.
pub struct LoginRateLimiter {
    entries: Mutex<HashMap<String, AttemptEntry>>,
    window: Duration,
    lockout: Duration,
    max_attempts: u32,
}

impl LoginRateLimiter {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            window: Duration::seconds(RATE_LIMIT_WINDOW_SECS),
            lockout: Duration::seconds(RATE_LIMIT_LOCKOUT_SECS),
            max_attempts: RATE_LIMIT_MAX_ATTEMPTS,
        }
    }

    /// Derives the client identifier: origin address plus a truncated
    /// user-agent, so distinct browsers behind one NAT do not share a
    /// counter.
    pub fn client_id(ip: Option<&str>, user_agent: Option<&str>) -> String {
        let ua = user_agent.unwrap_or("");
        let ua_prefix: String = ua.chars().take(32).collect();
        format!("{}|{}", ip.unwrap_or("unknown"), ua_prefix)
    }

    /// Records an attempt and decides whether it may proceed. Must be called
    /// before evaluating credentials.
    pub fn check(&self, client_id: &str) -> RateLimitDecision {
        self.check_at(client_id, Utc::now())
    }

    fn check_at(&self, client_id: &str, now: DateTime<Utc>) -> RateLimitDecision {
        let mut entries = self.lock();

        let entry = match entries.get_mut(client_id) {
            None => {
                entries.insert(client_id.to_string(), AttemptEntry::fresh(now));
                return RateLimitDecision::Allowed {
                    remaining: self.max_attempts.saturating_sub(1),
                };
            }
            Some(entry) => entry,
        };

        if let Some(locked_until) = entry.locked_until {
            if now < locked_until {
                let retry_after_secs = (locked_until - now).num_seconds().max(1);
                return RateLimitDecision::Locked { retry_after_secs };
            }
            // Lockout expired: start a fresh window
            *entry = AttemptEntry::fresh(now);
            return RateLimitDecision::Allowed {
                remaining: self.max_attempts.saturating_sub(1),
            };
        }

        if now - entry.first_attempt >= self.window {
            // Sliding window elapsed with no lockout: count resets to 1
            *entry = AttemptEntry::fresh(now);
            return RateLimitDecision::Allowed {
                remaining: self.max_attempts.saturating_sub(1),
            };
        }

        entry.attempts += 1;
        if entry.attempts > self.max_attempts {
            entry.locked_until = Some(now + self.lockout);
            RateLimitDecision::Locked {
                retry_after_secs: self.lockout.num_seconds(),
            }
        } else {
            RateLimitDecision::Allowed {
                remaining: self.max_attempts - entry.attempts,
            }
        }
    }

    /// Clears the entry for a client. Called exactly once, on successful
    /// login.
    pub fn reset(&self, client_id: &str) {
        self.lock().remove(client_id);
    }

    /// Drops entries whose lockout has passed or whose window has expired
    /// with no lockout. Returns the number of removed entries.
    pub fn sweep(&self) -> usize {
        self.sweep_at(Utc::now())
    }

    fn sweep_at(&self, now: DateTime<Utc>) -> usize {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, entry| match entry.locked_until {
            Some(locked_until) => now < locked_until,
            None => now - entry.first_attempt < self.window,
        });
        before - entries.len()
    }

    /// Number of live entries (for the sweeper's log line).
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, AttemptEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for LoginRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

/// Background task that periodically garbage-collects expired entries,
/// bounding the limiter's memory growth.
pub async fn run_sweeper(limiter: Arc<LoginRateLimiter>, interval: std::time::Duration) {
    tracing::info!(
        interval_secs = interval.as_secs(),
        "Starting rate limiter sweep task"
    );

    let mut ticker = tokio::time::interval(interval);
    // The first tick fires immediately; skip it so a fresh server does not
    // sweep an empty map.
    ticker.tick().await;

    loop {
        ticker.tick().await;

        let removed = limiter.sweep();
        if removed > 0 {
            tracing::info!(
                removed = removed,
                remaining = limiter.len(),
                "Swept expired rate limit entries"
            );
        } else {
            tracing::debug!(
                remaining = limiter.len(),
                "No expired rate limit entries to sweep"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter() -> LoginRateLimiter {
        LoginRateLimiter::new()
    }

    #[test]
    fn first_attempt_is_allowed() {
        let rl = limiter();
        assert_eq!(
            rl.check_at("c", Utc::now()),
            RateLimitDecision::Allowed { remaining: 4 }
        );
    }

    #[test]
    fn sixth_attempt_in_window_locks_out() {
        let rl = limiter();
        let now = Utc::now();

        for i in 0..5 {
            let decision = rl.check_at("c", now + Duration::seconds(i));
            assert!(
                matches!(decision, RateLimitDecision::Allowed { .. }),
                "attempt {} should be allowed",
                i + 1
            );
        }

        match rl.check_at("c", now + Duration::seconds(5)) {
            RateLimitDecision::Locked { retry_after_secs } => {
                assert!(retry_after_secs > 0);
                assert!(retry_after_secs <= RATE_LIMIT_LOCKOUT_SECS);
            }
            other => panic!("expected lockout, got {:?}", other),
        }
    }

    #[test]
    fn remaining_counts_down() {
        let rl = limiter();
        let now = Utc::now();
        let mut seen = Vec::new();
        for i in 0..5 {
            if let RateLimitDecision::Allowed { remaining } =
                rl.check_at("c", now + Duration::seconds(i))
            {
                seen.push(remaining);
            }
        }
        assert_eq!(seen, vec![4, 3, 2, 1, 0]);
    }

    #[test]
    fn lockout_rejects_until_expiry() {
        let rl = limiter();
        let now = Utc::now();
        for i in 0..6 {
            rl.check_at("c", now + Duration::seconds(i));
        }

        // Mid-lockout: still rejected, retry-after shrinks
        let mid = now + Duration::minutes(15);
        match rl.check_at("c", mid) {
            RateLimitDecision::Locked { retry_after_secs } => {
                assert!(retry_after_secs <= RATE_LIMIT_LOCKOUT_SECS - 14 * 60);
                assert!(retry_after_secs > 0);
            }
            other => panic!("expected lockout, got {:?}", other),
        }

        // After the lockout passes, the counter starts fresh
        let after = now + Duration::minutes(31);
        assert_eq!(
            rl.check_at("c", after),
            RateLimitDecision::Allowed { remaining: 4 }
        );
    }

    #[test]
    fn window_expiry_resets_counter() {
        let rl = limiter();
        let now = Utc::now();
        for i in 0..4 {
            rl.check_at("c", now + Duration::seconds(i));
        }

        let later = now + Duration::minutes(16);
        assert_eq!(
            rl.check_at("c", later),
            RateLimitDecision::Allowed { remaining: 4 }
        );
    }

    #[test]
    fn reset_clears_the_entry() {
        let rl = limiter();
        let now = Utc::now();
        for i in 0..5 {
            rl.check_at("c", now + Duration::seconds(i));
        }
        rl.reset("c");
        assert_eq!(
            rl.check_at("c", now + Duration::seconds(6)),
            RateLimitDecision::Allowed { remaining: 4 }
        );
    }

    #[test]
    fn clients_are_isolated() {
        let rl = limiter();
        let now = Utc::now();
        for i in 0..6 {
            rl.check_at("a", now + Duration::seconds(i));
        }
        assert!(matches!(
            rl.check_at("b", now),
            RateLimitDecision::Allowed { remaining: 4 }
        ));
    }

    #[test]
    fn sweep_drops_expired_entries_only() {
        let rl = limiter();
        let now = Utc::now();

        rl.check_at("expired-window", now - Duration::minutes(20));
        rl.check_at("live", now);
        for i in 0..6 {
            rl.check_at("locked", now + Duration::seconds(i));
        }

        let removed = rl.sweep_at(now + Duration::minutes(1));
        assert_eq!(removed, 1);
        assert_eq!(rl.len(), 2);

        // Once the lockout lapses the locked entry goes too
        let removed = rl.sweep_at(now + Duration::minutes(45));
        assert_eq!(removed, 2);
        assert!(rl.is_empty());
    }

    #[test]
    fn client_id_truncates_user_agent() {
        let ua = "M".repeat(200);
        let id = LoginRateLimiter::client_id(Some("203.0.113.9"), Some(&ua));
        assert_eq!(id.len(), "203.0.113.9|".len() + 32);

        let id = LoginRateLimiter::client_id(None, None);
        assert_eq!(id, "unknown|");
    }
}
