//! Failed-login lock-out, keyed by dealer email.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;

pub const MAX_FAILED_ATTEMPTS: u32 = 5;
pub const LOCKOUT_WINDOW_MINUTES: i64 = 15;

/// LoginRateLimiter
///
/// Counts login attempts per email inside a sliding window. Every attempt claims a
/// slot up front; only a successful login releases them. Once the budget is spent
/// the email is locked until the oldest attempt falls out of the window.
/// Lives in memory, so counters reset with the process.
pub struct LoginRateLimiter {
    attempts: RwLock<HashMap<String, Vec<DateTime<Utc>>>>,
    max_attempts: u32,
    window: Duration,
}

impl Default for LoginRateLimiter {
    fn default() -> Self {
        Self::new(MAX_FAILED_ATTEMPTS, Duration::minutes(LOCKOUT_WINDOW_MINUTES))
    }
}

impl LoginRateLimiter {
    pub fn new(max_attempts: u32, window: Duration) -> Self {
        Self {
            attempts: RwLock::new(HashMap::new()),
            max_attempts,
            window,
        }
    }

    fn key(email: &str) -> String {
        email.trim().to_lowercase()
    }

    /// reserve_attempt
    ///
    /// Claims one slot of the email's budget before the credentials are checked.
    /// Returns the attempts left should this one fail, or `None` while the email is
    /// locked out. Check and claim share one write lock: at most `max_attempts`
    /// logins per email are in flight or failed inside the window.
    /// A successful login hands its slot back through `clear`.
    pub async fn reserve_attempt(&self, email: &str) -> Option<u32> {
        let cutoff = Utc::now() - self.window;
        let mut attempts = self.attempts.write().await;
        let entries = attempts.entry(Self::key(email)).or_default();
        entries.retain(|at| *at > cutoff);

        let used = entries.len() as u32;
        if used >= self.max_attempts {
            return None;
        }
        entries.push(Utc::now());
        Some(self.max_attempts - used - 1)
    }

    pub async fn clear(&self, email: &str) {
        self.attempts.write().await.remove(&Self::key(email));
    }

    /// Forgets every entry whose failures have all aged out.
    pub async fn prune(&self) {
        let cutoff = Utc::now() - self.window;
        let mut attempts = self.attempts.write().await;
        attempts.retain(|_, entries| {
            entries.retain(|at| *at > cutoff);
            !entries.is_empty()
        });
    }
}
