use std::{sync::Arc, time::Duration};

use tokio::task::JoinHandle;

use crate::{rate_limit::LoginRateLimiter, repository::RepositoryState};

pub const CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// run_cleanup
///
/// One maintenance pass: drops expired dealer sessions and forgets stale lock-out entries.
/// Returns the number of sessions removed.
pub async fn run_cleanup(repo: &RepositoryState, limiter: &LoginRateLimiter) -> u64 {
    limiter.prune().await;
    match repo.delete_expired_sessions().await {
        Ok(removed) => {
            if removed > 0 {
                tracing::info!(removed, "purged expired dealer sessions");
            }
            removed
        }
        Err(e) => {
            tracing::error!(error = %e, "expired session purge failed");
            0
        }
    }
}

/// spawn_cleanup_task
///
/// Runs `run_cleanup` every `interval` for the lifetime of the process.
pub fn spawn_cleanup_task(
    repo: RepositoryState,
    limiter: Arc<LoginRateLimiter>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            run_cleanup(&repo, &limiter).await;
        }
    })
}
