//! Edit rate limiting.
//!
//! Commons bot policy asks for at most one edit every five seconds. A
//! [`RateLimiter`] remembers when the last successful edit happened and makes
//! the next attempt wait out the remainder of the interval.
//!
//! Limiters are handed out by [`RateLimits`], one per identity, so concurrent
//! batch runs for the same user in the same process share the interval.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep_until};

pub const DEFAULT_EDIT_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct RateLimiter {
    interval: Duration,
    last: Option<Instant>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_EDIT_INTERVAL)
    }
}

impl RateLimiter {
    pub fn new(interval: Duration) -> Self {
        Self { interval, last: None }
    }

    /// Time of the last successful edit, if any.
    pub fn last(&self) -> Option<Instant> {
        self.last
    }

    /// Waits until at least the configured interval has passed since the
    /// last [`mark`](Self::mark). Returns immediately if nothing was marked.
    pub async fn wait(&self) {
        if let Some(last) = self.last {
            let ready = last + self.interval;
            if ready > Instant::now() {
                tracing::debug!(remaining = ?(ready - Instant::now()), "Waiting before next edit");
                sleep_until(ready).await;
            }
        }
    }

    /// Records a successful edit.
    pub fn mark(&mut self) {
        self.last = Some(Instant::now());
    }
}

/// Shared limiters, keyed by username.
#[derive(Debug)]
pub struct RateLimits {
    interval: Duration,
    limiters: Mutex<HashMap<String, Arc<Mutex<RateLimiter>>>>,
}

impl Default for RateLimits {
    fn default() -> Self {
        Self::new(DEFAULT_EDIT_INTERVAL)
    }
}

impl RateLimits {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            limiters: Mutex::new(HashMap::new()),
        }
    }

    /// The limiter for `user`, created on first use.
    pub async fn for_user(&self, user: &str) -> Arc<Mutex<RateLimiter>> {
        let mut limiters = self.limiters.lock().await;
        let limiter = limiters
            .entry(user.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(RateLimiter::new(self.interval))));
        Arc::clone(limiter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_first_wait_is_immediate() {
        let limiter = RateLimiter::default();
        let start = Instant::now();
        limiter.wait().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_out_remaining_interval() {
        let mut limiter = RateLimiter::default();
        limiter.mark();
        let marked = Instant::now();
        tokio::time::advance(Duration::from_secs(2)).await;
        limiter.wait().await;
        assert_eq!(marked.elapsed(), Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_wait_after_interval() {
        let mut limiter = RateLimiter::new(Duration::from_secs(5));
        limiter.mark();
        tokio::time::advance(Duration::from_secs(7)).await;
        let start = Instant::now();
        limiter.wait().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_limits_shared_per_user() {
        let limits = RateLimits::new(Duration::from_secs(5));
        let a = limits.for_user("Alice").await;
        let b = limits.for_user("Alice").await;
        let c = limits.for_user("Bob").await;
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
        a.lock().await.mark();
        assert!(b.lock().await.last().is_some());
        assert!(c.lock().await.last().is_none());
    }
}
