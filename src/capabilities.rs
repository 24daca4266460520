//! Capabilities injected by the embedding application.
//!
//! The crate keeps no process-wide mutable state. Anything that must be shared
//! between requests (a cache of repository fetches, per-submitter rate limits)
//! is owned by the caller and handed in through these traits.

use std::time::Duration;

use async_trait::async_trait;

/// Key/value cache with caller-owned expiry.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Returns the cached value for `key`, or `None` on a miss.
    async fn get(&self, key: &str) -> Option<String>;

    /// Stores `value` under `key` for at most `ttl`.
    async fn set(&self, key: &str, value: String, ttl: Duration);
}

/// Admission control keyed by an arbitrary subject (usually the submitter).
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Returns true if the subject may proceed right now.
    async fn try_acquire(&self, subject_key: &str) -> bool;
}
