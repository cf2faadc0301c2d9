// ============================================
// File: crates/cipherchat-common/src/time.rs
// ============================================
//! # Time Utilities
//!
//! ## Creation Reason
//! Session expiry and message timestamps need two different clocks:
//! a monotonic one for TTL decisions and a wall clock for events that
//! leave the process.
//!
//! ## Main Functionality
//! - `Timestamp`: Unix time in milliseconds, carried in relay events
//! - `has_expired`: Monotonic TTL check shared by lookups and the sweep
//!
//! ## ⚠️ Important Note for Next Developer
//! - Never use `Timestamp` for expiry; wall clocks jump
//! - `has_expired` takes `now` explicitly so the sweep can be tested
//!   without sleeping
//!
//! ## Last Modified
//! v0.1.0 - Millisecond timestamps and TTL helper

use std::fmt;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

// ============================================
// Timestamp
// ============================================

/// Unix timestamp in milliseconds.
///
/// # Example
/// ```
/// use cipherchat_common::time::Timestamp;
///
/// let ts = Timestamp::now();
/// assert!(ts.as_millis() > 0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Creates a timestamp from milliseconds since the Unix epoch.
    #[must_use]
    pub const fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Returns the current wall-clock time.
    ///
    /// A clock set before 1970 yields zero rather than a negative value.
    #[must_use]
    pub fn now() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
            .unwrap_or(0);
        Self(millis)
    }

    /// Returns milliseconds since the Unix epoch.
    #[must_use]
    pub const fn as_millis(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

impl From<i64> for Timestamp {
    fn from(millis: i64) -> Self {
        Self(millis)
    }
}

// ============================================
// Expiry
// ============================================

/// Returns `true` once strictly more than `ttl` has passed since `created`.
///
/// An age exactly equal to `ttl` is still live. A `now` earlier than
/// `created` counts as zero age.
#[must_use]
pub fn has_expired(created: Instant, ttl: Duration, now: Instant) -> bool {
    now.saturating_duration_since(created) > ttl
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_now_is_recent() {
        let ts = Timestamp::now();
        // After 2020-01-01
        assert!(ts.as_millis() > 1_577_836_800_000);
    }

    #[test]
    fn test_timestamp_json_is_plain_number() {
        let ts = Timestamp::from_millis(1_700_000_000_123);
        assert_eq!(serde_json::to_string(&ts).unwrap(), "1700000000123");
    }

    #[test]
    fn test_has_expired_boundary() {
        let created = Instant::now();
        let ttl = Duration::from_secs(60);

        assert!(!has_expired(created, ttl, created));
        assert!(!has_expired(created, ttl, created + ttl));
        assert!(has_expired(created, ttl, created + ttl + Duration::from_millis(1)));
    }

    #[test]
    fn test_has_expired_clock_before_creation() {
        let now = Instant::now();
        let created = now + Duration::from_secs(5);
        assert!(!has_expired(created, Duration::ZERO, now));
    }
}
