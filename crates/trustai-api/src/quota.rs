use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Utc};

/// Outcome of one admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaDecision {
    pub allowed: bool,
    pub remaining: u32,
    /// When a rejected identity regains a slot. `None` when admitted.
    pub reset_time: Option<DateTime<Utc>>,
}

/// Sliding-window request counter keyed by client identity.
///
/// Lives for the lifetime of the process and starts empty; nothing is
/// persisted, so admission is exact only within a single instance. The
/// read-prune-decide-append sequence runs under one lock, so two concurrent
/// requests can never both take the last slot.
pub struct SlidingWindowQuota {
    limit: u32,
    window: Duration,
    usage: Mutex<HashMap<String, VecDeque<DateTime<Utc>>>>,
}

impl SlidingWindowQuota {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            limit,
            window,
            usage: Mutex::new(HashMap::new()),
        }
    }

    /// Guest quota: `limit` requests per trailing 24 hours.
    pub fn daily(limit: u32) -> Self {
        Self::new(limit, Duration::hours(24))
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn check_and_consume(&self, identity: &str) -> QuotaDecision {
        self.check_and_consume_at(identity, Utc::now())
    }

    pub fn check_and_consume_at(&self, identity: &str, now: DateTime<Utc>) -> QuotaDecision {
        let cutoff = now - self.window;
        let mut usage = self.lock();
        let timestamps = usage.entry(identity.to_string()).or_default();

        while timestamps.front().is_some_and(|ts| *ts <= cutoff) {
            timestamps.pop_front();
        }

        let live = u32::try_from(timestamps.len()).unwrap_or(u32::MAX);
        if live >= self.limit {
            return QuotaDecision {
                allowed: false,
                remaining: 0,
                reset_time: timestamps.front().map(|oldest| *oldest + self.window),
            };
        }

        timestamps.push_back(now);
        QuotaDecision {
            allowed: true,
            remaining: self.limit - live - 1,
            reset_time: None,
        }
    }

    pub fn peek(&self, identity: &str) -> u32 {
        self.peek_at(identity, Utc::now())
    }

    /// Remaining slots without consuming one or mutating state.
    pub fn peek_at(&self, identity: &str, now: DateTime<Utc>) -> u32 {
        let cutoff = now - self.window;
        let usage = self.lock();
        let live = usage
            .get(identity)
            .map_or(0, |timestamps| timestamps.iter().filter(|ts| **ts > cutoff).count());
        self.limit
            .saturating_sub(u32::try_from(live).unwrap_or(u32::MAX))
    }

    /// Drop identities with no live timestamps. Returns how many were removed.
    pub fn prune_idle_at(&self, now: DateTime<Utc>) -> usize {
        let cutoff = now - self.window;
        let mut usage = self.lock();
        let before = usage.len();
        usage.retain(|_, timestamps| timestamps.back().is_some_and(|newest| *newest > cutoff));
        before - usage.len()
    }

    pub fn tracked_identities(&self) -> usize {
        self.lock().len()
    }

    // Every mutation leaves the map consistent, so a poisoned lock is safe to reuse.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, VecDeque<DateTime<Utc>>>> {
        self.usage.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
