//! Per-key token bucket
//!
//! Refill is lazy: a bucket is only brought up to date when it is checked.
//! Each key's read-modify-write runs under that key's own mutex, so checks
//! on different keys never contend and checks on one key never overspend.
//! Eviction only drops a bucket whose refill interval has run out, so an
//! evicted key comes back exactly as full as lazy refill would have left it.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use super::clock::{Clock, SystemClock};

/// Bucket parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Tokens a bucket holds at most, and starts with
    pub capacity: u32,
    /// Tokens added per elapsed interval
    pub refill_amount: u32,
    /// Refill interval in milliseconds
    pub interval_ms: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            capacity: 20,
            refill_amount: 20,
            interval_ms: 60_000,
        }
    }
}

/// Outcome of one check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    /// A token was consumed
    Allowed { remaining: u32 },
    /// No token available; nothing was consumed
    Limited { reset_in_ms: u64 },
}

impl RateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateDecision::Allowed { .. })
    }
}

/// State of one key's bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateBucket {
    pub tokens: u32,
    /// Time of the last refill
    pub updated_at_ms: u64,
    /// Time of the last check, for idle eviction
    pub last_seen_ms: u64,
}

impl RateBucket {
    fn full(capacity: u32, now: u64) -> Self {
        Self {
            tokens: capacity,
            updated_at_ms: now,
            last_seen_ms: now,
        }
    }

    fn take(&mut self, config: &RateLimitConfig, now: u64) -> RateDecision {
        self.last_seen_ms = now;

        let elapsed = now.saturating_sub(self.updated_at_ms);
        if elapsed >= config.interval_ms {
            self.tokens = self
                .tokens
                .saturating_add(config.refill_amount)
                .min(config.capacity);
            self.updated_at_ms = now;
        }

        if self.tokens == 0 {
            let elapsed = now.saturating_sub(self.updated_at_ms);
            return RateDecision::Limited {
                reset_in_ms: config.interval_ms.saturating_sub(elapsed),
            };
        }

        self.tokens -= 1;
        RateDecision::Allowed {
            remaining: self.tokens,
        }
    }
}

/// Map entry. `evicted` is set under the slot lock when eviction removes it,
/// so a check holding a stale handle retries instead of spending from it.
#[derive(Debug)]
struct Slot {
    bucket: RateBucket,
    evicted: bool,
}

type SlotHandle = Arc<Mutex<Slot>>;

/// Token-bucket limiter keyed by opaque strings (e.g. `q:<session>`)
#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimitConfig,
    clock: Arc<dyn Clock>,
    buckets: RwLock<HashMap<String, SlotHandle>>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimitConfig::default())
    }
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: RateLimitConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            buckets: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Checks `key` with the limiter's own parameters
    pub fn check(&self, key: &str) -> RateDecision {
        let config = self.config;
        self.check_with(key, &config)
    }

    /// Checks `key` with explicit parameters. A new bucket starts full.
    pub fn check_with(&self, key: &str, config: &RateLimitConfig) -> RateDecision {
        let now = self.clock.now_ms();
        loop {
            let slot = self.slot(key, config.capacity, now);
            if let Some(decision) = take_live(&slot, config, now) {
                return decision;
            }
        }
    }

    fn slot(&self, key: &str, capacity: u32, now: u64) -> SlotHandle {
        if let Some(slot) = self.buckets.read().get(key) {
            return Arc::clone(slot);
        }
        let mut buckets = self.buckets.write();
        Arc::clone(buckets.entry(key.to_string()).or_insert_with(|| {
            Arc::new(Mutex::new(Slot {
                bucket: RateBucket::full(capacity, now),
                evicted: false,
            }))
        }))
    }

    /// Current state of a key's bucket, if one exists
    pub fn snapshot(&self, key: &str) -> Option<RateBucket> {
        self.buckets.read().get(key).map(|slot| slot.lock().bucket)
    }

    /// Drops buckets not checked within `max_idle` whose refill interval has
    /// also elapsed. Returns how many went.
    pub fn evict_idle(&self, max_idle: Duration) -> usize {
        let now = self.clock.now_ms();
        let max_idle_ms = max_idle.as_millis() as u64;
        let interval_ms = self.config.interval_ms;
        let mut buckets = self.buckets.write();
        let before = buckets.len();
        buckets.retain(|_, slot| {
            let mut slot = slot.lock();
            let idle = now.saturating_sub(slot.bucket.last_seen_ms) > max_idle_ms;
            let settled = now.saturating_sub(slot.bucket.updated_at_ms) >= interval_ms;
            if idle && settled {
                slot.evicted = true;
                false
            } else {
                true
            }
        });
        before - buckets.len()
    }

    pub fn len(&self) -> usize {
        self.buckets.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Spends from `slot` unless eviction already removed it from the map
fn take_live(slot: &Mutex<Slot>, config: &RateLimitConfig, now: u64) -> Option<RateDecision> {
    let mut slot = slot.lock();
    if slot.evicted {
        return None;
    }
    Some(slot.bucket.take(config, now))
}
