//! Fixed-window rate limiting with exponential backoff.
//!
//! Two policies run side by side:
//! - `login`: password attempts, slowed down by an increasing delay and then
//!   rejected once the window's budget is spent
//! - `api`: paid AI calls, hard-rejected once the budget is spent
//!
//! Counters live in a [`RateLimitStore`] and time comes from a [`Clock`], so
//! tests can drive both deterministically. State is per process and is lost
//! on restart; several instances each enforce their own limit.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, warn};

/// Default cap on tracked keys per store.
pub const DEFAULT_MAX_ENTRIES: usize = 10_000;

// =============================================================================
// Clock
// =============================================================================

/// Source of wall-clock milliseconds.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> u64;
}

/// Clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        Utc::now().timestamp_millis().max(0) as u64
    }
}

/// Hand-driven clock for tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: AtomicU64,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self {
            now_ms: AtomicU64::new(start_ms),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now_ms
            .fetch_add(by.as_millis() as u64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}

// =============================================================================
// Store
// =============================================================================

/// Attempts counted for one key in its current window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitRecord {
    pub count: u32,
    pub window_start_ms: u64,
}

impl RateLimitRecord {
    fn is_live(&self, now_ms: u64, window_ms: u64) -> bool {
        now_ms.saturating_sub(self.window_start_ms) <= window_ms
    }
}

/// Storage for rate-limit records.
pub trait RateLimitStore: Send + Sync {
    fn get(&self, key: &str) -> Option<RateLimitRecord>;
    fn set(&self, key: &str, record: RateLimitRecord);
    fn remove(&self, key: &str);
    /// Drop every record whose window has elapsed; returns how many went.
    fn sweep(&self, now_ms: u64, window_ms: u64) -> usize;
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Process-local store bounded by a maximum number of keys.
///
/// When full, inserting a new key evicts the record with the oldest window.
#[derive(Debug)]
pub struct InMemoryStore {
    records: Mutex<HashMap<String, RateLimitRecord>>,
    max_entries: usize,
}

impl InMemoryStore {
    pub fn new(max_entries: usize) -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            max_entries: max_entries.max(1),
        }
    }

    fn records(&self) -> std::sync::MutexGuard<'_, HashMap<String, RateLimitRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES)
    }
}

impl RateLimitStore for InMemoryStore {
    fn get(&self, key: &str) -> Option<RateLimitRecord> {
        self.records().get(key).copied()
    }

    fn set(&self, key: &str, record: RateLimitRecord) {
        let mut records = self.records();

        if !records.contains_key(key) && records.len() >= self.max_entries {
            let oldest = records
                .iter()
                .min_by_key(|(_, r)| r.window_start_ms)
                .map(|(k, _)| k.clone());
            if let Some(oldest) = oldest {
                records.remove(&oldest);
                warn!(
                    max_entries = self.max_entries,
                    "Rate limit store full, evicted oldest entry"
                );
            }
        }

        records.insert(key.to_string(), record);
    }

    fn remove(&self, key: &str) {
        self.records().remove(key);
    }

    fn sweep(&self, now_ms: u64, window_ms: u64) -> usize {
        let mut records = self.records();
        let before = records.len();
        records.retain(|_, r| r.is_live(now_ms, window_ms));
        before - records.len()
    }

    fn len(&self) -> usize {
        self.records().len()
    }
}

// =============================================================================
// Limiter
// =============================================================================

/// Window, budget and backoff for one kind of operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub window: Duration,
    pub max_count: u32,
    pub backoff_base: Duration,
    pub backoff_cap: Duration,
}

/// Longest accepted window.
pub const MAX_WINDOW: Duration = Duration::from_secs(30 * 24 * 60 * 60);

impl RateLimitPolicy {
    /// 5 attempts per 15 minutes, delays doubling from 1s up to 30s.
    pub fn login() -> Self {
        Self {
            window: Duration::from_secs(15 * 60),
            max_count: 5,
            backoff_base: Duration::from_secs(1),
            backoff_cap: Duration::from_secs(30),
        }
    }

    /// 20 calls per minute, no delay.
    pub fn api() -> Self {
        Self {
            window: Duration::from_secs(60),
            max_count: 20,
            backoff_base: Duration::ZERO,
            backoff_cap: Duration::ZERO,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.window.is_zero() {
            return Err("rate limit window must be positive".to_string());
        }
        if self.window > MAX_WINDOW {
            return Err(format!(
                "rate limit window must not exceed {} seconds",
                MAX_WINDOW.as_secs()
            ));
        }
        if self.max_count == 0 {
            return Err("rate limit max count must be positive".to_string());
        }
        if self.backoff_base > self.backoff_cap {
            return Err("backoff base must not exceed backoff cap".to_string());
        }
        Ok(())
    }

    fn window_ms(&self) -> u64 {
        u64::try_from(self.window.as_millis()).unwrap_or(u64::MAX)
    }
}

/// Outcome of [`FixedWindowLimiter::check_and_increment`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed,
    Limited { retry_after: Duration },
}

impl RateLimitDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }
}

/// Fixed-window counter per key.
pub struct FixedWindowLimiter {
    name: &'static str,
    policy: RateLimitPolicy,
    store: Arc<dyn RateLimitStore>,
    clock: Arc<dyn Clock>,
    // Serializes get/set so concurrent requests cannot both take the last slot.
    guard: Mutex<()>,
}

impl FixedWindowLimiter {
    pub fn new(
        name: &'static str,
        policy: RateLimitPolicy,
        store: Arc<dyn RateLimitStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            name,
            policy,
            store,
            clock,
            guard: Mutex::new(()),
        }
    }

    /// Limiter over a fresh in-memory store and the system clock.
    pub fn in_memory(name: &'static str, policy: RateLimitPolicy, max_entries: usize) -> Self {
        Self::new(
            name,
            policy,
            Arc::new(InMemoryStore::new(max_entries)),
            Arc::new(SystemClock),
        )
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn policy(&self) -> &RateLimitPolicy {
        &self.policy
    }

    /// Count an attempt for `key`, refusing it once the window's budget is spent.
    ///
    /// A refused attempt is not counted.
    pub fn check_and_increment(&self, key: &str) -> RateLimitDecision {
        let _guard = self.guard.lock().unwrap_or_else(PoisonError::into_inner);
        let now = self.clock.now_ms();
        let window_ms = self.policy.window_ms();

        match self.store.get(key) {
            Some(record) if record.is_live(now, window_ms) => {
                if record.count >= self.policy.max_count {
                    debug!(limiter = self.name, key, count = record.count, "Rate limited");
                    return RateLimitDecision::Limited {
                        retry_after: self.remaining(&record, now),
                    };
                }
                self.store.set(
                    key,
                    RateLimitRecord {
                        count: record.count + 1,
                        ..record
                    },
                );
            }
            _ => {
                self.store.set(
                    key,
                    RateLimitRecord {
                        count: 1,
                        window_start_ms: now,
                    },
                );
            }
        }

        RateLimitDecision::Allowed
    }

    /// Backoff for the next response to `key`: `min(base * 2^(count-1), cap)`.
    pub fn delay_for(&self, key: &str) -> Duration {
        let Some(record) = self.live_record(key) else {
            return Duration::ZERO;
        };
        if record.count == 0 {
            return Duration::ZERO;
        }

        let factor = 1u32.checked_shl(record.count - 1).unwrap_or(u32::MAX);
        self.policy
            .backoff_base
            .saturating_mul(factor)
            .min(self.policy.backoff_cap)
    }

    /// Time left in `key`'s current window.
    pub fn retry_after(&self, key: &str) -> Duration {
        let now = self.clock.now_ms();
        self.live_record(key)
            .map(|record| self.remaining(&record, now))
            .unwrap_or(Duration::ZERO)
    }

    /// Forget `key`, e.g. after a successful login.
    pub fn reset(&self, key: &str) {
        let _guard = self.guard.lock().unwrap_or_else(PoisonError::into_inner);
        self.store.remove(key);
    }

    /// Remove stale records; returns how many were dropped.
    pub fn sweep(&self) -> usize {
        let _guard = self.guard.lock().unwrap_or_else(PoisonError::into_inner);
        self.store
            .sweep(self.clock.now_ms(), self.policy.window_ms())
    }

    /// Number of tracked keys.
    pub fn tracked(&self) -> usize {
        self.store.len()
    }

    fn live_record(&self, key: &str) -> Option<RateLimitRecord> {
        let now = self.clock.now_ms();
        self.store
            .get(key)
            .filter(|r| r.is_live(now, self.policy.window_ms()))
    }

    fn remaining(&self, record: &RateLimitRecord, now_ms: u64) -> Duration {
        let end = record.window_start_ms.saturating_add(self.policy.window_ms());
        Duration::from_millis(end.saturating_sub(now_ms))
    }
}

impl std::fmt::Debug for FixedWindowLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FixedWindowLimiter")
            .field("name", &self.name)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}
