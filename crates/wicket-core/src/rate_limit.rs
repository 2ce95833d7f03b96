use chrono::{DateTime, TimeDelta, Utc};
use dashmap::{mapref::entry::Entry, DashMap};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

const SWEEP_EVERY_OPS: u64 = 64;

/// Failed-attempt bookkeeping for one client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptRecord {
    pub attempt_count: u32,
    pub first_attempt_at: DateTime<Utc>,
    pub blocked_until: Option<DateTime<Utc>>,
}

impl AttemptRecord {
    fn first(now: DateTime<Utc>) -> Self {
        Self {
            attempt_count: 1,
            first_attempt_at: now,
            blocked_until: None,
        }
    }

    fn blocked_at(&self, now: DateTime<Utc>) -> bool {
        self.blocked_until.is_some_and(|until| until > now)
    }
}

/// Keyed storage for attempt records.
///
/// `update` must be atomic per key: concurrent failures from the same
/// client may never overwrite each other. The provided default is built
/// from `get`/`set`/`delete` and is only atomic if the implementor
/// serializes calls externally; concurrent stores should override it.
pub trait RateLimitStore: Send + Sync {
    fn get(&self, key: &str) -> Option<AttemptRecord>;
    fn set(&self, key: &str, record: AttemptRecord);
    fn delete(&self, key: &str);

    /// Keep only records for which `keep` returns true. Returns how many
    /// were dropped.
    fn retain(&self, keep: &dyn Fn(&AttemptRecord) -> bool) -> usize;

    fn update(
        &self,
        key: &str,
        apply: &mut dyn FnMut(Option<AttemptRecord>) -> Option<AttemptRecord>,
    ) -> Option<AttemptRecord> {
        match apply(self.get(key)) {
            Some(next) => {
                self.set(key, next);
                Some(next)
            }
            None => {
                self.delete(key);
                None
            }
        }
    }
}

/// Process-local store. State is not shared across server instances.
#[derive(Debug, Default)]
pub struct MemoryRateLimitStore {
    records: DashMap<String, AttemptRecord>,
}

impl MemoryRateLimitStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RateLimitStore for MemoryRateLimitStore {
    fn get(&self, key: &str) -> Option<AttemptRecord> {
        self.records.get(key).map(|r| *r)
    }

    fn set(&self, key: &str, record: AttemptRecord) {
        self.records.insert(key.to_string(), record);
    }

    fn delete(&self, key: &str) {
        self.records.remove(key);
    }

    fn retain(&self, keep: &dyn Fn(&AttemptRecord) -> bool) -> usize {
        let mut dropped = 0;
        self.records.retain(|_, record| {
            let kept = keep(record);
            if !kept {
                dropped += 1;
            }
            kept
        });
        dropped
    }

    fn update(
        &self,
        key: &str,
        apply: &mut dyn FnMut(Option<AttemptRecord>) -> Option<AttemptRecord>,
    ) -> Option<AttemptRecord> {
        // The entry guard holds the shard lock for the whole read-modify-write.
        match self.records.entry(key.to_string()) {
            Entry::Occupied(mut entry) => match apply(Some(*entry.get())) {
                Some(next) => {
                    *entry.get_mut() = next;
                    Some(next)
                }
                None => {
                    entry.remove();
                    None
                }
            },
            Entry::Vacant(entry) => {
                let next = apply(None)?;
                entry.insert(next);
                Some(next)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitPolicy {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
    #[serde(default = "default_block_secs")]
    pub block_secs: u64,
}

fn default_max_attempts() -> u32 {
    5
}
fn default_window_secs() -> u64 {
    15 * 60
}
fn default_block_secs() -> u64 {
    30 * 60
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            window_secs: default_window_secs(),
            block_secs: default_block_secs(),
        }
    }
}

impl RateLimitPolicy {
    fn window(&self) -> TimeDelta {
        TimeDelta::seconds(self.window_secs.min(i64::MAX as u64) as i64)
    }

    fn block(&self) -> TimeDelta {
        TimeDelta::seconds(self.block_secs.min(i64::MAX as u64) as i64)
    }
}

/// Windowed failed-login counter with temporary blocking.
pub struct RateLimiter {
    store: Arc<dyn RateLimitStore>,
    policy: RateLimitPolicy,
    ops: AtomicU64,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn RateLimitStore>, policy: RateLimitPolicy) -> Self {
        Self {
            store,
            policy,
            ops: AtomicU64::new(0),
        }
    }

    pub fn in_memory(policy: RateLimitPolicy) -> Self {
        Self::new(Arc::new(MemoryRateLimitStore::new()), policy)
    }

    fn window_elapsed(&self, record: &AttemptRecord, now: DateTime<Utc>) -> bool {
        now - record.first_attempt_at >= self.policy.window()
    }

    /// Whether `key` is currently locked out. Crossing the threshold inside
    /// the window starts the block; an elapsed window clears the record.
    pub fn is_blocked(&self, key: &str, now: DateTime<Utc>) -> bool {
        self.maybe_sweep(now);
        let mut blocked = false;
        self.store.update(key, &mut |record: Option<AttemptRecord>| {
            let mut record = record?;
            if record.blocked_at(now) {
                blocked = true;
                return Some(record);
            }
            if self.window_elapsed(&record, now) {
                return None;
            }
            if record.attempt_count >= self.policy.max_attempts {
                record.blocked_until = Some(now + self.policy.block());
                blocked = true;
            }
            Some(record)
        });
        blocked
    }

    /// Count one failed attempt. Returns the attempt number within the
    /// current window.
    pub fn record_failure(&self, key: &str, now: DateTime<Utc>) -> u32 {
        self.maybe_sweep(now);
        let mut count = 0;
        self.store.update(key, &mut |record: Option<AttemptRecord>| {
            let next = match record {
                Some(mut r) if r.blocked_at(now) || !self.window_elapsed(&r, now) => {
                    r.attempt_count = r.attempt_count.saturating_add(1);
                    r
                }
                _ => AttemptRecord::first(now),
            };
            count = next.attempt_count;
            Some(next)
        });
        count
    }

    pub fn reset(&self, key: &str) {
        self.store.delete(key);
    }

    pub fn record(&self, key: &str) -> Option<AttemptRecord> {
        self.store.get(key)
    }

    fn maybe_sweep(&self, now: DateTime<Utc>) {
        let op = self.ops.fetch_add(1, Ordering::Relaxed).saturating_add(1);
        if !op.is_multiple_of(SWEEP_EVERY_OPS) {
            return;
        }
        let dropped = self.sweep(now);
        if dropped > 0 {
            tracing::debug!(dropped, "swept stale rate-limit records");
        }
    }

    /// Drop records whose window and block have both elapsed.
    pub fn sweep(&self, now: DateTime<Utc>) -> usize {
        self.store.retain(&|record: &AttemptRecord| {
            record.blocked_at(now) || !self.window_elapsed(record, now)
        })
    }
}
