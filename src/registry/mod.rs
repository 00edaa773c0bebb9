// Package registry provides keyed refresh locks and throttle backoffs.
//
// The registry is the single source of truth for "is anyone already
// fetching key K". It is an injected, explicitly owned state object so
// tests can construct isolated instances.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::model::CacheKey;

#[cfg(test)]
mod registry_test;

/// Ephemeral per-key refresh lock. A lock past its `expires_at` is treated
/// as absent by `try_acquire`, which self-heals after a crashed owner.
#[derive(Debug, Clone)]
struct LockEntry {
    owner: String,
    acquired_at: Instant,
    expires_at: Instant,
}

/// Ephemeral per-key moratorium after an upstream throttle signal.
/// Never cleared early, only expires.
#[derive(Debug, Clone, Copy)]
struct BackoffEntry {
    installed_at: Instant,
    expires_at: Instant,
}

/// Diagnostic view of one live lock.
#[derive(Debug, Clone, Serialize)]
pub struct LockInfo {
    pub key: String,
    pub owner: String,
    pub age_secs: f64,
    pub ttl_remaining_secs: f64,
}

/// Diagnostic view of one live backoff.
#[derive(Debug, Clone, Serialize)]
pub struct BackoffInfo {
    pub key: String,
    pub age_secs: f64,
    pub remaining_secs: f64,
}

/// Snapshot of live locks and backoffs for the operational surface.
#[derive(Debug, Clone, Serialize)]
pub struct RegistrySnapshot {
    pub locks: Vec<LockInfo>,
    pub backoffs: Vec<BackoffInfo>,
}

/// Keyed registry of in-flight refreshes and throttle backoffs.
///
/// `try_acquire` is a single atomic check-and-set per key (dashmap shard
/// entry lock); no registry operation blocks callers beyond an O(1) map op.
pub struct LockBackoffRegistry {
    locks: DashMap<CacheKey, LockEntry>,
    backoffs: DashMap<CacheKey, BackoffEntry>,
    lock_ttl: Duration,
}

impl LockBackoffRegistry {
    pub fn new(lock_ttl: Duration) -> Self {
        Self {
            locks: DashMap::new(),
            backoffs: DashMap::new(),
            lock_ttl,
        }
    }

    /// Atomically creates a lock for `key` iff no live lock exists.
    /// An expired lock left behind by a crashed owner is replaced in place.
    pub fn try_acquire(&self, key: &CacheKey, owner: &str) -> bool {
        let now = Instant::now();
        let fresh = LockEntry {
            owner: owner.to_string(),
            acquired_at: now,
            expires_at: now + self.lock_ttl,
        };
        match self.locks.entry(key.clone()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().expires_at <= now {
                    occupied.insert(fresh);
                    true
                } else {
                    false
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(fresh);
                true
            }
        }
    }

    /// Acquires a lock wrapped in an RAII guard releasing on drop, so no
    /// exit path of a refresh can leak the lock.
    pub fn guard(self: &Arc<Self>, key: &CacheKey, owner: &str) -> Option<LockGuard> {
        if self.try_acquire(key, owner) {
            Some(LockGuard {
                registry: Arc::clone(self),
                key: key.clone(),
            })
        } else {
            None
        }
    }

    /// Removes the lock for `key`.
    pub fn release(&self, key: &CacheKey) {
        self.locks.remove(key);
    }

    /// Whether a live (non-expired) lock exists for `key`.
    pub fn is_locked(&self, key: &CacheKey) -> bool {
        self.locks
            .get(key)
            .map(|l| l.expires_at > Instant::now())
            .unwrap_or(false)
    }

    /// Installs or refreshes a backoff window for `key`.
    pub fn set_backoff(&self, key: &CacheKey, window: Duration) {
        let now = Instant::now();
        self.backoffs.insert(
            key.clone(),
            BackoffEntry {
                installed_at: now,
                expires_at: now + window,
            },
        );
    }

    /// True while the backoff window for `key` has not elapsed.
    /// Expired entries are reaped lazily on the way out.
    pub fn is_in_backoff(&self, key: &CacheKey) -> bool {
        self.backoff_remaining(key).is_some()
    }

    /// Remaining backoff window for `key`, if any.
    pub fn backoff_remaining(&self, key: &CacheKey) -> Option<Duration> {
        let now = Instant::now();
        if let Some(entry) = self.backoffs.get(key) {
            if entry.expires_at > now {
                return Some(entry.expires_at - now);
            }
        }
        self.backoffs.remove_if(key, |_, e| e.expires_at <= now);
        None
    }

    /// Snapshot of live locks and backoffs with remaining ages/TTLs.
    pub fn status(&self) -> RegistrySnapshot {
        let now = Instant::now();
        let locks = self
            .locks
            .iter()
            .filter(|e| e.value().expires_at > now)
            .map(|e| LockInfo {
                key: e.key().to_string(),
                owner: e.value().owner.clone(),
                age_secs: now.duration_since(e.value().acquired_at).as_secs_f64(),
                ttl_remaining_secs: (e.value().expires_at - now).as_secs_f64(),
            })
            .collect();
        let backoffs = self
            .backoffs
            .iter()
            .filter(|e| e.value().expires_at > now)
            .map(|e| BackoffInfo {
                key: e.key().to_string(),
                age_secs: now.duration_since(e.value().installed_at).as_secs_f64(),
                remaining_secs: (e.value().expires_at - now).as_secs_f64(),
            })
            .collect();
        RegistrySnapshot { locks, backoffs }
    }

    /// Number of live locks.
    pub fn active_locks(&self) -> usize {
        let now = Instant::now();
        self.locks.iter().filter(|e| e.value().expires_at > now).count()
    }

    /// Number of live backoffs.
    pub fn active_backoffs(&self) -> usize {
        let now = Instant::now();
        self.backoffs.iter().filter(|e| e.value().expires_at > now).count()
    }
}

/// RAII lock guard; releases the key on drop.
pub struct LockGuard {
    registry: Arc<LockBackoffRegistry>,
    key: CacheKey,
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        self.registry.release(&self.key);
    }
}
