// Tests for the lock & backoff registry.

use std::sync::Arc;
use std::time::Duration;

use super::LockBackoffRegistry;
use crate::model::{CacheKey, EntityType};

fn key(entity_id: &str) -> CacheKey {
    CacheKey::point("123", EntityType::Campaign, entity_id)
}

#[test]
fn test_single_lock_per_key() {
    let reg = LockBackoffRegistry::new(Duration::from_secs(60));
    let k = key("a");
    assert!(reg.try_acquire(&k, "first"));
    assert!(!reg.try_acquire(&k, "second"));
    assert!(reg.is_locked(&k));
}

#[test]
fn test_release_permits_reacquire() {
    let reg = LockBackoffRegistry::new(Duration::from_secs(60));
    let k = key("a");
    assert!(reg.try_acquire(&k, "first"));
    reg.release(&k);
    assert!(reg.try_acquire(&k, "second"));
}

#[test]
fn test_locks_are_key_independent() {
    let reg = LockBackoffRegistry::new(Duration::from_secs(60));
    assert!(reg.try_acquire(&key("a"), "w"));
    assert!(reg.try_acquire(&key("b"), "w"));
}

#[test]
fn test_expired_lock_treated_as_absent() {
    let reg = LockBackoffRegistry::new(Duration::from_millis(20));
    let k = key("a");
    assert!(reg.try_acquire(&k, "crashed"));
    std::thread::sleep(Duration::from_millis(40));
    // Never released, but the TTL has passed: acquire self-heals.
    assert!(reg.try_acquire(&k, "next"));
    assert!(!reg.is_locked(&key("missing")));
}

#[test]
fn test_guard_releases_on_drop() {
    let reg = Arc::new(LockBackoffRegistry::new(Duration::from_secs(60)));
    let k = key("a");
    {
        let guard = reg.guard(&k, "owner");
        assert!(guard.is_some());
        assert!(reg.guard(&k, "other").is_none());
    }
    assert!(!reg.is_locked(&k));
    assert!(reg.try_acquire(&k, "after"));
}

#[test]
fn test_backoff_window() {
    let reg = LockBackoffRegistry::new(Duration::from_secs(60));
    let k = key("a");
    assert!(!reg.is_in_backoff(&k));

    reg.set_backoff(&k, Duration::from_millis(30));
    assert!(reg.is_in_backoff(&k));
    let remaining = reg.backoff_remaining(&k).unwrap();
    assert!(remaining <= Duration::from_millis(30));

    std::thread::sleep(Duration::from_millis(50));
    assert!(!reg.is_in_backoff(&k));
    assert_eq!(reg.active_backoffs(), 0);
}

#[test]
fn test_backoff_does_not_affect_other_keys() {
    let reg = LockBackoffRegistry::new(Duration::from_secs(60));
    reg.set_backoff(&key("a"), Duration::from_secs(30));
    assert!(!reg.is_in_backoff(&key("b")));
}

#[test]
fn test_status_snapshot() {
    let reg = LockBackoffRegistry::new(Duration::from_secs(60));
    reg.try_acquire(&key("locked"), "worker-1");
    reg.set_backoff(&key("throttled"), Duration::from_secs(30));

    let snap = reg.status();
    assert_eq!(snap.locks.len(), 1);
    assert_eq!(snap.locks[0].owner, "worker-1");
    assert!(snap.locks[0].ttl_remaining_secs > 0.0);
    assert_eq!(snap.backoffs.len(), 1);
    assert!(snap.backoffs[0].remaining_secs > 0.0);
    assert!(snap.backoffs[0].key.contains("throttled"));
}

#[tokio::test]
async fn test_concurrent_acquire_yields_exactly_one_success() {
    let reg = Arc::new(LockBackoffRegistry::new(Duration::from_secs(60)));
    let k = key("contended");

    let mut handles = vec![];
    for i in 0..32 {
        let reg = reg.clone();
        let k = k.clone();
        handles.push(tokio::spawn(async move {
            reg.try_acquire(&k, &format!("task-{}", i))
        }));
    }

    let mut granted = 0;
    for handle in handles {
        if handle.await.unwrap() {
            granted += 1;
        }
    }
    assert_eq!(granted, 1);
}
