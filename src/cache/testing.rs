//! Backend doubles for tests.

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use super::{CacheBackend, CacheError};

struct Entry {
    value: Bytes,
    expires_at_ms: Option<u64>,
}

/// In-memory backend whose clock only moves when the test advances it.
#[derive(Default)]
pub struct ManualClockBackend {
    entries: DashMap<String, Entry>,
    now_ms: AtomicU64,
    gets: AtomicUsize,
    sets: AtomicUsize,
}

impl ManualClockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.now_ms.fetch_add(by.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn sets(&self) -> usize {
        self.sets.load(Ordering::SeqCst)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    fn now(&self) -> u64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CacheBackend for ManualClockBackend {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, CacheError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        let now = self.now();
        self.entries
            .remove_if(key, |_, entry| matches!(entry.expires_at_ms, Some(deadline) if now >= deadline));
        Ok(self.entries.get(key).map(|entry| entry.value.clone()))
    }

    async fn set(&self, key: &str, value: Bytes, ttl: Duration) -> Result<(), CacheError> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        let expires_at_ms = (!ttl.is_zero()).then(|| self.now() + ttl.as_millis() as u64);
        self.entries
            .insert(key.to_string(), Entry { value, expires_at_ms });
        Ok(())
    }

    async fn ping(&self) -> Result<(), CacheError> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "manual-clock"
    }
}

/// Backend that fails every operation, like a Redis that went away.
pub struct FailingBackend;

#[async_trait]
impl CacheBackend for FailingBackend {
    async fn get(&self, _key: &str) -> Result<Option<Bytes>, CacheError> {
        Err(CacheError::Unavailable("connection refused".to_string()))
    }

    async fn set(&self, _key: &str, _value: Bytes, _ttl: Duration) -> Result<(), CacheError> {
        Err(CacheError::Unavailable("connection refused".to_string()))
    }

    async fn ping(&self) -> Result<(), CacheError> {
        Err(CacheError::Unavailable("connection refused".to_string()))
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}
