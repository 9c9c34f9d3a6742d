use async_trait::async_trait;
use bytes::Bytes;
use moka::future::Cache;
use moka::Expiry;
use std::time::{Duration, Instant};

use super::{CacheBackend, CacheError};

const MAX_ENTRIES: u64 = 10_000;

#[derive(Clone, Debug)]
struct StoredValue {
    body: Bytes,
    ttl: Duration,
}

/// Expiry taken from each write, so overwrites restart the clock.
struct WriteTtl;

impl WriteTtl {
    fn for_value(value: &StoredValue) -> Option<Duration> {
        (!value.ttl.is_zero()).then_some(value.ttl)
    }
}

impl Expiry<String, StoredValue> for WriteTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &StoredValue,
        _created_at: Instant,
    ) -> Option<Duration> {
        Self::for_value(value)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &StoredValue,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Self::for_value(value)
    }
}

/// Process-local backend for running without Redis.
pub struct MemoryStore {
    cache: Cache<String, StoredValue>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            cache: Cache::builder()
                .max_capacity(MAX_ENTRIES)
                .expire_after(WriteTtl)
                .build(),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheBackend for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, CacheError> {
        Ok(self.cache.get(key).await.map(|stored| stored.body))
    }

    async fn set(&self, key: &str, value: Bytes, ttl: Duration) -> Result<(), CacheError> {
        self.cache
            .insert(key.to_string(), StoredValue { body: value, ttl })
            .await;
        Ok(())
    }

    async fn ping(&self) -> Result<(), CacheError> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
