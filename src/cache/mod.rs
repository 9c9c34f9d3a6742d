pub mod memory;
pub mod redis_store;
#[cfg(test)]
pub mod testing;

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::config::{CacheBackendKind, Config};
use memory::MemoryStore;
use redis_store::RedisStore;

/// Upper bound on the startup connect + ping round trip.
const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("Cache backend timed out after {0:?}")]
    Timeout(Duration),
    #[error("Cache backend unavailable: {0}")]
    Unavailable(String),
}

/// A key-value store that owns entry expiry.
///
/// `ttl` of zero means the entry never expires.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// `Ok(None)` for keys that never existed and for keys that expired.
    async fn get(&self, key: &str) -> Result<Option<Bytes>, CacheError>;

    async fn set(&self, key: &str, value: Bytes, ttl: Duration) -> Result<(), CacheError>;

    async fn ping(&self) -> Result<(), CacheError>;

    fn name(&self) -> &'static str;
}

/// Thin wrapper applying the configured TTL to every write. No local copy
/// of the data is kept: each call is a round trip to the backend.
#[derive(Clone)]
pub struct ReadThroughCache {
    backend: Arc<dyn CacheBackend>,
    ttl: Duration,
}

impl ReadThroughCache {
    pub fn new(backend: Arc<dyn CacheBackend>, ttl: Duration) -> Self {
        Self { backend, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub async fn get(&self, key: &str) -> Result<Option<Bytes>, CacheError> {
        self.backend.get(key).await
    }

    /// Overwrites any previous value stored under `key`.
    pub async fn set(&self, key: &str, value: Bytes) -> Result<(), CacheError> {
        self.backend.set(key, value, self.ttl).await
    }
}

/// Whether the gateway runs with a cache at all.
#[derive(Clone)]
pub enum CacheMode {
    Enabled(ReadThroughCache),
    Disabled,
}

impl CacheMode {
    pub fn is_enabled(&self) -> bool {
        matches!(self, CacheMode::Enabled(_))
    }

    /// Backend failures degrade to a miss.
    pub async fn lookup(&self, key: &str) -> Option<Bytes> {
        let CacheMode::Enabled(cache) = self else {
            return None;
        };

        match cache.get(key).await {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "cache get failed, treating as miss");
                None
            }
        }
    }

    /// Best-effort write; failures are logged and dropped.
    pub async fn store(&self, key: &str, value: Bytes) {
        let CacheMode::Enabled(cache) = self else {
            return;
        };

        if let Err(e) = cache.set(key, value).await {
            tracing::warn!(key = %key, error = %e, "cache set failed");
        }
    }
}

/// Builds the configured backend and checks it is reachable. Any failure
/// leaves the gateway running with caching disabled.
pub async fn connect(config: &Config) -> CacheMode {
    let backend: Arc<dyn CacheBackend> = match config.cache_backend {
        CacheBackendKind::None => {
            tracing::info!("Cache disabled by configuration");
            return CacheMode::Disabled;
        }
        CacheBackendKind::Memory => Arc::new(MemoryStore::new()),
        CacheBackendKind::Redis => {
            let url = RedisStore::connection_url(
                &config.redis_addr,
                &config.redis_password,
                config.redis_db,
            );
            match tokio::time::timeout(HEALTH_CHECK_TIMEOUT, RedisStore::connect(&url)).await {
                Ok(Ok(store)) => Arc::new(store),
                Ok(Err(e)) => {
                    tracing::warn!(error = %e, "redis unreachable, continuing without cache");
                    return CacheMode::Disabled;
                }
                Err(_) => {
                    tracing::warn!("redis connect timed out, continuing without cache");
                    return CacheMode::Disabled;
                }
            }
        }
    };

    let ping = tokio::time::timeout(HEALTH_CHECK_TIMEOUT, backend.ping())
        .await
        .unwrap_or(Err(CacheError::Timeout(HEALTH_CHECK_TIMEOUT)));
    if let Err(e) = ping {
        tracing::warn!(backend = backend.name(), error = %e, "cache health check failed, continuing without cache");
        return CacheMode::Disabled;
    }

    let cache = ReadThroughCache::new(backend, config.cache_ttl);
    tracing::info!(
        backend = cache.backend_name(),
        ttl_secs = cache.ttl().as_secs(),
        "Cache enabled"
    );
    CacheMode::Enabled(cache)
}
