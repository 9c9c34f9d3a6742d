use async_trait::async_trait;
use bytes::Bytes;
use redis::aio::ConnectionManager;
use std::time::Duration;

use super::{CacheBackend, CacheError};

/// Redis backend. `ConnectionManager` multiplexes one connection and
/// reconnects on its own, so clones are cheap and safe to share.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    pub async fn connect(url: &str) -> Result<Self, CacheError> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self { conn })
    }

    pub fn connection_url(addr: &str, password: &str, db: i64) -> String {
        if password.is_empty() {
            format!("redis://{}/{}", addr, db)
        } else {
            format!("redis://:{}@{}/{}", urlencoding::encode(password), addr, db)
        }
    }
}

#[async_trait]
impl CacheBackend for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, CacheError> {
        let mut conn = self.conn.clone();
        let value: Option<Vec<u8>> = redis::cmd("GET").arg(key).query_async(&mut conn).await?;
        Ok(value.map(Bytes::from))
    }

    async fn set(&self, key: &str, value: Bytes, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(&value[..]);
        if !ttl.is_zero() {
            cmd.arg("PX").arg(ttl.as_millis() as u64);
        }
        cmd.query_async::<_, ()>(&mut conn).await?;
        Ok(())
    }

    async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let reply: String = redis::cmd("PING").query_async(&mut conn).await?;
        if reply != "PONG" {
            return Err(CacheError::Unavailable(format!("unexpected PING reply {reply:?}")));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}
