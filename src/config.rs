use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::weather::visual_crossing::DEFAULT_BASE_URL;

/// Which key-value store backs the read-through cache.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CacheBackendKind {
    Redis,
    Memory,
    None,
}

impl FromStr for CacheBackendKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "redis" => Ok(Self::Redis),
            "memory" => Ok(Self::Memory),
            "none" | "disabled" => Ok(Self::None),
            other => Err(anyhow::anyhow!(
                "CACHE_BACKEND must be one of redis, memory, none (got {other:?})"
            )),
        }
    }
}

#[derive(Clone)]
pub struct Config {
    pub port: u16,
    pub visual_crossing_api_key: String,
    pub visual_crossing_base_url: String,
    pub default_unit_group: String,
    pub cache_backend: CacheBackendKind,
    pub redis_addr: String,
    pub redis_password: String,
    pub redis_db: i64,
    /// Zero means entries never expire.
    pub cache_ttl: Duration,
    pub http_timeout: Duration,
    pub rate_limit_per_minute: u32,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source. Empty
    /// values count as unset.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let or_default = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let cache_backend = match get("CACHE_BACKEND") {
            Some(raw) => raw.parse()?,
            None => CacheBackendKind::Redis,
        };

        Ok(Config {
            port: parse_or(get("PORT"), "PORT", 8080),
            visual_crossing_api_key: get("VISUAL_CROSSING_API_KEY")
                .ok_or_else(|| anyhow::anyhow!("VISUAL_CROSSING_API_KEY not set"))?,
            visual_crossing_base_url: or_default("VISUAL_CROSSING_BASE_URL", DEFAULT_BASE_URL),
            default_unit_group: or_default("DEFAULT_UNIT_GROUP", "metric"),
            cache_backend,
            redis_addr: or_default("REDIS_ADDR", "127.0.0.1:6379"),
            redis_password: or_default("REDIS_PASSWORD", ""),
            redis_db: parse_or(get("REDIS_DB"), "REDIS_DB", 0),
            cache_ttl: Duration::from_secs(parse_or(
                get("CACHE_TTL_SECONDS"),
                "CACHE_TTL_SECONDS",
                43_200,
            )),
            http_timeout: Duration::from_secs(parse_or(
                get("HTTP_TIMEOUT_SECONDS"),
                "HTTP_TIMEOUT_SECONDS",
                10,
            )),
            rate_limit_per_minute: parse_or(
                get("RATE_LIMIT_PER_MINUTE"),
                "RATE_LIMIT_PER_MINUTE",
                60,
            ),
        })
    }

    pub fn cache_enabled(&self) -> bool {
        self.cache_backend != CacheBackendKind::None
    }
}

// Hand-written so the API key and Redis password never reach the logs.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("port", &self.port)
            .field("visual_crossing_api_key", &"<redacted>")
            .field("visual_crossing_base_url", &self.visual_crossing_base_url)
            .field("default_unit_group", &self.default_unit_group)
            .field("cache_backend", &self.cache_backend)
            .field("redis_addr", &self.redis_addr)
            .field("redis_password", &"<redacted>")
            .field("redis_db", &self.redis_db)
            .field("cache_ttl", &self.cache_ttl)
            .field("http_timeout", &self.http_timeout)
            .field("rate_limit_per_minute", &self.rate_limit_per_minute)
            .finish()
    }
}

fn parse_or<T: FromStr>(raw: Option<String>, key: &str, default: T) -> T {
    match raw {
        Some(value) => match value.trim().parse() {
            Ok(parsed) => parsed,
            Err(_) => {
                tracing::warn!("Ignoring unparsable {}={:?}, using default", key, value);
                default
            }
        },
        None => default,
    }
}

#[cfg(test)]
pub(crate) fn test_config(base_url: &str) -> Config {
    let base_url = base_url.to_string();
    Config::from_lookup(move |key| match key {
        "VISUAL_CROSSING_API_KEY" => Some("test-key".to_string()),
        "VISUAL_CROSSING_BASE_URL" => Some(base_url.clone()),
        "CACHE_BACKEND" => Some("memory".to_string()),
        "HTTP_TIMEOUT_SECONDS" => Some("1".to_string()),
        _ => None,
    })
    .expect("test config must be valid")
}
