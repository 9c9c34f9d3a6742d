use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use serde_json::json;
use std::sync::Arc;

use super::{UpstreamError, WeatherFetcher};
use crate::cache::CacheMode;

/// Keeps gateway keys apart from anything else sharing the backend.
pub const CACHE_NAMESPACE: &str = "wx";

pub const X_CACHE: &str = "x-cache";

fn normalize(part: &str) -> String {
    part.trim().to_lowercase()
}

/// `wx:<place>:<units>`, trimmed and lower-cased.
pub fn cache_key(place: &str, unit_group: &str) -> String {
    format!("{}:{}:{}", CACHE_NAMESPACE, normalize(place), normalize(unit_group))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
}

impl CacheStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
        }
    }
}

/// Outcome of one weather request, ready to be written as HTTP.
#[derive(Debug, Clone)]
pub struct WeatherResponse {
    pub status: StatusCode,
    pub cache: Option<CacheStatus>,
    pub body: Bytes,
}

impl WeatherResponse {
    fn synthetic(status: StatusCode, body: serde_json::Value) -> Self {
        Self {
            status,
            cache: None,
            body: Bytes::from(body.to_string()),
        }
    }

    fn bad_request() -> Self {
        Self::synthetic(StatusCode::BAD_REQUEST, json!({"status": "bad request"}))
    }

    fn upstream_unavailable() -> Self {
        Self::synthetic(StatusCode::BAD_GATEWAY, json!({"error": "upstream_unavailable"}))
    }
}

impl IntoResponse for WeatherResponse {
    fn into_response(self) -> Response {
        let mut response = (self.status, self.body).into_response();
        let headers = response.headers_mut();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        if let Some(cache) = self.cache {
            headers.insert(X_CACHE, HeaderValue::from_static(cache.as_str()));
        }
        response
    }
}

/// Read-through orchestration: cache first, provider on miss.
pub struct WeatherService {
    cache: CacheMode,
    fetcher: Arc<dyn WeatherFetcher>,
}

impl WeatherService {
    pub fn new(cache: CacheMode, fetcher: Arc<dyn WeatherFetcher>) -> Self {
        Self { cache, fetcher }
    }

    pub fn cache(&self) -> &CacheMode {
        &self.cache
    }

    pub async fn handle(&self, place: &str, unit_group: &str) -> WeatherResponse {
        if place.trim().is_empty() {
            return WeatherResponse::bad_request();
        }

        let key = cache_key(place, unit_group);

        if let Some(cached) = self.cache.lookup(&key).await {
            tracing::debug!(key = %key, "cache hit");
            return WeatherResponse {
                status: StatusCode::OK,
                cache: Some(CacheStatus::Hit),
                body: cached,
            };
        }

        match self.fetcher.fetch(place, unit_group).await {
            Ok(upstream) => {
                let status =
                    StatusCode::from_u16(upstream.status).unwrap_or(StatusCode::BAD_GATEWAY);
                if !status.is_success() {
                    // Neither an error nor a usable payload; pass it on uncached.
                    return WeatherResponse {
                        status,
                        cache: None,
                        body: upstream.body,
                    };
                }

                self.cache.store(&key, upstream.body.clone()).await;
                tracing::debug!(key = %key, "cache miss, fetched from provider");
                WeatherResponse {
                    status,
                    cache: Some(CacheStatus::Miss),
                    body: upstream.body,
                }
            }
            Err(UpstreamError::Unreachable(e)) => {
                tracing::error!(key = %key, error = %e, "weather provider unavailable");
                WeatherResponse::upstream_unavailable()
            }
            Err(UpstreamError::Status { status, body }) => WeatherResponse {
                status: StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY),
                cache: None,
                body,
            },
        }
    }
}
