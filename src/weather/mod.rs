pub mod service;
#[cfg(test)]
pub mod testing;
pub mod visual_crossing;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

/// A 2xx (or otherwise non-error) answer from the provider, body untouched.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: u16,
    pub body: Bytes,
}

#[derive(Error, Debug)]
pub enum UpstreamError {
    /// DNS, connect, timeout, cancellation or a body that could not be read.
    #[error("Upstream unreachable: {0}")]
    Unreachable(#[source] Box<dyn std::error::Error + Send + Sync>),
    /// The provider answered with status >= 400. `body` is the enriched
    /// JSON error payload.
    #[error("Upstream status {status}")]
    Status { status: u16, body: Bytes },
}

#[async_trait]
pub trait WeatherFetcher: Send + Sync {
    /// An empty `unit_group` selects the configured default.
    async fn fetch(&self, place: &str, unit_group: &str) -> Result<UpstreamResponse, UpstreamError>;
}
