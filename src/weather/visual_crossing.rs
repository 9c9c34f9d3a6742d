use async_trait::async_trait;
use bytes::Bytes;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::Client;
use serde_json::{Map, Value};

use super::{UpstreamError, UpstreamResponse, WeatherFetcher};
use crate::config::Config;

pub const DEFAULT_BASE_URL: &str =
    "https://weather.visualcrossing.com/VisualCrossingWebServices/rest/services/timeline";

const PROVIDER: &str = "visual_crossing";
const USER_AGENT: &str = "weather-api/1.0";

/// Escape set for a single path segment. Sub-delimiters, `:` and `@` stay
/// literal so `Hanoi, Vietnam` and `40.7,-74.0` keep their commas.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b',')
    .remove(b':')
    .remove(b';')
    .remove(b'=')
    .remove(b'@');

pub struct VisualCrossingClient {
    client: Client,
    api_key: String,
    default_unit_group: String,
    base_url: String,
}

impl VisualCrossingClient {
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.http_timeout)
            .build()?;

        Ok(Self {
            client,
            api_key: config.visual_crossing_api_key.clone(),
            default_unit_group: config.default_unit_group.clone(),
            base_url: config.visual_crossing_base_url.trim_end_matches('/').to_string(),
        })
    }

    /// The place always occupies exactly one path segment.
    fn place_url(&self, place: &str) -> String {
        format!("{}/{}", self.base_url, utf8_percent_encode(place, PATH_SEGMENT))
    }
}

#[async_trait]
impl WeatherFetcher for VisualCrossingClient {
    async fn fetch(&self, place: &str, unit_group: &str) -> Result<UpstreamResponse, UpstreamError> {
        let unit_group = if unit_group.trim().is_empty() {
            self.default_unit_group.as_str()
        } else {
            unit_group
        };

        let response = self
            .client
            .get(self.place_url(place))
            .query(&[
                ("unitGroup", unit_group),
                ("key", self.api_key.as_str()),
                ("contentType", "json"),
            ])
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(place = %place, error = %e, "weather provider unreachable");
                UpstreamError::Unreachable(Box::new(e))
            })?;

        let status = response.status().as_u16();
        if status >= 400 {
            // Unreadable error bodies still get the structured defaults.
            let raw = response.bytes().await.unwrap_or_default();
            tracing::warn!(place = %place, status, "weather provider returned an error");
            return Err(UpstreamError::Status {
                status,
                body: upstream_error_body(status, &raw),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| UpstreamError::Unreachable(Box::new(e)))?;

        Ok(UpstreamResponse { status, body })
    }
}

/// Structured provider error, overlaid with the provider's own JSON object
/// fields. Provider fields win on conflict.
pub fn upstream_error_body(status: u16, raw: &[u8]) -> Bytes {
    let mut merged = Map::new();
    merged.insert("error".to_string(), Value::from("upstream_error"));
    merged.insert("status_code".to_string(), Value::from(status));
    merged.insert("provider".to_string(), Value::from(PROVIDER));

    if let Ok(Value::Object(fields)) = serde_json::from_slice::<Value>(raw) {
        merged.extend(fields);
    }

    Bytes::from(Value::Object(merged).to_string())
}
