use async_trait::async_trait;
use bytes::Bytes;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use super::visual_crossing::upstream_error_body;
use super::{UpstreamError, UpstreamResponse, WeatherFetcher};

#[derive(Clone)]
pub enum Outcome {
    Ok(u16, &'static str),
    Status(u16, &'static str),
    Unreachable,
}

/// Scripted fetcher that records every call.
pub struct StubFetcher {
    outcome: Mutex<Outcome>,
    calls: AtomicUsize,
    last_request: Mutex<Option<(String, String)>>,
}

impl StubFetcher {
    pub fn new(outcome: Outcome) -> Self {
        Self {
            outcome: Mutex::new(outcome),
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    pub fn set_outcome(&self, outcome: Outcome) {
        *self.outcome.lock().unwrap() = outcome;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<(String, String)> {
        self.last_request.lock().unwrap().clone()
    }
}

#[async_trait]
impl WeatherFetcher for StubFetcher {
    async fn fetch(&self, place: &str, unit_group: &str) -> Result<UpstreamResponse, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some((place.to_string(), unit_group.to_string()));

        let outcome = self.outcome.lock().unwrap().clone();
        match outcome {
            Outcome::Ok(status, body) => Ok(UpstreamResponse {
                status,
                body: Bytes::from_static(body.as_bytes()),
            }),
            Outcome::Status(status, raw) => Err(UpstreamError::Status {
                status,
                body: upstream_error_body(status, raw.as_bytes()),
            }),
            Outcome::Unreachable => Err(UpstreamError::Unreachable(Box::new(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                "connection refused",
            )))),
        }
    }
}
