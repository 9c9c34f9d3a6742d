use axum::extract::{ConnectInfo, Request, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Json, Response};
use dashmap::DashMap;
use serde_json::json;
use std::any::Any;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed,
    Limited { retry_after: Duration },
}

/// Fixed-window request counter keyed by client IP.
#[derive(Debug)]
pub struct RateLimiter {
    windows: DashMap<IpAddr, Window>,
    max_requests: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            windows: DashMap::new(),
            max_requests,
            window,
        }
    }

    pub fn per_minute(max_requests: u32) -> Self {
        Self::new(max_requests, Duration::from_secs(60))
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn check(&self, ip: IpAddr) -> RateDecision {
        self.check_at(ip, Instant::now())
    }

    fn check_at(&self, ip: IpAddr, now: Instant) -> RateDecision {
        let mut entry = self.windows.entry(ip).or_insert(Window {
            started: now,
            count: 0,
        });

        let elapsed = now.saturating_duration_since(entry.started);
        if elapsed >= self.window {
            entry.started = now;
            entry.count = 0;
        }

        if entry.count < self.max_requests {
            entry.count += 1;
            RateDecision::Allowed
        } else {
            RateDecision::Limited {
                retry_after: self.window.saturating_sub(elapsed),
            }
        }
    }

    /// Drops windows that have already closed.
    pub fn cleanup_old_entries(&self) {
        let now = Instant::now();
        self.windows
            .retain(|_, w| now.saturating_duration_since(w.started) < self.window);
    }

    pub fn tracked_clients(&self) -> usize {
        self.windows.len()
    }
}

/// `X-Real-IP`, then the first `X-Forwarded-For` hop, then the socket peer.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<IpAddr> {
    let from_header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .and_then(|v| v.trim().parse::<IpAddr>().ok())
    };

    from_header("x-real-ip")
        .or_else(|| from_header("x-forwarded-for"))
        .or_else(|| peer.map(|addr| addr.ip()))
}

pub async fn rate_limit(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    let Some(ip) = client_ip(request.headers(), peer) else {
        tracing::debug!("No client address, skipping rate limit");
        return next.run(request).await;
    };

    match limiter.check(ip) {
        RateDecision::Allowed => next.run(request).await,
        RateDecision::Limited { retry_after } => {
            tracing::warn!(client = %ip, "Rate limit exceeded");
            let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
            (
                StatusCode::TOO_MANY_REQUESTS,
                [(header::RETRY_AFTER, secs.max(1).to_string())],
                Json(json!({"error": "rate_limited"})),
            )
                .into_response()
        }
    }
}

pub fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    tracing::error!(panic = %detail, "Handler panicked");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"error": "internal_error"})),
    )
        .into_response()
}
