use axum::{
    extract::{Query, Request, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::{
    middleware::{handle_panic, rate_limit, RateLimiter},
    weather::service::WeatherService,
};

// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub weather: Arc<WeatherService>,
    pub rate_limiter: Arc<RateLimiter>,
}

#[derive(Debug, Deserialize)]
pub struct WeatherQuery {
    pub city: Option<String>,
    pub units: Option<String>,
}

// Route handlers
pub async fn health() -> Json<serde_json::Value> {
    Json(json!({"status": "ok"}))
}

pub async fn get_weather(
    State(state): State<AppState>,
    Query(params): Query<WeatherQuery>,
) -> Response {
    let city = params.city.unwrap_or_default();
    let units = params.units.unwrap_or_default();

    state.weather.handle(&city, &units).await.into_response()
}

pub async fn cache_status(State(state): State<AppState>) -> Response {
    if state.weather.cache().is_enabled() {
        (StatusCode::OK, Json(json!({"cache": "enabled"}))).into_response()
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"error": "cache_disabled"})),
        )
            .into_response()
    }
}

// Create the router
pub fn create_router(state: AppState) -> Router {
    let trace = TraceLayer::new_for_http().make_span_with(|request: &Request| {
        let request_id = request
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-");
        tracing::info_span!(
            "request",
            method = %request.method(),
            uri = %request.uri(),
            request_id = %request_id,
        )
    });

    Router::new()
        .route("/health", get(health))
        .route("/weather", get(get_weather))
        .route("/_cache", get(cache_status))
        .layer(middleware::from_fn_with_state(
            state.rate_limiter.clone(),
            rate_limit,
        ))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(trace)
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
