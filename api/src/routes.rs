use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};

use crate::{
    config::AllowedOrigins,
    handlers,
    observability::request_logger,
    rate_limit::{rate_limit_middleware, RateLimitState},
    security_headers::security_headers,
    state::AppState,
};

/// Largest accepted request body
pub const MAX_BODY_BYTES: usize = 256 * 1024;

pub fn contact_routes() -> Router<AppState> {
    Router::new().route("/contact", post(handlers::submit_contact))
}

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health_check))
}

pub fn observability_routes() -> Router<AppState> {
    Router::new().route("/metrics", get(handlers::metrics_endpoint))
}

pub fn cors_layer(origins: &AllowedOrigins) -> CorsLayer {
    let allow_origin = match origins {
        AllowedOrigins::Any => AllowOrigin::any(),
        AllowedOrigins::List(list) => {
            let values: Vec<HeaderValue> = list
                .iter()
                .filter_map(|origin| match HeaderValue::from_str(origin) {
                    Ok(value) => Some(value),
                    Err(_) => {
                        tracing::warn!(origin = %origin, "ignoring unusable ALLOWED_ORIGIN entry");
                        None
                    }
                })
                .collect();
            AllowOrigin::list(values)
        }
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers(AllowHeaders::mirror_request())
}

/// Assemble the full application.
///
/// From the outside in: request logging, security headers, the body limit,
/// CORS (preflights end here), then the rate limiter in front of every route.
pub fn app(state: AppState) -> Router {
    let rate_limit_state = RateLimitState::new(
        state.config.rate_limit.clone(),
        state.config.trust_proxy,
    );
    let cors = cors_layer(&state.config.allowed_origins);

    Router::new()
        .merge(contact_routes())
        .merge(health_routes())
        .merge(observability_routes())
        .fallback(handlers::route_not_found)
        .layer(middleware::from_fn_with_state(
            rate_limit_state,
            rate_limit_middleware,
        ))
        .layer(cors)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(request_logger))
        .with_state(state)
}
