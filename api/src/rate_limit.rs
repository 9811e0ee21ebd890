use std::{
    collections::{HashMap, VecDeque},
    net::{IpAddr, SocketAddr},
    sync::{Arc, Mutex, PoisonError},
    time::{Duration, Instant},
};

use axum::{
    body::Body,
    extract::{connect_info::ConnectInfo, State},
    http::{header::RETRY_AFTER, HeaderName, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use pilot999_shared::{messages, ContactReply};

use crate::config::RateLimitConfig;
use crate::metrics;

// IETF draft-7 combined headers; the legacy `X-RateLimit-*` set is not sent.
const HEADER_RATE_LIMIT: HeaderName = HeaderName::from_static("ratelimit");
const HEADER_RATE_LIMIT_POLICY: HeaderName = HeaderName::from_static("ratelimit-policy");

/// Client entries are swept once the table grows past this size
const SWEEP_THRESHOLD: usize = 10_000;

/// Per-client sliding-window request log
#[derive(Clone)]
pub struct RateLimitState {
    config: Arc<RateLimitConfig>,
    trust_proxy: bool,
    clients: Arc<Mutex<HashMap<String, VecDeque<Instant>>>>,
}

impl RateLimitState {
    pub fn new(config: RateLimitConfig, trust_proxy: bool) -> Self {
        tracing::info!(
            max_requests = config.max_requests,
            window_secs = config.window.as_secs(),
            trust_proxy,
            "Rate limiter configured"
        );

        Self {
            config: Arc::new(config),
            trust_proxy,
            clients: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn check_request<B>(&self, request: &Request<B>) -> RateLimitDecision {
        let client = extract_client_ip(request, self.trust_proxy);
        self.check_client(&client, Instant::now())
    }

    fn check_client(&self, client: &str, now: Instant) -> RateLimitDecision {
        let limit = self.config.max_requests;
        let window = self.config.window;

        let mut clients = self.clients.lock().unwrap_or_else(PoisonError::into_inner);

        if clients.len() > SWEEP_THRESHOLD {
            clients.retain(|_, hits| {
                prune(hits, now, window);
                !hits.is_empty()
            });
        }

        let hits = clients.entry(client.to_string()).or_default();
        prune(hits, now, window);

        if hits.len() >= limit as usize {
            return RateLimitDecision {
                allowed: false,
                limit,
                window,
                remaining: 0,
                reset_seconds: seconds_until_slot_frees(hits, now, window),
            };
        }

        hits.push_back(now);
        let remaining = limit.saturating_sub(hits.len() as u32);

        RateLimitDecision {
            allowed: true,
            limit,
            window,
            remaining,
            reset_seconds: seconds_until_slot_frees(hits, now, window),
        }
    }
}

struct RateLimitDecision {
    allowed: bool,
    limit: u32,
    window: Duration,
    remaining: u32,
    reset_seconds: u64,
}

pub async fn rate_limit_middleware(
    State(rate_limiter): State<RateLimitState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let decision = rate_limiter.check_request(&request);

    if !decision.allowed {
        metrics::RATE_LIMITED.inc();
        tracing::info!(
            path = request.uri().path(),
            retry_after = decision.reset_seconds,
            "rate limit exceeded"
        );

        let mut response = (
            StatusCode::TOO_MANY_REQUESTS,
            Json(ContactReply::error(messages::RATE_LIMITED)),
        )
            .into_response();
        attach_rate_limit_headers(&mut response, &decision);
        response.headers_mut().insert(
            RETRY_AFTER,
            HeaderValue::from_str(&decision.reset_seconds.to_string())
                .unwrap_or_else(|_| HeaderValue::from_static("1")),
        );
        return response;
    }

    let mut response = next.run(request).await;
    attach_rate_limit_headers(&mut response, &decision);
    response
}

fn attach_rate_limit_headers(response: &mut Response, decision: &RateLimitDecision) {
    let policy = format!("{};w={}", decision.limit, decision.window.as_secs());
    let state = format!(
        "limit={}, remaining={}, reset={}",
        decision.limit, decision.remaining, decision.reset_seconds
    );

    if let Ok(value) = HeaderValue::from_str(&policy) {
        response.headers_mut().insert(HEADER_RATE_LIMIT_POLICY, value);
    }
    if let Ok(value) = HeaderValue::from_str(&state) {
        response.headers_mut().insert(HEADER_RATE_LIMIT, value);
    }
}

/// Drop hits that have slid out of the window
fn prune(hits: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(oldest) = hits.front() {
        if now.duration_since(*oldest) >= window {
            hits.pop_front();
        } else {
            break;
        }
    }
}

fn seconds_until_slot_frees(hits: &VecDeque<Instant>, now: Instant, window: Duration) -> u64 {
    let remaining = hits
        .front()
        .map(|oldest| window.saturating_sub(now.duration_since(*oldest)))
        .unwrap_or(window);
    ceil_duration_to_seconds(remaining).max(1)
}

/// Client identity: with one trusted proxy in front, the nearest
/// `X-Forwarded-For` hop, then `X-Real-IP`, then the socket peer.
fn extract_client_ip<B>(request: &Request<B>, trust_proxy: bool) -> String {
    if trust_proxy {
        if let Some(ip) = request
            .headers()
            .get("x-forwarded-for")
            .and_then(|value| value.to_str().ok())
            .and_then(parse_x_forwarded_for)
        {
            return ip.to_string();
        }

        if let Some(ip) = request
            .headers()
            .get("x-real-ip")
            .and_then(|value| value.to_str().ok())
            .and_then(parse_ip_addr)
        {
            return ip.to_string();
        }
    }

    if let Some(connect_info) = request.extensions().get::<ConnectInfo<SocketAddr>>() {
        return connect_info.0.ip().to_string();
    }

    "unknown".to_string()
}

fn parse_x_forwarded_for(raw: &str) -> Option<IpAddr> {
    raw.rsplit(',').map(str::trim).find_map(parse_ip_addr)
}

fn parse_ip_addr(raw: &str) -> Option<IpAddr> {
    raw.parse::<IpAddr>()
        .ok()
        .or_else(|| raw.parse::<SocketAddr>().ok().map(|addr| addr.ip()))
}

fn ceil_duration_to_seconds(duration: Duration) -> u64 {
    let secs = duration.as_secs();
    if duration.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs
    }
}
