use once_cell::sync::Lazy;
use prometheus::{
    opts, Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Registry, TextEncoder,
};

const LATENCY_BUCKETS: [f64; 12] = [
    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

pub const OUTCOME_SENT: &str = "sent";
pub const OUTCOME_REJECTED: &str = "rejected";
pub const OUTCOME_MISCONFIGURED: &str = "misconfigured";
pub const OUTCOME_DELIVERY_FAILED: &str = "delivery_failed";

// ── HTTP ────────────────────────────────────────────────────────────────────
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        opts!("http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new("http_request_duration_seconds", "HTTP request latency")
            .buckets(LATENCY_BUCKETS.to_vec()),
        &["method", "path"],
    )
    .unwrap()
});

// ── Contact relay ───────────────────────────────────────────────────────────
pub static CONTACT_SUBMISSIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        opts!("contact_submissions_total", "Contact submissions by outcome"),
        &["outcome"],
    )
    .unwrap()
});
pub static RATE_LIMITED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("rate_limited_total", "Requests rejected by the rate limiter").unwrap()
});

pub fn register_all(r: &Registry) -> prometheus::Result<()> {
    r.register(Box::new(HTTP_REQUESTS_TOTAL.clone()))?;
    r.register(Box::new(HTTP_REQUEST_DURATION.clone()))?;
    r.register(Box::new(CONTACT_SUBMISSIONS.clone()))?;
    r.register(Box::new(RATE_LIMITED.clone()))?;
    Ok(())
}

/// Registry with every collector registered under the `pilot999` namespace
pub fn build_registry() -> prometheus::Result<Registry> {
    let registry = Registry::new_custom(Some("pilot999".into()), None)?;
    register_all(&registry)?;
    Ok(registry)
}

pub fn gather_metrics(r: &Registry) -> String {
    let encoder = TextEncoder::new();
    let families = r.gather();
    let mut buf = Vec::new();
    encoder.encode(&families, &mut buf).unwrap_or_default();
    String::from_utf8(buf).unwrap_or_default()
}

pub fn observe_http(method: &str, path: &str, status: u16, duration_secs: f64) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();
    HTTP_REQUEST_DURATION
        .with_label_values(&[method, path])
        .observe(duration_secs);
}

pub fn record_contact_outcome(outcome: &str) {
    CONTACT_SUBMISSIONS.with_label_values(&[outcome]).inc();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_names_prefixed() {
        let registry = build_registry().unwrap();
        record_contact_outcome(OUTCOME_SENT);
        RATE_LIMITED.inc();
        observe_http("GET", "/health", 200, 0.002);

        let families = registry.gather();
        assert!(!families.is_empty());
        for fam in &families {
            assert!(
                fam.get_name().starts_with("pilot999_"),
                "metric {} missing prefix",
                fam.get_name()
            );
        }
    }

    #[test]
    fn test_gather_contains_contact_outcomes() {
        let registry = build_registry().unwrap();
        record_contact_outcome(OUTCOME_DELIVERY_FAILED);

        let text = gather_metrics(&registry);
        assert!(text.contains("pilot999_contact_submissions_total"));
        assert!(text.contains("outcome=\"delivery_failed\""));
    }
}
