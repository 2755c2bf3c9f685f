use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, register_int_gauge, Encoder, HistogramVec,
    IntCounterVec, IntGauge, TextEncoder,
};

lazy_static! {
    // HTTP Metrics
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "http_requests_total",
        "Total number of HTTP requests",
        &["method", "path", "status"]
    )
    .unwrap();

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds",
        &["method", "path"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .unwrap();

    // Chat-completion provider
    pub static ref PROVIDER_CALLS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "provider_calls_total",
        "Total number of chat-completion provider calls",
        &["operation", "status"]
    )
    .unwrap();

    pub static ref PROVIDER_CALL_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "provider_call_duration_seconds",
        "Chat-completion provider call duration in seconds",
        &["operation"],
        vec![0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0]
    )
    .unwrap();

    // Result sinks
    pub static ref SINK_RECORDS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "sink_records_total",
        "Total number of submissions forwarded to result sinks",
        &["sink", "status"]
    )
    .unwrap();

    // Business Metrics
    pub static ref SESSIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "sessions_total",
        "Total number of interview sessions",
        &["status"]
    )
    .unwrap();

    pub static ref SESSIONS_ACTIVE: IntGauge = register_int_gauge!(
        "sessions_active",
        "Number of sessions currently held in memory"
    )
    .unwrap();

    pub static ref SUBMISSIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "submissions_total",
        "Total number of code submissions",
        &["outcome"]
    )
    .unwrap();

    pub static ref SSE_CONNECTIONS_ACTIVE: IntGauge = register_int_gauge!(
        "sse_connections_active",
        "Number of active SSE connections"
    )
    .unwrap();
}

/// Renders all metrics in Prometheus text format
pub fn render_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer)
        .map_err(|e| prometheus::Error::Msg(format!("Failed to convert metrics to UTF-8: {}", e)))
}

/// Helper: track a provider call with metrics
pub async fn track_provider_call<F, T, E>(operation: &str, future: F) -> Result<T, E>
where
    F: std::future::Future<Output = Result<T, E>>,
{
    let start = std::time::Instant::now();
    let result = future.await;
    let duration = start.elapsed().as_secs_f64();

    let status = if result.is_ok() { "success" } else { "error" };

    PROVIDER_CALLS_TOTAL
        .with_label_values(&[operation, status])
        .inc();

    PROVIDER_CALL_DURATION_SECONDS
        .with_label_values(&[operation])
        .observe(duration);

    result
}

/// Record the outcome of one sink write
pub fn record_sink_outcome(sink: &str, ok: bool) {
    let status = if ok { "success" } else { "error" };
    SINK_RECORDS_TOTAL.with_label_values(&[sink, status]).inc();
}
