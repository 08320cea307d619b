use lazy_static::lazy_static;
use prometheus::{Counter, Encoder, Histogram, HistogramOpts, Opts, Registry, TextEncoder};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();
    pub static ref REQUESTS_TOTAL: Counter = Counter::with_opts(Opts::new(
        "ingestor_requests_total",
        "Total telemetry requests received"
    ))
    .unwrap();
    pub static ref STORED_TOTAL: Counter = Counter::with_opts(Opts::new(
        "ingestor_stored_total",
        "Total readings stored"
    ))
    .unwrap();
    pub static ref MALFORMED_TOTAL: Counter = Counter::with_opts(Opts::new(
        "ingestor_malformed_total",
        "Total requests rejected for unparsable JSON"
    ))
    .unwrap();
    pub static ref INVALID_TOTAL: Counter = Counter::with_opts(Opts::new(
        "ingestor_invalid_total",
        "Total requests rejected for missing or empty fields"
    ))
    .unwrap();
    pub static ref STORAGE_FAILURES_TOTAL: Counter = Counter::with_opts(Opts::new(
        "ingestor_storage_failures_total",
        "Total failed inserts"
    ))
    .unwrap();
    pub static ref INSERT_LATENCY_SECONDS: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "ingestor_insert_latency_seconds",
            "Time taken to connect and insert one reading"
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0
        ])
    )
    .unwrap();
}

pub fn init_metrics() -> prometheus::Result<()> {
    REGISTRY.register(Box::new(REQUESTS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(STORED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(MALFORMED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(INVALID_TOTAL.clone()))?;
    REGISTRY.register(Box::new(STORAGE_FAILURES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(INSERT_LATENCY_SECONDS.clone()))?;
    Ok(())
}

pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registered_metrics_are_exposed() {
        // Another test may already have registered them.
        let _ = init_metrics();
        REQUESTS_TOTAL.inc();

        let text = gather_metrics();
        assert!(text.contains("ingestor_requests_total"));
        assert!(text.contains("ingestor_insert_latency_seconds"));
    }
}
