use lazy_static::lazy_static;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use crate::error::{Error, Result};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // Cycle metrics
    pub static ref REFRESH_CYCLES: IntCounterVec = IntCounterVec::new(
        Opts::new("refresh_cycles_total", "Total number of refresh cycles run"),
        &["trigger"]
    ).expect("metric can be created");

    pub static ref REFRESH_TICKS_DROPPED: IntCounter = IntCounter::new(
        "refresh_ticks_dropped_total",
        "Timer ticks dropped because a cycle was already running"
    ).expect("metric can be created");

    pub static ref REFRESH_CYCLE_DURATION: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "refresh_cycle_duration_seconds",
            "Wall time of one refresh cycle"
        ).buckets(vec![0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0])
    ).expect("metric can be created");

    // Fetch metrics
    pub static ref INDEX_FETCH_ATTEMPTS: IntCounter = IntCounter::new(
        "index_fetch_attempts_total",
        "Total number of per-index fetch attempts"
    ).expect("metric can be created");

    pub static ref INDEX_FETCH_FAILURES: IntCounter = IntCounter::new(
        "index_fetch_failures_total",
        "Indices that yielded no data after all retries"
    ).expect("metric can be created");

    // Store metrics
    pub static ref SNAPSHOT_WRITES: IntCounter = IntCounter::new(
        "snapshot_writes_total",
        "Total number of successful snapshot writes"
    ).expect("metric can be created");

    pub static ref SNAPSHOT_WRITE_FAILURES: IntCounter = IntCounter::new(
        "snapshot_write_failures_total",
        "Total number of failed snapshot writes"
    ).expect("metric can be created");
}

pub fn register_metrics() -> Result<()> {
    let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(REFRESH_CYCLES.clone()),
        Box::new(REFRESH_TICKS_DROPPED.clone()),
        Box::new(REFRESH_CYCLE_DURATION.clone()),
        Box::new(INDEX_FETCH_ATTEMPTS.clone()),
        Box::new(INDEX_FETCH_FAILURES.clone()),
        Box::new(SNAPSHOT_WRITES.clone()),
        Box::new(SNAPSHOT_WRITE_FAILURES.clone()),
    ];

    for collector in collectors {
        match REGISTRY.register(collector) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(Error::ConfigError(format!("metrics registration: {}", e))),
        }
    }
    Ok(())
}

/// Text exposition of every registered metric.
pub fn render() -> Result<String> {
    let mut buffer = Vec::new();
    TextEncoder::new()
        .encode(&REGISTRY.gather(), &mut buffer)
        .map_err(|e| Error::SerializationError(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| Error::SerializationError(e.to_string()))
}
