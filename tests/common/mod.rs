#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use tokio::sync::{watch, Notify};
use market_indices::config::AppConfig;
use market_indices::context::AppContext;
use market_indices::error::{Error, Result};
use market_indices::interfaces::clock::FixedClock;
use market_indices::interfaces::quote_source::QuoteSource;
use market_indices::registry::IndexRegistry;
use market_indices::storage::MemorySnapshotStore;
use market_indices::types::index::IndexDefinition;
use market_indices::types::series::{PricePoint, PriceSeries};

/// What the fake upstream does for one symbol.
#[derive(Clone, Debug)]
pub enum Behavior {
    Closes(Vec<f64>),
    Empty,
    Missing,
    Unavailable,
    Panic,
}

pub struct FakeSource {
    behaviors: Mutex<HashMap<String, Behavior>>,
    calls: AtomicUsize,
    gate: Option<(Arc<Notify>, watch::Receiver<bool>)>,
}

/// Holds every fetch until opened.
pub struct Gate {
    entered: Arc<Notify>,
    release: watch::Sender<bool>,
}

impl Gate {
    pub async fn wait_entered(&self) {
        self.entered.notified().await;
    }

    pub fn open(&self) {
        let _ = self.release.send(true);
    }
}

impl FakeSource {
    pub fn new() -> Self {
        FakeSource {
            behaviors: Mutex::new(HashMap::new()),
            calls: AtomicUsize::new(0),
            gate: None,
        }
    }

    pub fn with(self, symbol: &str, behavior: Behavior) -> Self {
        self.set(symbol, behavior);
        self
    }

    pub fn gated(mut self) -> (Self, Gate) {
        let entered = Arc::new(Notify::new());
        let (release, released) = watch::channel(false);
        self.gate = Some((entered.clone(), released));
        (self, Gate { entered, release })
    }

    pub fn set(&self, symbol: &str, behavior: Behavior) {
        self.behaviors.lock().unwrap().insert(symbol.to_string(), behavior);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QuoteSource for FakeSource {
    async fn fetch(&self, symbols: &[String], _lookback_days: u32) -> Result<HashMap<String, PriceSeries>> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some((entered, released)) = &self.gate {
            entered.notify_one();
            let mut released = released.clone();
            let _ = released.wait_for(|open| *open).await;
        }

        let behaviors = self.behaviors.lock().unwrap().clone();
        let mut result = HashMap::new();
        for symbol in symbols {
            match behaviors.get(symbol).cloned().unwrap_or(Behavior::Missing) {
                Behavior::Closes(closes) => {
                    result.insert(symbol.clone(), series(&closes));
                }
                Behavior::Empty => {
                    result.insert(symbol.clone(), PriceSeries::empty());
                }
                Behavior::Missing => {}
                Behavior::Unavailable => {
                    return Err(Error::TransportError(format!("{} unreachable", symbol)));
                }
                Behavior::Panic => panic!("upstream exploded for {}", symbol),
            }
        }
        Ok(result)
    }
}

pub fn series(closes: &[f64]) -> PriceSeries {
    let base = Utc.with_ymd_and_hms(2024, 3, 3, 21, 0, 0).unwrap();
    closes.iter()
        .enumerate()
        .map(|(i, &c)| PricePoint::new(base + Duration::days(i as i64), c))
        .collect()
}

pub fn cycle_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 5, 14, 30, 0).unwrap()
}

pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.refresh.retry_backoff_secs = 0;
    config
}

pub fn registry(entries: &[(&str, &str)]) -> IndexRegistry {
    IndexRegistry::new(
        entries.iter().map(|(name, symbol)| IndexDefinition::new(*name, *symbol)).collect()
    ).unwrap()
}

pub fn context(
    config: &AppConfig,
    entries: &[(&str, &str)],
    source: Arc<FakeSource>,
    store: Arc<MemorySnapshotStore>,
) -> AppContext {
    AppContext::assemble(
        config,
        registry(entries),
        source,
        store,
        Arc::new(FixedClock(cycle_start())),
    )
}
