use std::sync::Arc;
use std::time::{Duration, Instant};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use tracing::Instrument;
use crate::config::RefreshConfig;
use crate::error::{Error, Result};
use crate::interfaces::clock::Clock;
use crate::interfaces::quote_source::QuoteSource;
use crate::interfaces::snapshot_store::SnapshotStore;
use crate::market_data::QuoteProcessor;
use crate::observability::metrics::{
    INDEX_FETCH_ATTEMPTS, INDEX_FETCH_FAILURES, REFRESH_CYCLES, REFRESH_CYCLE_DURATION,
    SNAPSHOT_WRITES, SNAPSHOT_WRITE_FAILURES,
};
use crate::observability::tracing::{trace_index_refresh, trace_refresh_cycle};
use crate::refresh::result::{IndexOutcome, OutcomeStatus, RefreshResult, Trigger};
use crate::registry::IndexRegistry;
use crate::types::ids::CycleId;
use crate::types::index::IndexDefinition;
use crate::types::snapshot::IndexSnapshot;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct RetryPolicy {
    attempts: u32,
    backoff: Duration,
}

impl RetryPolicy {
    fn new(attempts: u32, backoff: Duration) -> Self {
        RetryPolicy {
            attempts: attempts.max(1),
            backoff,
        }
    }
}

/// Drives one refresh cycle across every registered index.
///
/// ## Invariants
/// - Indices are independent: one index failing to fetch or write never
///   keeps another from being written.
/// - A good stored snapshot is never replaced by an all-absent one. The
///   all-absent document is only written when no document exists yet.
pub struct RefreshOrchestrator {
    registry: Arc<IndexRegistry>,
    source: Arc<dyn QuoteSource>,
    store: Arc<dyn SnapshotStore>,
    clock: Arc<dyn Clock>,
    retry: RetryPolicy,
    lookback_days: u32,
}

struct FetchOutcome {
    quote: Result<IndexSnapshot>,
    attempts: u32,
}

impl RefreshOrchestrator {
    pub fn new(
        registry: Arc<IndexRegistry>,
        source: Arc<dyn QuoteSource>,
        store: Arc<dyn SnapshotStore>,
        clock: Arc<dyn Clock>,
        config: &RefreshConfig,
    ) -> Self {
        RefreshOrchestrator {
            registry,
            source,
            store,
            clock,
            retry: RetryPolicy::new(config.retry_attempts, config.retry_backoff()),
            lookback_days: config.lookback_days,
        }
    }

    pub async fn run_cycle(&self, trigger: Trigger) -> RefreshResult {
        let cycle_id = CycleId::new();
        let span = trace_refresh_cycle(cycle_id, trigger);
        self.run_cycle_inner(cycle_id, trigger).instrument(span).await
    }

    async fn run_cycle_inner(&self, cycle_id: CycleId, trigger: Trigger) -> RefreshResult {
        let started = Instant::now();
        // Every index in this cycle shares this timestamp.
        let started_at = self.clock.now();
        tracing::info!("Refresh cycle started for {} indices", self.registry.len());

        let outcomes = join_all(
            self.registry.iter().map(|index| {
                self.refresh_index(index, started_at)
                    .instrument(trace_index_refresh(index))
            })
        ).await;

        let mut result = RefreshResult::new(cycle_id, trigger, started_at);
        for (index, outcome) in self.registry.iter().zip(outcomes) {
            result.record(index.name.clone(), outcome);
        }

        REFRESH_CYCLES.with_label_values(&[trigger.as_str()]).inc();
        REFRESH_CYCLE_DURATION.observe(started.elapsed().as_secs_f64());
        tracing::info!(
            "Refresh cycle finished: {}/{} updated in {:?}",
            result.updated_count(),
            result.len(),
            started.elapsed()
        );

        result
    }

    async fn refresh_index(&self, index: &IndexDefinition, started_at: DateTime<Utc>) -> IndexOutcome {
        let FetchOutcome { quote, attempts } = self.fetch_with_retry(index, started_at).await;

        match quote {
            Ok(snapshot) => self.write_quote(index, snapshot, attempts).await,
            Err(e) => {
                INDEX_FETCH_FAILURES.inc();
                tracing::warn!("No data for {} after {} attempts: {}", index.name, attempts, e);
                self.handle_missing(index, attempts, e).await
            }
        }
    }

    /// Up to `retry.attempts` fetches with a fixed backoff between them. Empty
    /// or short series are retried like transport errors.
    async fn fetch_with_retry(&self, index: &IndexDefinition, started_at: DateTime<Utc>) -> FetchOutcome {
        let symbols = [index.symbol.clone()];
        let mut last_error = None;
        let mut attempts = 0;

        while attempts < self.retry.attempts {
            if attempts > 0 {
                tokio::time::sleep(self.retry.backoff).await;
            }
            attempts += 1;
            INDEX_FETCH_ATTEMPTS.inc();

            let error = match self.source.fetch(&symbols, self.lookback_days).await {
                Ok(mut series) => match series.remove(&index.symbol) {
                    Some(series) => {
                        let snapshot = QuoteProcessor::normalize(&series, started_at);
                        if snapshot.has_quote() {
                            return FetchOutcome { quote: Ok(snapshot), attempts };
                        }
                        Error::InsufficientData(series.len())
                    }
                    None => Error::SymbolNotFound(index.symbol.clone()),
                },
                Err(e) => e,
            };

            tracing::warn!(
                "Fetch attempt {}/{} for {} failed: {}",
                attempts,
                self.retry.attempts,
                index.symbol,
                error
            );

            let recoverable = error.is_recoverable();
            last_error = Some(error);
            if !recoverable {
                break;
            }
        }

        FetchOutcome {
            quote: Err(last_error.unwrap_or(Error::InsufficientData(0))),
            attempts,
        }
    }

    async fn write_quote(&self, index: &IndexDefinition, snapshot: IndexSnapshot, attempts: u32) -> IndexOutcome {
        match self.store.upsert(&index.name, &snapshot).await {
            Ok(()) => {
                SNAPSHOT_WRITES.inc();
                tracing::info!(
                    "{}: {} ({})",
                    index.name,
                    snapshot.current_price.map(|p| p.to_string()).unwrap_or_default(),
                    snapshot.percent_change.map(|p| p.to_string()).unwrap_or_default()
                );
                IndexOutcome {
                    snapshot,
                    status: OutcomeStatus::Updated,
                    attempts,
                    error: None,
                }
            }
            Err(e) => {
                SNAPSHOT_WRITE_FAILURES.inc();
                tracing::error!("Failed to store snapshot for {}: {}", index.name, e);
                IndexOutcome {
                    snapshot,
                    status: OutcomeStatus::WriteFailed,
                    attempts,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    /// Keeps stale-but-valid data. Writes the all-absent document only on
    /// first run so queries see every index.
    async fn handle_missing(&self, index: &IndexDefinition, attempts: u32, cause: Error) -> IndexOutcome {
        let outcome = |status, error: String| IndexOutcome {
            snapshot: IndexSnapshot::absent(),
            status,
            attempts,
            error: Some(error),
        };

        match self.store.get(&index.name).await {
            Ok(Some(_)) => {
                tracing::info!("Keeping previous snapshot for {}", index.name);
                outcome(OutcomeStatus::Preserved, cause.to_string())
            }
            Ok(None) => match self.store.upsert(&index.name, &IndexSnapshot::absent()).await {
                Ok(()) => {
                    SNAPSHOT_WRITES.inc();
                    outcome(OutcomeStatus::Initialized, cause.to_string())
                }
                Err(e) => {
                    SNAPSHOT_WRITE_FAILURES.inc();
                    tracing::error!("Failed to initialize document for {}: {}", index.name, e);
                    outcome(OutcomeStatus::WriteFailed, format!("{}; {}", cause, e))
                }
            },
            Err(e) => {
                tracing::error!("Cannot check existing snapshot for {}: {}", index.name, e);
                outcome(OutcomeStatus::StoreUnavailable, format!("{}; {}", cause, e))
            }
        }
    }
}
