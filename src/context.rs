use std::sync::Arc;
use std::time::Duration;
use crate::config::AppConfig;
use crate::error::Result;
use crate::interfaces::clock::{Clock, SystemClock};
use crate::interfaces::quote_source::QuoteSource;
use crate::interfaces::snapshot_store::SnapshotStore;
use crate::market_data::connectors::YahooConnector;
use crate::query::QueryService;
use crate::refresh::{RefreshOrchestrator, Scheduler};
use crate::registry::IndexRegistry;
use crate::storage::build_store;

/// Everything the service shares, constructed once at startup and handed
/// to the scheduler and the HTTP layer.
pub struct AppContext {
    pub registry: Arc<IndexRegistry>,
    pub store: Arc<dyn SnapshotStore>,
    pub orchestrator: Arc<RefreshOrchestrator>,
    pub scheduler: Arc<Scheduler>,
    pub query: Arc<QueryService>,
}

impl AppContext {
    /// Wires the production collaborators named by `config`.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let registry = IndexRegistry::new(config.indices.clone())?;
        let timeout = Duration::from_secs(config.quote_source.request_timeout_secs);
        let store = build_store(&config.store, timeout)?;
        let source: Arc<dyn QuoteSource> = Arc::new(YahooConnector::new(&config.quote_source)?);

        Ok(Self::assemble(config, registry, source, store, Arc::new(SystemClock)))
    }

    /// Wires explicit collaborators; used by `from_config` and by tests.
    pub fn assemble(
        config: &AppConfig,
        registry: IndexRegistry,
        source: Arc<dyn QuoteSource>,
        store: Arc<dyn SnapshotStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let registry = Arc::new(registry);
        let orchestrator = Arc::new(RefreshOrchestrator::new(
            registry.clone(),
            source,
            store.clone(),
            clock,
            &config.refresh,
        ));
        let scheduler = Arc::new(Scheduler::new(
            orchestrator.clone(),
            config.refresh.interval(),
            config.refresh.run_on_startup,
        ));
        let query = Arc::new(QueryService::new(store.clone()));

        AppContext {
            registry,
            store,
            orchestrator,
            scheduler,
            query,
        }
    }
}
