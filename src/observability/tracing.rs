use tracing::Span;
use tracing_subscriber::EnvFilter;
use crate::config::LogFormat;
use crate::refresh::result::Trigger;
use crate::types::ids::CycleId;
use crate::types::index::IndexDefinition;

/// Installs the global subscriber. `RUST_LOG` overrides the default `info` filter.
pub fn init(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let installed = match format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.try_init(),
    };

    if installed.is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
}

pub fn trace_refresh_cycle(cycle_id: CycleId, trigger: Trigger) -> Span {
    tracing::info_span!(
        "refresh_cycle",
        cycle_id = %cycle_id,
        trigger = %trigger,
    )
}

pub fn trace_index_refresh(index: &IndexDefinition) -> Span {
    tracing::info_span!(
        "index_refresh",
        index = %index.name,
        symbol = %index.symbol,
    )
}
