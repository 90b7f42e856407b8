use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LoggingConfig, MetricsConfig};

const DEFAULT_DIRECTIVE: &str = "carscout=info,tower_http=info";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE))
}

/// Installs the global subscriber. Console output goes to stderr so the CLI
/// can print JSON on stdout. Keep the returned guard alive for as long as the
/// file log should be flushed.
pub fn init_tracing(logging: &LoggingConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let (file_layer, guard) = match &logging.directory {
        Some(directory) => {
            let appender = tracing_appender::rolling::daily(directory, &logging.file_prefix);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter())
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr),
        )
        .with(file_layer)
        .try_init()?;

    Ok(guard)
}

/// Installs the Prometheus recorder when metrics are enabled. Without a
/// recorder the `metrics` macros are no-ops.
pub fn init_metrics(config: &MetricsConfig) -> anyhow::Result<Option<PrometheusHandle>> {
    if !config.enabled {
        return Ok(None);
    }

    let handle = PrometheusBuilder::new().install_recorder()?;

    describe_counter!(
        "carscout_source_requests_total",
        "Source searches by outcome (ok, failed, unimplemented, timeout)"
    );
    describe_counter!(
        "carscout_source_listings_total",
        "Listings returned per source"
    );
    describe_counter!(
        "carscout_cache_requests_total",
        "Query cache lookups by result (hit, miss)"
    );
    describe_histogram!(
        "carscout_source_duration_seconds",
        "Wall time of one source search"
    );

    tracing::info!(endpoint = %config.endpoint, "Prometheus metrics enabled");
    Ok(Some(handle))
}
