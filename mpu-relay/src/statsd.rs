use crate::config::MetricsConfig;
use metrics_exporter_statsd::{StatsdBuilder, StatsdError};

const PREFIX: &str = "mpu_relay";

#[derive(thiserror::Error, Debug)]
pub enum MetricsError {
    #[error("failed to build statsd recorder: {0}")]
    Build(#[from] StatsdError),
    #[error("a metrics recorder is already installed")]
    AlreadyInstalled,
}

/// Installs the statsd recorder as the global `metrics` recorder and
/// registers the relay's metric descriptions with it.
pub fn init(config: &MetricsConfig) -> Result<(), MetricsError> {
    let recorder = StatsdBuilder::from(config.statsd_host.as_str(), config.statsd_port)
        .build(Some(PREFIX))?;
    metrics::set_global_recorder(recorder).map_err(|_| MetricsError::AlreadyInstalled)?;

    shared::describe_metrics!(relay::metrics_defs::ALL_METRICS);
    tracing::info!(host = %config.statsd_host, port = config.statsd_port, "statsd metrics enabled");

    Ok(())
}
