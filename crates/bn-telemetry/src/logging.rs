use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

use crate::{LogFormat, TelemetryConfig, TelemetryError};

/// Install the process-wide `tracing` subscriber.
///
/// Only the first call in a process succeeds; later calls return
/// [`TelemetryError::LoggingInit`].
pub fn init_logging(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let filter = EnvFilter::try_new(&config.log_filter)
        .map_err(|e| TelemetryError::Config(format!("log filter: {e}")))?;

    let output: Box<dyn Layer<Registry> + Send + Sync> = match config.format {
        LogFormat::Plain => fmt::layer().with_target(true).boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .with_thread_names(true)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(output)
        .with(filter)
        .try_init()
        .map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;

    tracing::info!(
        service = %config.service_name,
        filter = %config.log_filter,
        format = %config.format,
        "Logging initialized"
    );
    Ok(())
}
