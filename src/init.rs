use crate::chain::{Chain, ChainConfig};
use crate::error::{ConfigError, InitError};
use crate::layer::CloudLoggingLayer;
use crate::sink::{self, LogSink};
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

/// Configuration of the logging layer.
///
/// **Fields**
/// - `chain`: [`ChainConfig`] used to build the processor chain; the
///   service context is resolved from it once, at initialization.
/// - `include_span_fields`: if `true`, fields of the spans enclosing an
///   event are merged into it (event fields win on conflict).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LayerConfig {
    pub chain: ChainConfig,
    pub include_span_fields: bool,
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            chain: ChainConfig::default(),
            include_span_fields: true,
        }
    }
}

impl CloudLoggingLayer {
    /// Build a layer from a [`LayerConfig`].
    pub fn from_config(config: &LayerConfig, sink: Arc<dyn LogSink>) -> Result<Self, ConfigError> {
        let chain = Chain::new(&config.chain)?;
        Ok(CloudLoggingLayer::new(chain, sink).with_span_fields(config.include_span_fields))
    }
}

/// Initialize the global `tracing` subscriber using the provided sink and
/// [`LayerConfig`].
///
/// **Parameters**
/// - `sink`: implementation of [`LogSink`] that will receive finalized
///   records.
/// - `config`: [`LayerConfig`] controlling the processor chain.
///
/// **Effects**
///
/// Fails with [`InitError::Config`] if the chain configuration is invalid.
/// Otherwise installs a [`Registry`] combined with [`CloudLoggingLayer`] as the
/// global default subscriber, so all `tracing` events in the process are
/// formatted by the layer.
pub fn init_tracing_with_config(sink: Arc<dyn LogSink>, config: LayerConfig) -> Result<(), InitError> {
    let layer = CloudLoggingLayer::from_config(&config, sink)?;
    let subscriber = Registry::default().with(layer);
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

/// Initialize tracing with sensible defaults: JSON lines on stdout,
/// service context from `K_SERVICE` / `K_REVISION`.
///
/// This is the recommended entrypoint for Cloud Run services and Cloud
/// Functions.
pub fn init_tracing() -> Result<(), InitError> {
    init_tracing_with_config(Arc::new(sink::stdout()), LayerConfig::default())
}
