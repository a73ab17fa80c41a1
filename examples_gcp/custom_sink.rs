use std::error::Error;
use std::sync::Arc;

use tracing::{error, info};
use tracing_gcp_log::{
    init::{init_tracing_with_config, LayerConfig},
    record::EventRecord,
    sink::LogSink,
    ChainConfig,
};

/// Example of plugging in a custom destination by implementing the
/// `LogSink` trait directly. Records arrive fully formatted; here they
/// are pretty-printed to stderr.
struct PrettyStderrSink;

impl LogSink for PrettyStderrSink {
    fn send(&self, record: &EventRecord) -> Result<(), Box<dyn Error + Send + Sync>> {
        eprintln!("{}", serde_json::to_string_pretty(record)?);
        Ok(())
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let sink: Arc<dyn LogSink> = Arc::new(PrettyStderrSink);
    let config = LayerConfig {
        chain: ChainConfig::default().service("my-service").version("deadbeef"),
        ..LayerConfig::default()
    };

    init_tracing_with_config(sink, config)?;

    info!("custom sink example started");
    error!(sink = "stderr", "simulated error written via custom sink");
    Ok(())
}
