use std::sync::Arc;
use std::time::Instant;
use tracing::error;

use tracing_gcp_log::init::{init_tracing_with_config, LayerConfig};
use tracing_gcp_log::noop_sink::NoopSink;
use tracing_gcp_log::ChainConfig;

fn main() {
    let sink = Arc::new(NoopSink::default());
    let config = LayerConfig {
        chain: ChainConfig::default().service("load").version("bench"),
        ..LayerConfig::default()
    };

    if let Err(e) = init_tracing_with_config(sink, config) {
        eprintln!("{}", e);
        return;
    }

    let n: u64 = 100_000;
    let start = Instant::now();

    for i in 0..n {
        error!(iteration = i, exception = "simulated failure", "default load test error");
    }

    let elapsed = start.elapsed();
    println!("default config: formatted {} events in {:?} (~{:.0} ev/s)",
        n,
        elapsed,
        n as f64 / elapsed.as_secs_f64()
    );
}
