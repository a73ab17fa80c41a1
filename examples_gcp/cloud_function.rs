use std::error::Error;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, info_span, warn};
use tracing_gcp_log::init::{init_tracing_with_config, LayerConfig};
use tracing_gcp_log::sink;
use tracing_gcp_log::{ChainConfig, HttpRequest, Severity};

#[derive(Debug)]
struct Crash(&'static str);

impl std::fmt::Display for Crash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0)
    }
}

impl Error for Crash {}

fn divide(a: i32, b: i32) -> Result<i32, Crash> {
    a.checked_div(b).ok_or(Crash("division by zero"))
}

#[tracing::instrument]
fn handle(method: &str) {
    let started = Instant::now();

    debug!(foo = "bar", "a debug message");
    info!(foo = "bar", "an info message");
    warn!(arg = "something else", "a warning message");
    error!("an error message");

    if let Err(err) = divide(1, 0) {
        error!(exception = &err as &dyn Error, "division by zero");
    }

    let err = Crash("crash");
    error!(exception = &err as &dyn Error, "type error");

    let request = HttpRequest::new(method, "https://example.com/test_func1")
        .with_status(200)
        .with_latency(started.elapsed().max(Duration::from_micros(1)));
    info!(http_request = %request, "{} /test_func1 -> 200", method);
}

fn main() -> Result<(), Box<dyn Error>> {
    // Cloud Run sets K_SERVICE / K_REVISION; both fall back to
    // "unknown service" / "unknown version" locally.
    let config = LayerConfig {
        chain: ChainConfig::default().report_severities([Severity::Error, Severity::Critical]),
        ..LayerConfig::default()
    };
    init_tracing_with_config(std::sync::Arc::new(sink::stdout()), config)?;

    let span = info_span!("invocation", execution_id = "abc123");
    span.in_scope(|| handle("GET"));

    Ok(())
}
