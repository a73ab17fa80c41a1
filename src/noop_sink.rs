use crate::record::EventRecord;
use crate::sink::LogSink;
use std::error::Error;

/// A sink that simply drops all records.
///
/// Useful for measuring the formatting overhead of the layer without any
/// output, and for tests that only look at the layer counters.
#[derive(Clone, Default)]
pub struct NoopSink;

impl LogSink for NoopSink {
    fn send(&self, _record: &EventRecord) -> Result<(), Box<dyn Error + Send + Sync>> {
        Ok(())
    }
}
