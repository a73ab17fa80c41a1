use std::error::Error;
use std::io::{self, Write};
use tracing_subscriber::fmt::MakeWriter;

use crate::record::EventRecord;

/// Destination for finalized [`EventRecord`]s produced by the layer.
///
/// Implementations are called inline on the thread issuing the log call
/// and should return quickly. A failed `send` drops the record.
pub trait LogSink: Send + Sync {
    /// Deliver a single finalized record.
    ///
    /// **Returns**
    /// - `Ok(())` if the record was written.
    /// - `Err(..)` on serialization or I/O failure. The layer counts the
    ///   record as dropped and reports it on stderr.
    fn send(&self, record: &EventRecord) -> Result<(), Box<dyn Error + Send + Sync>>;

    /// Flush any buffered output. Default implementation is a no-op.
    fn flush(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        Ok(())
    }
}

/// Sink writing one JSON object per line to a [`MakeWriter`].
///
/// This is the format Cloud Run and Cloud Functions pick up from stdout.
pub struct WriterSink<W> {
    make_writer: W,
}

impl<W> WriterSink<W>
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    pub fn new(make_writer: W) -> Self {
        WriterSink { make_writer }
    }
}

/// JSON lines on stdout.
pub fn stdout() -> WriterSink<fn() -> io::Stdout> {
    WriterSink::new(io::stdout as fn() -> io::Stdout)
}

impl<W> LogSink for WriterSink<W>
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    fn send(&self, record: &EventRecord) -> Result<(), Box<dyn Error + Send + Sync>> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        let mut writer = self.make_writer.make_writer();
        writer.write_all(&line)?;
        Ok(())
    }

    fn flush(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.make_writer.make_writer().flush()?;
        Ok(())
    }
}
