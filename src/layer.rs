use crate::chain::Chain;
use crate::constants::raw;
use crate::record::{format_timestamp, EventRecord};
use crate::sink::LogSink;
use chrono::Utc;
use serde_json::Value;
use std::collections::BTreeMap;
use std::error::Error;
use std::sync::{Arc, atomic::{AtomicU64, Ordering}};
use tracing::span::{Attributes, Id, Record};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

/// `tracing_subscriber` layer that shapes every event into a Cloud
/// Logging entry and hands it to a [`LogSink`].
///
/// For each event the layer builds a raw [`EventRecord`] (message,
/// timestamp, call site and fields), merges the fields of the enclosing
/// spans when enabled, and runs it through the [`Chain`]. Everything
/// happens inline on the calling thread.
///
/// Span fields named like a raw input (`exception`, `http_request`,
/// `message`, ...) are not inherited; only the event itself supplies them.
///
/// The function name of the call site is taken from the innermost span,
/// which is the function name for spans created by `#[instrument]`.
///
/// An error recorded under the field name `exception` becomes the stack
/// trace of an Error Reporting event:
///
/// ```ignore
/// tracing::error!(exception = &err as &dyn std::error::Error, "oh noes");
/// ```
pub struct CloudLoggingLayer {
    chain: Chain,
    sink: Arc<dyn LogSink>,
    include_span_fields: bool,
    /// Total events seen by the layer.
    pub total_events: Arc<AtomicU64>,
    /// Events successfully handed to the sink.
    pub emitted_events: Arc<AtomicU64>,
    /// Dropped because the chain or the sink failed.
    pub dropped_events: Arc<AtomicU64>,
}

impl CloudLoggingLayer {
    pub fn new(chain: Chain, sink: Arc<dyn LogSink>) -> Self {
        CloudLoggingLayer {
            chain,
            sink,
            include_span_fields: true,
            total_events: Arc::new(AtomicU64::new(0)),
            emitted_events: Arc::new(AtomicU64::new(0)),
            dropped_events: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Whether fields of enclosing spans are merged into each event.
    /// Enabled by default.
    pub fn with_span_fields(mut self, include: bool) -> Self {
        self.include_span_fields = include;
        self
    }

    fn build_record<S>(&self, event: &Event<'_>, ctx: &Context<'_, S>) -> EventRecord
    where
        S: Subscriber + for<'span> LookupSpan<'span>,
    {
        let meta = event.metadata();
        let mut record = EventRecord::new(meta.level().as_str().to_ascii_lowercase());

        let scope = ctx.event_scope(event);
        let mut func_name = None;
        if let Some(scope) = scope {
            for span in scope.from_root() {
                if self.include_span_fields {
                    if let Some(fields) = span.extensions().get::<SpanFields>() {
                        let inherited = fields
                            .0
                            .iter()
                            .filter(|(key, _)| !raw::INPUT_KEYS.contains(&key.as_str()))
                            .map(|(key, value)| (key.clone(), value.clone()));
                        record.fields.extend(inherited);
                    }
                }
                func_name = Some(span.name());
            }
        }

        let mut fields = BTreeMap::new();
        event.record(&mut FieldVisitor { fields: &mut fields });
        if !fields.contains_key(raw::MESSAGE) {
            fields.insert(raw::MESSAGE.to_string(), Value::String(String::new()));
        }
        record.fields.extend(fields);

        record.insert(raw::TIMESTAMP, format_timestamp(Utc::now()));
        if let Some(file) = meta.file() {
            record.insert(raw::PATHNAME, file);
        }
        if let Some(line) = meta.line() {
            record.insert(raw::LINENO, line);
        }
        record.insert(raw::MODULE, meta.module_path().unwrap_or_else(|| meta.target()));
        if let Some(func_name) = func_name {
            record.insert(raw::FUNC_NAME, func_name);
        }

        record
    }
}

/// Fields recorded on a span, stored in its extensions.
struct SpanFields(BTreeMap<String, Value>);

impl<S> Layer<S> for CloudLoggingLayer
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        if !self.include_span_fields {
            return;
        }
        let Some(span) = ctx.span(id) else {
            return;
        };

        let mut fields = BTreeMap::new();
        attrs.record(&mut FieldVisitor { fields: &mut fields });
        span.extensions_mut().insert(SpanFields(fields));
    }

    fn on_record(&self, id: &Id, values: &Record<'_>, ctx: Context<'_, S>) {
        if !self.include_span_fields {
            return;
        }
        let Some(span) = ctx.span(id) else {
            return;
        };

        let mut extensions = span.extensions_mut();
        if let Some(SpanFields(fields)) = extensions.get_mut::<SpanFields>() {
            values.record(&mut FieldVisitor { fields });
        }
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        self.total_events.fetch_add(1, Ordering::Relaxed);

        let record = self.build_record(event, &ctx);
        let result = self
            .chain
            .process(record)
            .map_err(|e| -> Box<dyn Error + Send + Sync> { Box::new(e) })
            .and_then(|record| self.sink.send(&record));

        match result {
            Ok(()) => {
                self.emitted_events.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                self.dropped_events.fetch_add(1, Ordering::Relaxed);
                eprintln!("dropping log record: {}", e);
            }
        }
    }
}

use tracing::field::{Field, Visit};

pub struct FieldVisitor<'a> {
    pub fields: &'a mut BTreeMap<String, Value>,
}

impl<'a> Visit for FieldVisitor<'a> {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.fields.insert(field.name().to_string(), Value::String(value.to_string()));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.fields.insert(field.name().to_string(), Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.fields.insert(field.name().to_string(), Value::from(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.fields.insert(field.name().to_string(), Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.fields.insert(field.name().to_string(), Value::from(value));
    }

    fn record_error(&mut self, field: &Field, value: &(dyn Error + 'static)) {
        self.fields.insert(field.name().to_string(), Value::String(format_error_chain(value)));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.fields.insert(field.name().to_string(), Value::String(format!("{:?}", value)));
    }
}

/// Render an error followed by its `source()` chain, one cause per line.
pub fn format_error_chain(error: &(dyn Error + 'static)) -> String {
    let mut text = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        text.push_str("\nCaused by: ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    text
}
