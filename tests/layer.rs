use std::error::Error;
use std::fmt;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};

use serde_json::{json, Value};
use tracing::{error, info, info_span, warn};
use tracing_gcp_log::constants::{ERROR_EVENT_TYPE, LABELS_KEY, SOURCE_LOCATION_KEY};
use tracing_gcp_log::init::LayerConfig;
use tracing_gcp_log::sink::LogSink;
use tracing_gcp_log::{
    Chain, ChainConfig, CloudLoggingLayer, EventRecord, FieldPlacement, HttpRequest, ServiceContext,
    Severity,
};
use tracing_subscriber::layer::SubscriberExt;

/// A sink that keeps every finalized record for inspection.
#[derive(Clone, Default)]
struct CaptureSink {
    records: Arc<Mutex<Vec<Value>>>,
}

impl CaptureSink {
    fn records(&self) -> Vec<Value> {
        self.records.lock().unwrap().clone()
    }

    fn single(&self) -> Value {
        let records = self.records();
        assert_eq!(records.len(), 1, "expected exactly one record: {records:?}");
        records.into_iter().next().unwrap()
    }
}

impl LogSink for CaptureSink {
    fn send(&self, record: &EventRecord) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.records.lock().unwrap().push(serde_json::to_value(record)?);
        Ok(())
    }
}

#[derive(Debug)]
struct DivisionByZero;

impl fmt::Display for DivisionByZero {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("division by zero")
    }
}

impl Error for DivisionByZero {}

fn divide(a: i32, b: i32) -> Result<i32, DivisionByZero> {
    a.checked_div(b).ok_or(DivisionByZero)
}

fn default_chain() -> Chain {
    Chain::with_service_context(
        &ChainConfig::default(),
        ServiceContext::new("unknown service", "unknown version"),
    )
    .unwrap()
}

fn capture<F: FnOnce()>(chain: Chain, f: F) -> CaptureSink {
    let sink = CaptureSink::default();
    let layer = CloudLoggingLayer::new(chain, Arc::new(sink.clone()));
    let subscriber = tracing_subscriber::registry().with(layer);
    tracing::subscriber::with_default(subscriber, f);
    sink
}

fn assert_source_location(record: &Value) {
    let location = &record[SOURCE_LOCATION_KEY];
    assert!(location["file"].as_str().unwrap().ends_with("layer.rs"), "{location}");
    assert!(location["line"].as_str().unwrap().parse::<u32>().unwrap() > 0);
    assert!(location["function"].as_str().unwrap().starts_with("layer:"), "{location}");
}

#[test]
fn info_message_has_only_core_fields() {
    let sink = capture(default_chain(), || {
        info!("test");
    });

    let mut record = sink.single();
    assert_source_location(&record);

    let time = record["time"].as_str().unwrap();
    assert!(chrono::DateTime::parse_from_rfc3339(time).is_ok(), "{time}");
    assert!(time.ends_with('Z'));

    let object = record.as_object_mut().unwrap();
    object.remove(SOURCE_LOCATION_KEY);
    object.remove("time");
    assert_eq!(record, json!({"message": "test", "severity": "INFO"}));
}

#[test]
fn extra_fields_become_payload() {
    let sink = capture(default_chain(), || {
        info!(test1 = "test1", test2 = 2, test3 = false, test4 = 1.5, "test");
    });

    let record = sink.single();
    assert_eq!(record["message"], json!("test"));
    assert_eq!(record["test1"], json!("test1"));
    assert_eq!(record["test2"], json!(2));
    assert_eq!(record["test3"], json!(false));
    assert_eq!(record["test4"], json!(1.5));
    assert!(record.get("@type").is_none());
}

#[test]
fn exception_is_reported_as_error_event() {
    let sink = capture(default_chain(), || {
        if let Err(err) = divide(1, 0) {
            error!(exception = &err as &dyn Error, foo = "bar", "oh noes");
        }
    });

    let record = sink.single();
    assert_eq!(record["@type"], json!(ERROR_EVENT_TYPE));
    assert_eq!(record["severity"], json!("ERROR"));
    assert_eq!(record["message"], json!("oh noes"));
    assert_eq!(record["foo"], json!("bar"));
    assert_eq!(record["stack_trace"], json!("oh noes\ndivision by zero"));
    assert_eq!(record["context"]["reportLocation"], record[SOURCE_LOCATION_KEY]);
    assert_eq!(
        record["serviceContext"],
        json!({"service": "unknown service", "version": "unknown version"})
    );
    assert!(record.get("exception").is_none());
}

#[test]
fn explicit_service_context_is_used_for_error_events() {
    let chain = Chain::new(&ChainConfig::default().service("my-service").version("deadbeef")).unwrap();
    let sink = capture(chain, || {
        if let Err(err) = divide(1, 0) {
            error!(exception = &err as &dyn Error, "oh noes");
        }
        info!("not an error");
    });

    let records = sink.records();
    assert_eq!(records.len(), 2);
    assert_eq!(
        records[0]["serviceContext"],
        json!({"service": "my-service", "version": "deadbeef"})
    );
    assert!(records[1].get("serviceContext").is_none());
}

#[test]
fn warning_with_attached_exception_is_promoted() {
    let sink = capture(default_chain(), || {
        let err = DivisionByZero;
        warn!(exception = %err, "oh no; anyways");
    });

    let record = sink.single();
    assert_eq!(record["severity"], json!("WARNING"));
    assert_eq!(record["@type"], json!(ERROR_EVENT_TYPE));
    assert_eq!(record["stack_trace"], json!("oh no; anyways\ndivision by zero"));
    assert_eq!(record["context"]["reportLocation"], record[SOURCE_LOCATION_KEY]);
}

#[test]
fn handled_error_in_message_is_not_reported() {
    let sink = capture(default_chain(), || {
        if let Err(err) = divide(1, 0) {
            info!("I was expecting that error: {}", err);
        }
    });

    let record = sink.single();
    assert_eq!(record["message"], json!("I was expecting that error: division by zero"));
    assert_eq!(record["severity"], json!("INFO"));
    assert!(record.get("@type").is_none());
    assert!(record.get("stack_trace").is_none());
}

#[test]
fn errors_are_reported_when_configured() {
    let config = ChainConfig::default().report_severities([Severity::Error, Severity::Critical]);
    let chain = Chain::with_service_context(&config, ServiceContext::new("svc", "v1")).unwrap();
    let sink = capture(chain, || {
        error!("an error message");
    });

    let record = sink.single();
    assert_eq!(record["@type"], json!(ERROR_EVENT_TYPE));
    assert_eq!(record["serviceContext"], json!({"service": "svc", "version": "v1"}));
    assert!(record.get("stack_trace").is_none());
}

#[test]
fn span_fields_are_merged_as_context() {
    let sink = capture(default_chain(), || {
        let span = info_span!("handle_request", request_id = "1234");
        let _guard = span.enter();
        info!("test");
    });

    let record = sink.single();
    assert_eq!(record["request_id"], json!("1234"));
    assert_eq!(
        record[SOURCE_LOCATION_KEY]["function"],
        json!(format!("{}:handle_request", module_path!()))
    );
}

#[test]
fn recorded_span_values_are_merged() {
    let sink = capture(default_chain(), || {
        let span = info_span!("work", user = tracing::field::Empty);
        span.record("user", "alice");
        span.in_scope(|| info!(user = "bob", "event wins"));
        span.in_scope(|| info!("span value"));
    });

    let records = sink.records();
    assert_eq!(records[0]["user"], json!("bob"));
    assert_eq!(records[1]["user"], json!("alice"));
}

#[test]
fn span_fields_can_be_disabled() {
    let sink = CaptureSink::default();
    let layer = CloudLoggingLayer::new(default_chain(), Arc::new(sink.clone())).with_span_fields(false);
    let subscriber = tracing_subscriber::registry().with(layer);
    tracing::subscriber::with_default(subscriber, || {
        let span = info_span!("outer", request_id = "1234");
        let _guard = span.enter();
        info!("test");
    });

    assert!(sink.single().get("request_id").is_none());
}

#[test]
fn span_input_fields_are_not_inherited() {
    let sink = capture(default_chain(), || {
        let span = info_span!("req", exception = "boom", http_request = "{}", request_id = "1234");
        let _guard = span.enter();
        info!("first");
        info!("second");
    });

    for record in sink.records() {
        assert_eq!(record["severity"], json!("INFO"));
        assert_eq!(record["request_id"], json!("1234"));
        assert!(record.get("@type").is_none(), "{record}");
        assert!(record.get("stack_trace").is_none());
        assert!(record.get("httpRequest").is_none());
        assert!(record.get("exception").is_none());
    }
}

#[test]
fn caller_fields_cannot_mimic_error_events() {
    let sink = capture(default_chain(), || {
        info!(stack_trace = "fake", serviceContext = "fake", context = "ctx", "not an error");
    });

    let record = sink.single();
    assert!(record.get("@type").is_none());
    assert!(record.get("stack_trace").is_none());
    assert!(record.get("serviceContext").is_none());
    assert!(record.get("context").is_none());
    assert_eq!(record["field.stack_trace"], json!("fake"));
    assert_eq!(record["field.serviceContext"], json!("fake"));
    assert_eq!(record["field.context"], json!("ctx"));
    assert_eq!(record["message"], json!("not an error"));
}

#[test]
fn nested_placement_cannot_replace_message() {
    let config = LayerConfig {
        chain: ChainConfig::default().field_placement(FieldPlacement::Nested("message".to_string())),
        ..LayerConfig::default()
    };
    assert!(CloudLoggingLayer::from_config(&config, Arc::new(CaptureSink::default())).is_err());
}

#[test]
fn http_request_is_formatted() {
    let sink = capture(default_chain(), || {
        let request = HttpRequest::new("GET", "http://testserver/?foo=bar").with_status(200);
        info!(http_request = %request, "GET http://testserver/?foo=bar -> 200");
    });

    let record = sink.single();
    assert_eq!(
        record["httpRequest"],
        json!({"requestMethod": "GET", "requestUrl": "http://testserver/?foo=bar", "status": 200})
    );
    assert!(record.get("http_request").is_none());
}

#[test]
fn labels_placement_nests_free_form_fields() {
    let config = ChainConfig::default().field_placement(FieldPlacement::labels());
    let chain = Chain::with_service_context(&config, ServiceContext::new("svc", "v1")).unwrap();
    let sink = capture(chain, || {
        info!(request_id = "1234", attempt = 3, "test");
    });

    let record = sink.single();
    assert_eq!(record[LABELS_KEY], json!({"request_id": "1234", "attempt": "3"}));
    assert!(record.get("request_id").is_none());
    assert_eq!(record["message"], json!("test"));
}

#[test]
fn counters_track_emitted_events() {
    let sink = CaptureSink::default();
    let config = LayerConfig::default();
    let layer = CloudLoggingLayer::from_config(&config, Arc::new(sink.clone())).unwrap();
    let total = Arc::clone(&layer.total_events);
    let emitted = Arc::clone(&layer.emitted_events);
    let dropped = Arc::clone(&layer.dropped_events);

    let subscriber = tracing_subscriber::registry().with(layer);
    tracing::subscriber::with_default(subscriber, || {
        info!("one");
        tracing::debug!(field = 1);
    });

    assert_eq!(total.load(Ordering::Relaxed), 2);
    assert_eq!(emitted.load(Ordering::Relaxed), 2);
    assert_eq!(dropped.load(Ordering::Relaxed), 0);
    assert_eq!(sink.records()[1]["message"], json!(""));
    assert_eq!(sink.records()[1]["severity"], json!("DEBUG"));
}

#[test]
fn failing_sink_drops_records() {
    struct FailingSink;

    impl LogSink for FailingSink {
        fn send(&self, _record: &EventRecord) -> Result<(), Box<dyn Error + Send + Sync>> {
            Err("unavailable".into())
        }
    }

    let layer = CloudLoggingLayer::new(default_chain(), Arc::new(FailingSink));
    let dropped = Arc::clone(&layer.dropped_events);
    let subscriber = tracing_subscriber::registry().with(layer);
    tracing::subscriber::with_default(subscriber, || {
        info!("lost");
    });

    assert_eq!(dropped.load(Ordering::Relaxed), 1);
}
