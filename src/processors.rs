//! Core Cloud Logging processors: namespace initialization, severity,
//! source location and finalization.
//!
//! Cloud Logging ingests JSON lines and lifts a few special fields out of
//! them; everything else ends up in `jsonPayload`. See
//! <https://cloud.google.com/logging/docs/structured-logging#special-payload-fields>.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::constants::{
    cloud, is_reserved_key, raw, CLOUD_LOGGING_KEY, LABELS_KEY, RESERVED_FIELD_PREFIX,
    SOURCE_LOCATION_KEY,
};
use crate::error::{ConfigError, ProcessError};
use crate::record::EventRecord;
use crate::severity::Severity;

/// Where the finalizer puts caller-supplied fields.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldPlacement {
    /// Merge free-form fields at the top level, next to the well-known
    /// fields. Free-form fields using a reserved key are renamed with the
    /// `field.` prefix, e.g. `stack_trace` becomes `field.stack_trace`.
    #[default]
    TopLevel,

    /// Nest all free-form fields under the given key. Values are rendered
    /// as strings since Cloud Logging labels are string-valued.
    Nested(String),
}

impl FieldPlacement {
    /// Nest free-form fields under `logging.googleapis.com/labels`.
    pub fn labels() -> Self {
        FieldPlacement::Nested(LABELS_KEY.to_string())
    }

    /// Reject a nesting key that would replace a well-known field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            FieldPlacement::Nested(key) if is_reserved_key(key) => {
                Err(ConfigError::ReservedPlacementKey(key.clone()))
            }
            _ => Ok(()),
        }
    }
}

/// Seed the Cloud Namespace with the message and timestamp.
pub fn init_cloud_logging(mut record: EventRecord) -> Result<EventRecord, ProcessError> {
    let message = record
        .remove(raw::MESSAGE)
        .ok_or(ProcessError::MissingField(raw::MESSAGE))?;
    let time = record
        .remove(raw::TIMESTAMP)
        .ok_or(ProcessError::MissingField(raw::TIMESTAMP))?;

    let mut namespace = Map::new();
    namespace.insert(cloud::MESSAGE.to_string(), message);
    namespace.insert(cloud::TIME.to_string(), time);

    record.insert(CLOUD_LOGGING_KEY, Value::Object(namespace));
    Ok(record)
}

/// Set the severity from the record's logging method name.
pub fn log_severity(mut record: EventRecord) -> Result<EventRecord, ProcessError> {
    let severity = Severity::from_level_name(&record.method);
    record.set_severity(severity)?;
    Ok(record)
}

/// Inject the location of the logging call.
pub fn code_location(mut record: EventRecord) -> Result<EventRecord, ProcessError> {
    let file = take_string(&mut record, raw::PATHNAME, "unknown");
    let line = take_string(&mut record, raw::LINENO, "0");
    let module = take_string(&mut record, raw::MODULE, "unknown");
    let func_name = take_string(&mut record, raw::FUNC_NAME, "unknown");

    let mut location = Map::new();
    location.insert("file".to_string(), Value::String(file));
    location.insert("line".to_string(), Value::String(line));
    location.insert(
        "function".to_string(),
        Value::String(format!("{}:{}", module, func_name)),
    );

    record
        .namespace_mut()?
        .insert(SOURCE_LOCATION_KEY.to_string(), Value::Object(location));
    Ok(record)
}

/// Replace the Cloud Namespace with its contents at the top level.
pub fn finalize_cloud_logging(
    mut record: EventRecord,
    placement: &FieldPlacement,
) -> Result<EventRecord, ProcessError> {
    let namespace = match record.remove(CLOUD_LOGGING_KEY) {
        Some(Value::Object(namespace)) => namespace,
        _ => return Err(ProcessError::MissingNamespace),
    };

    let free_form = std::mem::take(&mut record.fields);
    match placement {
        FieldPlacement::TopLevel => {
            record.fields.extend(namespace);
            for (key, value) in free_form {
                if is_reserved_key(&key) {
                    record.insert(format!("{}{}", RESERVED_FIELD_PREFIX, key), value);
                } else {
                    record.insert(key, value);
                }
            }
        }
        FieldPlacement::Nested(key) => {
            record.fields.extend(namespace);
            if !free_form.is_empty() {
                let labels: Map<String, Value> = free_form
                    .into_iter()
                    .map(|(k, v)| (k, Value::String(label_value(v))))
                    .collect();
                let key = if is_reserved_key(key) {
                    format!("{}{}", RESERVED_FIELD_PREFIX, key)
                } else {
                    key.clone()
                };
                record.insert(key, Value::Object(labels));
            }
        }
    }

    Ok(record)
}

fn take_string(record: &mut EventRecord, key: &str, default: &str) -> String {
    match record.remove(key) {
        Some(Value::String(s)) => s,
        Some(Value::Null) | None => default.to_string(),
        Some(other) => other.to_string(),
    }
}

fn label_value(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}
