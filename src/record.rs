use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::constants::{cloud, raw, CLOUD_LOGGING_KEY};
use crate::error::ProcessError;
use crate::severity::Severity;

/// Accumulated data of a single log call.
///
/// A record is created fresh for every log call, moved through each step
/// of the [`Chain`](crate::chain::Chain) and handed to a sink once
/// finalized. While processing, Cloud Logging fields live in a nested
/// object under [`CLOUD_LOGGING_KEY`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventRecord {
    /// Name of the logging method or level, e.g. `"info"`.
    #[serde(skip)]
    pub method: String,
    /// Severity assigned by the chain, mirrored in the Cloud Namespace.
    #[serde(skip)]
    pub severity: Option<Severity>,
    #[serde(flatten)]
    pub fields: BTreeMap<String, Value>,
}

impl EventRecord {
    pub fn new(method: impl Into<String>) -> Self {
        EventRecord {
            method: method.into(),
            severity: None,
            fields: BTreeMap::new(),
        }
    }

    /// Record carrying the raw message and timestamp the core initializer
    /// expects.
    pub fn with_message(
        method: impl Into<String>,
        message: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let message: String = message.into();
        EventRecord::new(method)
            .with_field(raw::MESSAGE, message)
            .with_field(raw::TIMESTAMP, format_timestamp(timestamp))
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Attach caller location in the raw shape consumed by the code
    /// location processor.
    pub fn with_callsite(
        self,
        pathname: impl Into<String>,
        lineno: u32,
        module: impl Into<String>,
        func_name: impl Into<String>,
    ) -> Self {
        let (pathname, module, func_name): (String, String, String) =
            (pathname.into(), module.into(), func_name.into());
        self.with_field(raw::PATHNAME, pathname)
            .with_field(raw::LINENO, lineno)
            .with_field(raw::MODULE, module)
            .with_field(raw::FUNC_NAME, func_name)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.fields.remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Cloud Namespace, if the core initializer ran.
    pub fn namespace(&self) -> Option<&Map<String, Value>> {
        self.fields.get(CLOUD_LOGGING_KEY).and_then(Value::as_object)
    }

    pub fn namespace_mut(&mut self) -> Result<&mut Map<String, Value>, ProcessError> {
        self.fields
            .get_mut(CLOUD_LOGGING_KEY)
            .and_then(Value::as_object_mut)
            .ok_or(ProcessError::MissingNamespace)
    }

    /// Set the severity and write its vendor name into the Cloud Namespace.
    pub fn set_severity(&mut self, severity: Severity) -> Result<(), ProcessError> {
        self.namespace_mut()?
            .insert(cloud::SEVERITY.to_string(), Value::from(severity.as_str()));
        self.severity = Some(severity);
        Ok(())
    }

    /// Render the record as a single JSON object.
    pub fn to_json(&self) -> Value {
        Value::Object(self.fields.clone().into_iter().collect())
    }
}

/// RFC 3339 in UTC with microsecond precision, e.g.
/// `2023-04-01T08:00:00.000000Z`.
pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
}
