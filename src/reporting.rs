//! Error Reporting processors.
//!
//! A log entry is picked up by Error Reporting when it carries
//! `@type = ReportedErrorEvent`, a `serviceContext` and either a stack
//! trace or a `context.reportLocation`. See
//! <https://cloud.google.com/error-reporting/docs/formatting-error-messages>.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

use crate::constants::{cloud, raw, ERROR_EVENT_TYPE, SOURCE_LOCATION_KEY, TYPE_KEY};
use crate::env::{self, K_REVISION_ENV, K_SERVICE_ENV, UNKNOWN_SERVICE, UNKNOWN_VERSION};
use crate::error::ProcessError;
use crate::record::EventRecord;
use crate::severity::Severity;

/// Severity applied to records carrying an exception.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExceptionSeverity {
    /// Keep the severity of the log call.
    #[default]
    Inherit,
    /// Override with a fixed severity, e.g. `CRITICAL`.
    Fixed(Severity),
}

/// Default set of severities promoted to Error Reporting events.
pub fn default_report_severities() -> BTreeSet<Severity> {
    BTreeSet::from([Severity::Critical])
}

/// Turn an attached `exception` into an Error Reporting event.
///
/// The stack trace is the message followed by the exception text on the
/// next line. Records without an exception pass through untouched.
pub fn report_exception(
    mut record: EventRecord,
    severity: ExceptionSeverity,
) -> Result<EventRecord, ProcessError> {
    let exception = match record.remove(raw::EXCEPTION) {
        None | Some(Value::Null) => return Ok(record),
        Some(Value::String(text)) => text,
        Some(other) => other.to_string(),
    };

    if let ExceptionSeverity::Fixed(severity) = severity {
        record.set_severity(severity)?;
    }

    let namespace = record.namespace_mut()?;
    namespace.insert(TYPE_KEY.to_string(), Value::from(ERROR_EVENT_TYPE));

    let message = match namespace.get(cloud::MESSAGE) {
        Some(Value::String(message)) => message.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    };
    namespace.insert(
        cloud::STACK_TRACE.to_string(),
        Value::String(format!("{}\n{}", message, exception)),
    );

    Ok(record)
}

/// Promote records with a report severity, or an attached stack trace, to
/// Error Reporting events.
///
/// Requires [`code_location`](crate::processors::code_location) to have
/// run first: the source location is reused as `context.reportLocation`.
pub fn report_error(
    mut record: EventRecord,
    severities: &BTreeSet<Severity>,
) -> Result<EventRecord, ProcessError> {
    let selected = record.severity.map_or(false, |s| severities.contains(&s));

    let namespace = record.namespace_mut()?;
    let has_stack_trace = namespace.contains_key(cloud::STACK_TRACE);

    if !selected && !has_stack_trace {
        return Ok(record);
    }

    let location = namespace
        .get(SOURCE_LOCATION_KEY)
        .cloned()
        .ok_or(ProcessError::MissingSourceLocation)?;

    let mut context = Map::new();
    context.insert(cloud::REPORT_LOCATION.to_string(), location);

    namespace.insert(TYPE_KEY.to_string(), Value::from(ERROR_EVENT_TYPE));
    namespace.insert(cloud::CONTEXT.to_string(), Value::Object(context));

    Ok(record)
}

/// Service in which an error occurred.
///
/// See <https://cloud.google.com/error-reporting/reference/rest/v1beta1/ServiceContext>.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceContext {
    pub service: String,
    pub version: String,
}

impl ServiceContext {
    pub fn new(service: impl Into<String>, version: impl Into<String>) -> Self {
        ServiceContext {
            service: service.into(),
            version: version.into(),
        }
    }

    /// Resolve from explicit values, then `K_SERVICE` / `K_REVISION`,
    /// then the `"unknown service"` / `"unknown version"` literals.
    pub fn resolve(service: Option<String>, version: Option<String>) -> Self {
        ServiceContext::resolve_with(service, version, env::lookup)
    }

    /// Same as [`ServiceContext::resolve`] with a custom variable lookup.
    pub fn resolve_with<F>(service: Option<String>, version: Option<String>, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        ServiceContext {
            service: service
                .or_else(|| lookup(K_SERVICE_ENV))
                .unwrap_or_else(|| UNKNOWN_SERVICE.to_string()),
            version: version
                .or_else(|| lookup(K_REVISION_ENV))
                .unwrap_or_else(|| UNKNOWN_VERSION.to_string()),
        }
    }

    /// Attach the service context to Error Reporting events only.
    pub fn attach(&self, mut record: EventRecord) -> Result<EventRecord, ProcessError> {
        let namespace = record.namespace_mut()?;

        let is_error_event = namespace.get(TYPE_KEY).and_then(Value::as_str) == Some(ERROR_EVENT_TYPE);
        if !is_error_event {
            return Ok(record);
        }

        let mut context = Map::new();
        context.insert("service".to_string(), Value::from(self.service.as_str()));
        context.insert("version".to_string(), Value::from(self.version.as_str()));
        namespace.insert(cloud::SERVICE_CONTEXT.to_string(), Value::Object(context));

        Ok(record)
    }
}
