use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::time::Duration;

use crate::constants::{cloud, raw};
use crate::error::ProcessError;
use crate::record::EventRecord;

/// HTTP request metadata attached to a log entry.
///
/// Rendered in the `LogEntry.httpRequest` shape, see
/// <https://cloud.google.com/logging/docs/reference/v2/rest/v2/LogEntry#httprequest>.
/// Extracting these values from a web framework is left to the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpRequest {
    /// Request method, e.g. `GET`.
    pub method: Option<String>,
    /// Scheme, host, path and query of the requested URL.
    pub url: Option<String>,
    /// Size of the request in bytes, headers and body included.
    pub size: Option<u64>,
    pub status: Option<u16>,
    /// Size of the response in bytes, headers and body included.
    pub response_size: Option<u64>,
    /// Processing latency on the server, in nanoseconds.
    pub latency_ns: Option<u64>,
    /// e.g. `HTTP/1.1`, `HTTP/2`.
    pub protocol: Option<String>,
    pub referer: Option<String>,
    pub user_agent: Option<String>,
    /// Client address, optionally with a port.
    pub remote_ip: Option<String>,
    /// Origin server address, optionally with a port.
    pub server_ip: Option<String>,
    pub cache_lookup: Option<bool>,
    pub cache_hit: Option<bool>,
    /// Only meaningful when `cache_hit` is set.
    pub cache_validated_with_origin_server: Option<bool>,
    /// Bytes inserted into cache, when a cache fill was attempted.
    pub cache_fill: Option<u64>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HttpRequestEntry<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    request_method: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_agent: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    remote_ip: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    server_ip: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    referer: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    latency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cache_lookup: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cache_hit: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cache_validated_with_origin_server: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cache_fill_bytes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    protocol: Option<&'a str>,
}

impl HttpRequest {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        HttpRequest {
            method: Some(method.into()),
            url: Some(url.into()),
            ..Default::default()
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency_ns = Some(u64::try_from(latency.as_nanos()).unwrap_or(u64::MAX));
        self
    }

    fn entry(&self) -> HttpRequestEntry<'_> {
        HttpRequestEntry {
            request_method: self.method.as_deref(),
            request_url: self.url.as_deref(),
            request_size: self.size.map(|v| v.to_string()),
            status: self.status,
            response_size: self.response_size.map(|v| v.to_string()),
            user_agent: self.user_agent.as_deref(),
            remote_ip: self.remote_ip.as_deref(),
            server_ip: self.server_ip.as_deref(),
            referer: self.referer.as_deref(),
            latency: self.latency_ns.map(format_latency),
            cache_lookup: self.cache_lookup,
            cache_hit: self.cache_hit,
            cache_validated_with_origin_server: self.cache_validated_with_origin_server,
            cache_fill_bytes: self.cache_fill.map(|v| v.to_string()),
            protocol: self.protocol.as_deref(),
        }
    }

    /// Format as a `LogEntry.httpRequest` object. Unset values are omitted.
    pub fn format(&self) -> Map<String, Value> {
        match serde_json::to_value(self.entry()) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }
}

/// Writes the formatted request as JSON, so it can be recorded on a
/// `tracing` event with `http_request = %request`.
impl fmt::Display for HttpRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string(&self.entry()).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}

impl EventRecord {
    pub fn with_http_request(self, request: &HttpRequest) -> Self {
        self.with_field(raw::HTTP_REQUEST, Value::Object(request.format()))
    }
}

/// Format a nanosecond duration as a seconds string, trimming trailing
/// zeros: `15_000_000` is `"0.015s"`, `1_000_000_000` is `"1s"`.
pub fn format_latency(latency_ns: u64) -> String {
    let seconds = latency_ns / 1_000_000_000;
    let nanos = latency_ns % 1_000_000_000;
    if nanos == 0 {
        return format!("{}s", seconds);
    }

    let fraction = format!("{:09}", nanos);
    format!("{}.{}s", seconds, fraction.trim_end_matches('0'))
}

/// Move an attached `http_request` object into the Cloud Namespace as
/// `httpRequest`.
///
/// Accepts either the formatted object or its JSON text. Text that is not
/// a JSON object is left in the free-form fields.
pub fn http_request(mut record: EventRecord) -> Result<EventRecord, ProcessError> {
    let request = match record.remove(raw::HTTP_REQUEST) {
        None => return Ok(record),
        Some(Value::Object(request)) => request,
        Some(Value::String(text)) => match serde_json::from_str::<Value>(&text) {
            Ok(Value::Object(request)) => request,
            _ => {
                record.insert(raw::HTTP_REQUEST, Value::String(text));
                return Ok(record);
            }
        },
        Some(other) => {
            record.insert(raw::HTTP_REQUEST, other);
            return Ok(record);
        }
    };

    record
        .namespace_mut()?
        .insert(cloud::HTTP_REQUEST.to_string(), Value::Object(request));
    Ok(record)
}
