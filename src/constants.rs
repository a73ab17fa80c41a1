//! Well-known keys and type markers of the Cloud Logging and Error
//! Reporting JSON formats.
//!
//! See <https://cloud.google.com/logging/docs/structured-logging#special-payload-fields>.

/// `@type` value flagging a log entry as an Error Reporting event.
pub const ERROR_EVENT_TYPE: &str =
    "type.googleapis.com/google.devtools.clouderrorreporting.v1beta1.ReportedErrorEvent";

/// Key holding the `{file, line, function}` source location.
pub const SOURCE_LOCATION_KEY: &str = "logging.googleapis.com/sourceLocation";

/// Conventional key for string labels when free-form fields are nested.
pub const LABELS_KEY: &str = "logging.googleapis.com/labels";

/// Reserved key under which the Cloud Namespace lives while a record is
/// being processed. Removed by the finalizer.
pub const CLOUD_LOGGING_KEY: &str = "cloud-logging";

/// Marker key of an Error Reporting event.
pub const TYPE_KEY: &str = "@type";

/// Top-level keys written by the finalizer from the Cloud Namespace.
///
/// Caller fields may not occupy these keys in the output: with top-level
/// placement they are renamed with [`RESERVED_FIELD_PREFIX`], and a nested
/// placement key may not be one of them.
pub const RESERVED_KEYS: &[&str] = &[
    cloud::MESSAGE,
    cloud::TIME,
    cloud::SEVERITY,
    SOURCE_LOCATION_KEY,
    cloud::HTTP_REQUEST,
    TYPE_KEY,
    cloud::CONTEXT,
    cloud::SERVICE_CONTEXT,
    cloud::STACK_TRACE,
    CLOUD_LOGGING_KEY,
];

/// Prefix applied to caller fields whose key is in [`RESERVED_KEYS`].
pub const RESERVED_FIELD_PREFIX: &str = "field.";

pub fn is_reserved_key(key: &str) -> bool {
    RESERVED_KEYS.contains(&key)
}

/// Raw fields expected on an incoming record.
pub(crate) mod raw {
    pub const MESSAGE: &str = "message";
    pub const TIMESTAMP: &str = "timestamp";
    pub const PATHNAME: &str = "pathname";
    pub const LINENO: &str = "lineno";
    pub const MODULE: &str = "module";
    pub const FUNC_NAME: &str = "func_name";
    pub const EXCEPTION: &str = "exception";
    pub const HTTP_REQUEST: &str = "http_request";

    /// Keys consumed by the processors. Only the event itself may supply
    /// them; they are never inherited from enclosing spans.
    pub const INPUT_KEYS: &[&str] = &[
        MESSAGE,
        TIMESTAMP,
        PATHNAME,
        LINENO,
        MODULE,
        FUNC_NAME,
        EXCEPTION,
        HTTP_REQUEST,
    ];
}

/// Fields written into the Cloud Namespace.
pub(crate) mod cloud {
    pub const MESSAGE: &str = "message";
    pub const TIME: &str = "time";
    pub const SEVERITY: &str = "severity";
    pub const STACK_TRACE: &str = "stack_trace";
    pub const CONTEXT: &str = "context";
    pub const REPORT_LOCATION: &str = "reportLocation";
    pub const SERVICE_CONTEXT: &str = "serviceContext";
    pub const HTTP_REQUEST: &str = "httpRequest";
}
