use serde::Deserialize;
use std::collections::BTreeSet;

use crate::error::{ConfigError, ProcessError};
use crate::http;
use crate::processors::{self, FieldPlacement};
use crate::record::EventRecord;
use crate::reporting::{self, default_report_severities, ExceptionSeverity, ServiceContext};
use crate::severity::Severity;

/// Configuration of a processor [`Chain`].
///
/// `service` and `version` fall back to `K_SERVICE` / `K_REVISION` and
/// then to `"unknown service"` / `"unknown version"`. Resolution happens
/// once, when the chain is built.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    pub service: Option<String>,
    pub version: Option<String>,
    /// Severities promoted to Error Reporting events. Defaults to
    /// `CRITICAL` only.
    pub report_severities: BTreeSet<Severity>,
    pub exception_severity: ExceptionSeverity,
    pub field_placement: FieldPlacement,
}

impl Default for ChainConfig {
    fn default() -> Self {
        ChainConfig {
            service: None,
            version: None,
            report_severities: default_report_severities(),
            exception_severity: ExceptionSeverity::default(),
            field_placement: FieldPlacement::default(),
        }
    }
}

impl ChainConfig {
    pub fn service(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn report_severities(mut self, severities: impl IntoIterator<Item = Severity>) -> Self {
        self.report_severities = severities.into_iter().collect();
        self
    }

    pub fn exception_severity(mut self, severity: ExceptionSeverity) -> Self {
        self.exception_severity = severity;
        self
    }

    pub fn field_placement(mut self, placement: FieldPlacement) -> Self {
        self.field_placement = placement;
        self
    }
}

/// A single formatting step.
#[derive(Debug, Clone, PartialEq)]
pub enum Processor {
    InitCloudLogging,
    LogSeverity,
    CodeLocation,
    HttpRequest,
    ReportException(ExceptionSeverity),
    ReportError(BTreeSet<Severity>),
    ServiceContext(ServiceContext),
    Finalize(FieldPlacement),
}

impl Processor {
    pub fn apply(&self, record: EventRecord) -> Result<EventRecord, ProcessError> {
        match self {
            Processor::InitCloudLogging => processors::init_cloud_logging(record),
            Processor::LogSeverity => processors::log_severity(record),
            Processor::CodeLocation => processors::code_location(record),
            Processor::HttpRequest => http::http_request(record),
            Processor::ReportException(severity) => reporting::report_exception(record, *severity),
            Processor::ReportError(severities) => reporting::report_error(record, severities),
            Processor::ServiceContext(context) => context.attach(record),
            Processor::Finalize(placement) => processors::finalize_cloud_logging(record, placement),
        }
    }
}

/// Ordered sequence of processors turning a raw record into a Cloud
/// Logging entry.
///
/// The order is fixed by the constructor: the namespace is initialized
/// first, the source location is in place before error selection, the
/// service context is attached after both error processors, and the
/// finalizer runs last.
#[derive(Debug, Clone, PartialEq)]
pub struct Chain {
    processors: Vec<Processor>,
}

impl Chain {
    /// Build a chain, resolving the service context from `config` and the
    /// process environment.
    pub fn new(config: &ChainConfig) -> Result<Self, ConfigError> {
        let context = ServiceContext::resolve(config.service.clone(), config.version.clone());
        Chain::with_service_context(config, context)
    }

    /// Build a chain with an already resolved service context.
    ///
    /// Fails if a nested field placement would overwrite a well-known key.
    pub fn with_service_context(
        config: &ChainConfig,
        context: ServiceContext,
    ) -> Result<Self, ConfigError> {
        config.field_placement.validate()?;

        let processors = vec![
            Processor::InitCloudLogging,
            Processor::LogSeverity,
            Processor::CodeLocation,
            Processor::HttpRequest,
            Processor::ReportException(config.exception_severity),
            Processor::ReportError(config.report_severities.clone()),
            Processor::ServiceContext(context),
            Processor::Finalize(config.field_placement.clone()),
        ];

        Ok(Chain { processors })
    }

    pub fn processors(&self) -> &[Processor] {
        &self.processors
    }

    /// Run every processor in order. The first precondition failure aborts
    /// the chain.
    pub fn process(&self, record: EventRecord) -> Result<EventRecord, ProcessError> {
        self.processors
            .iter()
            .try_fold(record, |record, processor| processor.apply(record))
    }
}
