pub mod constants;
pub mod env;
pub mod error;
pub mod severity;
pub mod record;
pub mod processors;
pub mod http;
pub mod reporting;
pub mod chain;
pub mod sink;
pub mod layer;

pub mod init;
pub mod noop_sink;

pub use chain::{Chain, ChainConfig, Processor};
pub use error::{ConfigError, InitError, ProcessError};
pub use http::HttpRequest;
pub use layer::CloudLoggingLayer;
pub use processors::FieldPlacement;
pub use record::EventRecord;
pub use reporting::{ExceptionSeverity, ServiceContext};
pub use severity::Severity;
