/// Precondition violation raised while running the processor chain.
///
/// These signal a malformed record handed over by the logging engine, not
/// a recoverable user error. Lookup misses and absent optional fields are
/// never reported through this type.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ProcessError {
    #[error("record is missing required field `{0}`")]
    MissingField(&'static str),

    #[error("record has no cloud logging namespace; the core initializer did not run")]
    MissingNamespace,

    #[error("record has no source location; the code location processor did not run")]
    MissingSourceLocation,
}

/// Invalid [`ChainConfig`](crate::chain::ChainConfig), detected when the
/// chain is built.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("nested field placement key `{0}` collides with a reserved Cloud Logging key")]
    ReservedPlacementKey(String),
}

/// Error type returned when installing the global subscriber.
#[derive(thiserror::Error, Debug)]
pub enum InitError {
    #[error("invalid chain configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to set global subscriber: {0}")]
    SetGlobalDefault(#[from] tracing::subscriber::SetGlobalDefaultError),
}
