use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Cloud Logging severities emitted by this crate.
///
/// See <https://cloud.google.com/logging/docs/reference/v2/rest/v2/LogEntry#LogSeverity>.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    /// The log entry has no assigned severity level.
    #[default]
    Default,
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

/// Lowercase level name to vendor severity.
const SEVERITY_MAPPING: &[(&str, Severity)] = &[
    ("notset", Severity::Default),
    ("debug", Severity::Debug),
    ("info", Severity::Info),
    ("warn", Severity::Warning),
    ("warning", Severity::Warning),
    ("error", Severity::Error),
    ("critical", Severity::Critical),
];

impl Severity {
    /// Map a log level name, case-insensitively. Unknown names map to
    /// [`Severity::Default`].
    pub fn from_level_name(name: &str) -> Severity {
        SEVERITY_MAPPING
            .iter()
            .find(|(level, _)| level.eq_ignore_ascii_case(name))
            .map(|(_, severity)| *severity)
            .unwrap_or_default()
    }

    /// Vendor name as written on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Default => "DEFAULT",
            Severity::Debug => "DEBUG",
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
            Severity::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing a vendor severity name.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown severity `{0}`")]
pub struct ParseSeverityError(pub String);

impl FromStr for Severity {
    type Err = ParseSeverityError;

    /// Parse an exact vendor name such as `"WARNING"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DEFAULT" => Ok(Severity::Default),
            "DEBUG" => Ok(Severity::Debug),
            "INFO" => Ok(Severity::Info),
            "WARNING" => Ok(Severity::Warning),
            "ERROR" => Ok(Severity::Error),
            "CRITICAL" => Ok(Severity::Critical),
            other => Err(ParseSeverityError(other.to_string())),
        }
    }
}

impl From<&tracing::Level> for Severity {
    fn from(level: &tracing::Level) -> Self {
        Severity::from_level_name(level.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_known_level_names() {
        assert_eq!(Severity::from_level_name("notset"), Severity::Default);
        assert_eq!(Severity::from_level_name("debug"), Severity::Debug);
        assert_eq!(Severity::from_level_name("info"), Severity::Info);
        assert_eq!(Severity::from_level_name("warn"), Severity::Warning);
        assert_eq!(Severity::from_level_name("warning"), Severity::Warning);
        assert_eq!(Severity::from_level_name("error"), Severity::Error);
        assert_eq!(Severity::from_level_name("critical"), Severity::Critical);
    }

    #[test]
    fn mapping_ignores_case() {
        assert_eq!(Severity::from_level_name("WARN"), Severity::Warning);
        assert_eq!(Severity::from_level_name("Critical"), Severity::Critical);
    }

    #[test]
    fn unknown_levels_degrade_to_default() {
        for name in ["trace", "notice", "", "fatal", "infoo"] {
            assert_eq!(Severity::from_level_name(name), Severity::Default, "{name}");
        }
    }

    #[test]
    fn tracing_levels_are_always_mapped() {
        assert_eq!(Severity::from(&tracing::Level::TRACE), Severity::Default);
        assert_eq!(Severity::from(&tracing::Level::DEBUG), Severity::Debug);
        assert_eq!(Severity::from(&tracing::Level::INFO), Severity::Info);
        assert_eq!(Severity::from(&tracing::Level::WARN), Severity::Warning);
        assert_eq!(Severity::from(&tracing::Level::ERROR), Severity::Error);
    }

    #[test]
    fn vendor_names_parse_back() {
        for severity in [
            Severity::Default,
            Severity::Debug,
            Severity::Info,
            Severity::Warning,
            Severity::Error,
            Severity::Critical,
        ] {
            assert_eq!(severity.as_str().parse::<Severity>(), Ok(severity));
        }
        assert!("warning".parse::<Severity>().is_err());
    }

    #[test]
    fn serializes_as_vendor_name() {
        let value = serde_json::to_value(Severity::Warning).unwrap();
        assert_eq!(value, serde_json::json!("WARNING"));
    }
}
