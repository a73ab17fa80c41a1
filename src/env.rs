//! Environment variable names read when resolving the service context.
//!
//! These are set automatically by Cloud Run and Cloud Functions. The
//! chain itself never reads the environment after construction.

/// Name of the running service.
pub const K_SERVICE_ENV: &str = "K_SERVICE";

/// Revision of the running service.
pub const K_REVISION_ENV: &str = "K_REVISION";

/// Fallback service name when neither an explicit value nor `K_SERVICE`
/// is available.
pub const UNKNOWN_SERVICE: &str = "unknown service";

/// Fallback version when neither an explicit value nor `K_REVISION` is
/// available.
pub const UNKNOWN_VERSION: &str = "unknown version";

/// Read an environment variable; unset or non-UTF-8 values are `None`.
pub fn lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}
