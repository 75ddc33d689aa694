//! API constants

/// API base path prefix (version-independent)
pub const API_BASE: &str = "/api";

/// Versioned prefix every protected route is mounted under
pub const API_PREFIX: &str = "/api/v1";

/// Failed authentication attempts allowed per client within the window
pub const AUTH_MAX_FAILURES: u32 = 10;

/// Window of the failed-authentication counter, in seconds
pub const AUTH_FAILURE_WINDOW_SECS: u64 = 900;

/// Timeout of a single health probe, in seconds
pub const HEALTH_CHECK_TIMEOUT_SECS: u64 = 5;
