//! SaaS Console Infrastructure Library
//!
//! This crate provides shared infrastructure components used by the console API:
//! - Middleware (request ID, security headers)
//! - Tracing initialization
//! - HTTP error response bodies

#[cfg(feature = "middleware")]
pub mod middleware;

#[cfg(feature = "observability-basic")]
pub mod telemetry;

pub mod error;

// Re-export commonly used types
#[cfg(feature = "middleware")]
pub use middleware::{
    get_request_id, request_id_middleware, request_span, security_headers_middleware, RequestId,
    SecurityHeaders,
};

#[cfg(feature = "observability-basic")]
pub use telemetry::{init_telemetry, shutdown_telemetry, LogFormat, TelemetryConfig};

pub use error::ErrorResponse;
