//! Tracing subscriber initialization
//!
//! The console only ships the basic `tracing-subscriber` pipeline: an
//! `EnvFilter` plus either a human-readable or a JSON formatter.

mod init_basic;

pub use init_basic::{init_telemetry, shutdown_telemetry, LogFormat, TelemetryConfig};
