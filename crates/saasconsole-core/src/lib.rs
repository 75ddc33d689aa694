//! SaaS Console Core Library
//!
//! This crate provides the domain models, error types, configuration, key builders
//! and validation that are shared across all console components.

pub mod config;
pub mod constants;
pub mod error;
pub mod keys;
pub mod models;
pub mod store_types;
pub mod validation;

// Re-export commonly used types
pub use config::{BaseConfig, Config, ConsoleConfig};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use store_types::StoreBackend;
