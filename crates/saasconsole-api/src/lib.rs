//! SaaS Console API Library
//!
//! HTTP handlers, authentication, background services and application setup.

mod api_doc;
pub mod constants;
pub mod email_queue;
mod handlers;
pub mod services;
pub mod setup;

pub mod auth;
pub mod error;
pub mod state;

pub use error::HttpAppError;
pub use saasconsole_infra::ErrorResponse;
