//! Data models for the console
//!
//! Entity structs serialise with the PascalCase attribute names used by the
//! table, so one type serves both as the stored row and as the response body.
//! Request DTOs use snake_case and carry `validator` rules.

mod company;
mod department;
mod group;
mod integration;
mod job;
mod log;
mod membership;
mod notification;
mod pagination;
mod permission;
mod role;
mod role_request;
mod status;
pub mod timestamp;
mod user;

pub use company::*;
pub use department::*;
pub use group::*;
pub use integration::*;
pub use job::*;
pub use log::*;
pub use membership::*;
pub use notification::*;
pub use pagination::*;
pub use permission::*;
pub use role::*;
pub use role_request::*;
pub use status::*;
pub use user::*;
