//! SaaS Console Data Access Library
//!
//! This crate provides the single-table store abstraction and the entity
//! repositories built on top of it.
//!
//! # Table layout
//!
//! Every entity lives in one table, keyed by `PK`/`SK` strings built in
//! `saasconsole_core::keys` and tagged with a `Type` attribute. Four secondary
//! indexes serve the access patterns that the primary key cannot:
//!
//! - `InvertedIndex` (`SK`, `PK`): everything a user belongs to
//! - `GetUsers` (`PK`, `GSI_SK`): company members in search-key order
//! - `GetRoles` (`Type`, `SearchKey`): rows of one type, such as roles or jobs
//! - `GetLogs` (`CompanyID`, `CreatedAt`): company activity in time order
//!
//! The in-memory backend answers queries the same way DynamoDB does, so the
//! repositories are tested against it.

pub mod repositories;
pub mod store;

// Re-export commonly used types
pub use repositories::{
    CompanyRepository, DepartmentRepository, GroupRepository, IntegrationRepository,
    JobRepository, LogRepository, MemberFilter, MembershipRepository, NotificationRepository,
    RoleRepository, RoleRequestRepository, UserRepository,
};
pub use store::factory::create_store;
pub use store::memory::MemoryStore;
pub use store::{cursor, ItemStore, StoreError, StoreResult};
#[cfg(feature = "store-dynamodb")]
pub use store::dynamo::{DynamoStore, DynamoStoreConfig};
