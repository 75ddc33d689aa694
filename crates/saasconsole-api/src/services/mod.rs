pub mod audit;
pub mod email;
pub mod integration_cleanup;
pub mod members;
pub mod permissions;
pub mod scheduler;
