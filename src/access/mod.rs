//! Workspace authorization: a fixed role policy table, a super-admin
//! override, and an injected directory for the three lookups it needs.

pub mod directory;
pub mod permission;
pub mod resolver;
pub mod role;

use thiserror::Error;

#[cfg(test)]
pub use directory::MockAccessDirectory;
pub use directory::{
    AccessDirectory, RoleId, RoleRecord, UserId, UserProfile, WorkspaceId, WorkspaceMembership,
};
pub use permission::{Grants, Permission};
pub use resolver::{AccessDecision, Authorizer, decide};
pub use role::{RoleName, grants_for_role_name};

#[derive(Debug, Error)]
pub enum AccessError {
    #[error("Invalid permission: {0}")]
    InvalidPermission(String),
    #[error("Unknown permission: {0}")]
    UnknownPermission(String),
    #[error("Unknown role: {0}")]
    UnknownRole(String),
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),
    #[error("Directory lookup failed: {0}")]
    Lookup(String),
}
