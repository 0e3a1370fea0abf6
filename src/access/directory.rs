use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::AccessError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(Uuid);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkspaceId(Uuid);

pub type RoleId = i64;

macro_rules! uuid_identifier {
    ($name:ident) => {
        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn from_uuid(value: Uuid) -> Self {
                Self(value)
            }

            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl FromStr for $name {
            type Err = AccessError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(value.trim())
                    .map(Self)
                    .map_err(|_| AccessError::InvalidIdentifier(value.to_string()))
            }
        }
    };
}

uuid_identifier!(UserId);
uuid_identifier!(WorkspaceId);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub full_name: Option<String>,
    pub is_super_admin: bool,
}

/// A user's single role inside one workspace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceMembership {
    pub workspace_id: WorkspaceId,
    pub user_id: UserId,
    pub role_id: RoleId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleRecord {
    pub id: RoleId,
    pub name: String,
    pub description: Option<String>,
}

/// Lookups the authorizer depends on. "Not found" is `Ok(None)`; errors are
/// reserved for the store being unreachable or corrupt.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccessDirectory: Send + Sync {
    async fn user_profile(&self, user_id: UserId) -> Result<Option<UserProfile>, AccessError>;

    async fn membership(
        &self,
        user_id: UserId,
        workspace_id: WorkspaceId,
    ) -> Result<Option<WorkspaceMembership>, AccessError>;

    async fn role(&self, role_id: RoleId) -> Result<Option<RoleRecord>, AccessError>;
}
