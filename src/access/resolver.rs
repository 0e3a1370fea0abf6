use std::sync::Arc;

use super::{
    AccessDirectory, AccessError, Grants, Permission, UserId, WorkspaceId, grants_for_role_name,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Allow,
    Deny,
}

impl AccessDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, AccessDecision::Allow)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AccessDecision::Allow => "allow",
            AccessDecision::Deny => "deny",
        }
    }
}

impl From<bool> for AccessDecision {
    fn from(allowed: bool) -> Self {
        if allowed {
            AccessDecision::Allow
        } else {
            AccessDecision::Deny
        }
    }
}

/// The last step of authorization once the role is known.
pub fn decide(grants: Grants, requested: Option<Permission>) -> AccessDecision {
    grants.allows(requested).into()
}

/// Per-workspace authorization over an injected directory.
#[derive(Clone)]
pub struct Authorizer {
    directory: Arc<dyn AccessDirectory>,
}

impl Authorizer {
    pub fn new(directory: Arc<dyn AccessDirectory>) -> Self {
        Self { directory }
    }

    /// Resolves a permission identifier. Identifiers match exactly; anything
    /// unrecognised, padded ones included, is denied unless the caller is a
    /// super-admin or holds the wildcard grant.
    pub async fn authorize(
        &self,
        user_id: UserId,
        workspace_id: WorkspaceId,
        permission: &str,
    ) -> Result<AccessDecision, AccessError> {
        if permission.trim().is_empty() {
            return Err(AccessError::InvalidPermission(
                "permission must not be empty".to_string(),
            ));
        }

        let requested = permission.parse::<Permission>().ok();
        if requested.is_none() {
            tracing::debug!("Unrecognised permission '{}' requested by {}", permission, user_id);
        }

        self.resolve(user_id, workspace_id, requested).await
    }

    pub async fn authorize_permission(
        &self,
        user_id: UserId,
        workspace_id: WorkspaceId,
        permission: Permission,
    ) -> Result<AccessDecision, AccessError> {
        self.resolve(user_id, workspace_id, Some(permission)).await
    }

    /// Fail-closed variant: a failed lookup counts as a denial.
    pub async fn authorize_or_deny(
        &self,
        user_id: UserId,
        workspace_id: WorkspaceId,
        permission: &str,
    ) -> AccessDecision {
        match self.authorize(user_id, workspace_id, permission).await {
            Ok(decision) => decision,
            Err(e) => {
                tracing::warn!(
                    "Denying '{}' for {} in {} after lookup failure: {}",
                    permission,
                    user_id,
                    workspace_id,
                    e
                );
                AccessDecision::Deny
            }
        }
    }

    async fn resolve(
        &self,
        user_id: UserId,
        workspace_id: WorkspaceId,
        requested: Option<Permission>,
    ) -> Result<AccessDecision, AccessError> {
        let Some(profile) = self.directory.user_profile(user_id).await? else {
            tracing::debug!("No profile for {}", user_id);
            return Ok(AccessDecision::Deny);
        };

        // Evaluated before membership: super-admins need none.
        if profile.is_super_admin {
            return Ok(AccessDecision::Allow);
        }

        let Some(membership) = self.directory.membership(user_id, workspace_id).await? else {
            tracing::debug!("{} is not a member of {}", user_id, workspace_id);
            return Ok(AccessDecision::Deny);
        };

        let grants = match self.directory.role(membership.role_id).await? {
            Some(role) => grants_for_role_name(&role.name),
            None => {
                tracing::warn!("Membership of {} references missing role {}", user_id, membership.role_id);
                Grants::NONE
            }
        };

        Ok(decide(grants, requested))
    }
}
