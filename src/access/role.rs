use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{AccessError, Grants, Permission};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleName {
    Owner,
    Admin,
    Editor,
    Analyst,
    Support,
}

impl RoleName {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoleName::Owner => "owner",
            RoleName::Admin => "admin",
            RoleName::Editor => "editor",
            RoleName::Analyst => "analyst",
            RoleName::Support => "support",
        }
    }

    pub fn all() -> &'static [RoleName] {
        const ALL: &[RoleName] = &[
            RoleName::Owner,
            RoleName::Admin,
            RoleName::Editor,
            RoleName::Analyst,
            RoleName::Support,
        ];

        ALL
    }

    pub fn description(&self) -> &'static str {
        match self {
            RoleName::Owner => "Full access to the workspace and its billing",
            RoleName::Admin => "Manages members, pages and content",
            RoleName::Editor => "Creates and edits content",
            RoleName::Analyst => "Reads analytics and content",
            RoleName::Support => "Reads content and replies to messages",
        }
    }

    /// The fixed policy table.
    pub fn grants(&self) -> Grants {
        match self {
            RoleName::Owner => Grants::All,
            RoleName::Admin => Grants::Only(&[
                Permission::ManageMembers,
                Permission::ViewAnalytics,
                Permission::CreateContent,
                Permission::EditContent,
                Permission::ViewContent,
                Permission::ManagePages,
            ]),
            RoleName::Editor => Grants::Only(&[
                Permission::CreateContent,
                Permission::EditContent,
                Permission::ViewContent,
            ]),
            RoleName::Analyst => Grants::Only(&[Permission::ViewAnalytics, Permission::ViewContent]),
            RoleName::Support => Grants::Only(&[Permission::ViewContent, Permission::ReplyMessages]),
        }
    }
}

impl fmt::Display for RoleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoleName {
    type Err = AccessError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        RoleName::all()
            .iter()
            .copied()
            .find(|role| role.as_str() == value)
            .ok_or_else(|| AccessError::UnknownRole(value.to_string()))
    }
}

/// Roles missing from the table grant nothing.
pub fn grants_for_role_name(name: &str) -> Grants {
    name.parse::<RoleName>()
        .map(|role| role.grants())
        .unwrap_or(Grants::NONE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_grants_everything() {
        assert_eq!(RoleName::Owner.grants(), Grants::All);
    }

    #[test]
    fn editor_can_create_edit_and_view_content() {
        let grants = RoleName::Editor.grants();

        assert!(grants.allows(Some(Permission::CreateContent)));
        assert!(grants.allows(Some(Permission::EditContent)));
        assert!(grants.allows(Some(Permission::ViewContent)));
        assert!(!grants.allows(Some(Permission::ManageMembers)));
    }

    #[test]
    fn admin_cannot_reply_to_messages() {
        let grants = RoleName::Admin.grants();

        assert!(grants.allows(Some(Permission::ManagePages)));
        assert!(!grants.allows(Some(Permission::ReplyMessages)));
    }

    #[test]
    fn analyst_and_support_are_read_mostly() {
        assert!(RoleName::Analyst.grants().allows(Some(Permission::ViewAnalytics)));
        assert!(!RoleName::Analyst.grants().allows(Some(Permission::EditContent)));
        assert!(RoleName::Support.grants().allows(Some(Permission::ReplyMessages)));
        assert!(!RoleName::Support.grants().allows(Some(Permission::ViewAnalytics)));
    }

    #[test]
    fn unknown_role_name_grants_nothing() {
        let grants = grants_for_role_name("moderator");

        assert_eq!(grants, Grants::NONE);
        assert!(!grants.allows(Some(Permission::ViewContent)));
    }

    #[test]
    fn role_names_are_case_sensitive() {
        assert!("Owner".parse::<RoleName>().is_err());
        assert_eq!(grants_for_role_name("Owner"), Grants::NONE);
    }

    #[test]
    fn role_names_round_trip() {
        for role in RoleName::all() {
            assert_eq!(role.as_str().parse::<RoleName>().unwrap(), *role);
        }
    }
}
