use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::AccessError;

/// Actions a workspace member can be granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    ManageMembers,
    ViewAnalytics,
    CreateContent,
    EditContent,
    ViewContent,
    ManagePages,
    ReplyMessages,
}

impl Permission {
    /// Stable identifier used in storage and on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::ManageMembers => "manage_members",
            Permission::ViewAnalytics => "view_analytics",
            Permission::CreateContent => "create_content",
            Permission::EditContent => "edit_content",
            Permission::ViewContent => "view_content",
            Permission::ManagePages => "manage_pages",
            Permission::ReplyMessages => "reply_messages",
        }
    }

    pub fn all() -> &'static [Permission] {
        const ALL: &[Permission] = &[
            Permission::ManageMembers,
            Permission::ViewAnalytics,
            Permission::CreateContent,
            Permission::EditContent,
            Permission::ViewContent,
            Permission::ManagePages,
            Permission::ReplyMessages,
        ];

        ALL
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Permission {
    type Err = AccessError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Permission::all()
            .iter()
            .copied()
            .find(|permission| permission.as_str() == value)
            .ok_or_else(|| AccessError::UnknownPermission(value.to_string()))
    }
}

/// What a role allows: everything, or an explicit list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grants {
    All,
    Only(&'static [Permission]),
}

impl Grants {
    pub const NONE: Grants = Grants::Only(&[]);

    /// `None` stands for a permission identifier outside the known set; only
    /// the wildcard grant allows it.
    pub fn allows(&self, requested: Option<Permission>) -> bool {
        match (self, requested) {
            (Grants::All, _) => true,
            (Grants::Only(granted), Some(permission)) => granted.contains(&permission),
            (Grants::Only(_), None) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_permission_round_trips_through_its_identifier() {
        for permission in Permission::all() {
            assert_eq!(permission.as_str().parse::<Permission>().unwrap(), *permission);
        }
    }

    #[test]
    fn unknown_identifier_fails_to_parse() {
        let result = "delete_everything".parse::<Permission>();
        assert!(matches!(result, Err(AccessError::UnknownPermission(_))));
    }

    #[test]
    fn wildcard_sentinel_is_not_a_permission() {
        assert!("all".parse::<Permission>().is_err());
    }

    #[test]
    fn wildcard_allows_unrecognised_permissions() {
        assert!(Grants::All.allows(None));
        assert!(Grants::All.allows(Some(Permission::ManageMembers)));
    }

    #[test]
    fn explicit_grants_only_allow_listed_permissions() {
        let grants = Grants::Only(&[Permission::ViewContent]);

        assert!(grants.allows(Some(Permission::ViewContent)));
        assert!(!grants.allows(Some(Permission::EditContent)));
        assert!(!grants.allows(None));
    }

    #[test]
    fn empty_grants_allow_nothing() {
        assert!(Permission::all().iter().all(|p| !Grants::NONE.allows(Some(*p))));
    }

    #[test]
    fn permission_serializes_as_identifier() {
        let json = serde_json::to_string(&Permission::ReplyMessages).unwrap();
        assert_eq!(json, "\"reply_messages\"");
    }
}
