use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Result as SqliteResult, Row, params};
use serde::Serialize;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;
use uuid::Uuid;

use crate::access::{
    AccessDirectory, AccessError, RoleId, RoleName, RoleRecord, UserId, UserProfile, WorkspaceId,
    WorkspaceMembership,
};
use crate::calendar::ScheduledPost;

use super::admin::PlanFeatures;

pub const DEFAULT_PLAN_ID: &str = "basic";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("Failed to prepare database location: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("User {user_id} is already a member of workspace {workspace_id}")]
    AlreadyMember {
        user_id: UserId,
        workspace_id: WorkspaceId,
    },
    #[error("Plan {0} is still assigned to a workspace")]
    PlanInUse(String),
    #[error("Database connection lock poisoned")]
    LockPoisoned,
}

impl From<StoreError> for AccessError {
    fn from(error: StoreError) -> Self {
        AccessError::Lookup(error.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Workspace {
    pub id: WorkspaceId,
    pub name: String,
    pub owner_id: UserId,
    pub plan_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkspaceWithRole {
    pub workspace: Workspace,
    pub role: RoleRecord,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemberEntry {
    pub user: UserProfile,
    pub role: RoleRecord,
}

/// SQLite-backed store for users, workspaces, memberships, scheduled posts,
/// subscription plans and feature flags.
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let store = Self::new(Connection::open(path)?);
        store.initialize()?;
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let store = Self::new(Connection::open_in_memory()?);
        store.initialize()?;
        Ok(store)
    }

    pub(super) fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    /// Creates the schema and seeds the fixed roles and the basic plan. Safe to
    /// run repeatedly. Foreign keys are enforced on this connection from here on.
    pub fn initialize(&self) -> Result<(), StoreError> {
        let conn = self.conn()?;

        conn.execute_batch(
            "PRAGMA foreign_keys = ON;
            CREATE TABLE IF NOT EXISTS roles (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                description TEXT
            );
            CREATE TABLE IF NOT EXISTS user_profiles (
                id TEXT PRIMARY KEY,
                email TEXT NOT NULL UNIQUE,
                full_name TEXT,
                is_super_admin INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS subscription_plans (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                description TEXT,
                price REAL NOT NULL,
                interval TEXT NOT NULL,
                features TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS workspaces (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                owner_id TEXT NOT NULL REFERENCES user_profiles (id),
                plan_id TEXT NOT NULL REFERENCES subscription_plans (id),
                created_at TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS workspace_members (
                workspace_id TEXT NOT NULL REFERENCES workspaces (id) ON DELETE CASCADE,
                user_id TEXT NOT NULL REFERENCES user_profiles (id) ON DELETE CASCADE,
                role_id INTEGER NOT NULL REFERENCES roles (id),
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (workspace_id, user_id)
            );
            CREATE TABLE IF NOT EXISTS feature_flags (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                description TEXT,
                enabled INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS workspace_feature_flags (
                workspace_id TEXT NOT NULL REFERENCES workspaces (id) ON DELETE CASCADE,
                feature_id INTEGER NOT NULL REFERENCES feature_flags (id) ON DELETE CASCADE,
                enabled INTEGER NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (workspace_id, feature_id)
            );
            CREATE TABLE IF NOT EXISTS scheduled_posts (
                id TEXT PRIMARY KEY,
                workspace_id TEXT NOT NULL,
                scheduled_at TEXT NOT NULL,
                data TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS scheduled_posts_by_time
                ON scheduled_posts (workspace_id, scheduled_at);",
        )?;

        for role in RoleName::all() {
            conn.execute(
                "INSERT OR IGNORE INTO roles (name, description) VALUES (?1, ?2)",
                params![role.as_str(), role.description()],
            )?;
        }

        let now = timestamp(Utc::now());
        conn.execute(
            "INSERT OR IGNORE INTO subscription_plans
                (id, name, description, price, interval, features, created_at, updated_at)
             VALUES (?1, 'Basic', 'Free starter plan', 0, 'month', ?2, ?3, ?3)",
            params![
                DEFAULT_PLAN_ID,
                serde_json::to_string(&PlanFeatures::default())?,
                now
            ],
        )?;

        Ok(())
    }

    pub fn table_exists(&self, table_name: &str) -> bool {
        let Ok(conn) = self.conn() else { return false };
        let result: SqliteResult<i32> = conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
            [table_name],
            |row| row.get(0),
        );
        result.unwrap_or(0) > 0
    }

    pub fn list_roles(&self) -> Result<Vec<RoleRecord>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT id, name, description FROM roles ORDER BY id")?;
        let roles = stmt
            .query_map([], role_from_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(roles)
    }

    pub fn role_by_name(&self, role: RoleName) -> Result<RoleRecord, StoreError> {
        let conn = self.conn()?;
        role_by_name(&conn, role)
    }

    pub fn load_role(&self, role_id: RoleId) -> Result<Option<RoleRecord>, StoreError> {
        let conn = self.conn()?;
        let role = conn
            .query_row(
                "SELECT id, name, description FROM roles WHERE id = ?1",
                [role_id],
                role_from_row,
            )
            .optional()?;
        Ok(role)
    }

    pub fn create_user_profile(
        &self,
        email: &str,
        full_name: Option<&str>,
        is_super_admin: bool,
    ) -> Result<UserProfile, StoreError> {
        let profile = UserProfile {
            id: UserId::new(),
            full_name: full_name.map(str::to_string),
            is_super_admin,
        };

        self.conn()?.execute(
            "INSERT INTO user_profiles (id, email, full_name, is_super_admin, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                profile.id.to_string(),
                email,
                profile.full_name,
                profile.is_super_admin,
                timestamp(Utc::now()),
            ],
        )?;

        tracing::info!("Created user profile {}", profile.id);
        Ok(profile)
    }

    pub fn load_user_profile(&self, user_id: UserId) -> Result<Option<UserProfile>, StoreError> {
        let conn = self.conn()?;
        let profile = conn
            .query_row(
                "SELECT id, full_name, is_super_admin FROM user_profiles WHERE id = ?1",
                [user_id.to_string()],
                profile_from_row,
            )
            .optional()?;
        Ok(profile)
    }

    pub fn find_user_by_email(&self, email: &str) -> Result<Option<UserProfile>, StoreError> {
        let conn = self.conn()?;
        let profile = conn
            .query_row(
                "SELECT id, full_name, is_super_admin FROM user_profiles WHERE email = ?1",
                [email],
                profile_from_row,
            )
            .optional()?;
        Ok(profile)
    }

    /// Grants or revokes the platform-wide override the authorizer checks first.
    pub fn set_super_admin(&self, user_id: UserId, is_super_admin: bool) -> Result<(), StoreError> {
        let updated = self.conn()?.execute(
            "UPDATE user_profiles SET is_super_admin = ?1 WHERE id = ?2",
            params![is_super_admin, user_id.to_string()],
        )?;
        if updated == 0 {
            return Err(StoreError::NotFound(format!("user {}", user_id)));
        }

        tracing::info!("Set super-admin of {} to {}", user_id, is_super_admin);
        Ok(())
    }

    /// Creates a workspace on the basic plan and makes `owner_id` its owner.
    pub fn create_workspace(&self, name: &str, owner_id: UserId) -> Result<Workspace, StoreError> {
        let mut conn = self.conn()?;
        if !row_exists(&conn, "user_profiles", &owner_id.to_string())? {
            return Err(StoreError::NotFound(format!("user {}", owner_id)));
        }
        let owner_role = role_by_name(&conn, RoleName::Owner)?;

        let workspace = Workspace {
            id: WorkspaceId::new(),
            name: name.to_string(),
            owner_id,
            plan_id: DEFAULT_PLAN_ID.to_string(),
        };
        let now = timestamp(Utc::now());

        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO workspaces (id, name, owner_id, plan_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                workspace.id.to_string(),
                workspace.name,
                owner_id.to_string(),
                workspace.plan_id,
                now,
            ],
        )?;
        tx.execute(
            "INSERT INTO workspace_members (workspace_id, user_id, role_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)",
            params![workspace.id.to_string(), owner_id.to_string(), owner_role.id, now],
        )?;
        tx.commit()?;

        tracing::info!("Created workspace {} owned by {}", workspace.id, owner_id);
        Ok(workspace)
    }

    pub fn user_workspaces(&self, user_id: UserId) -> Result<Vec<WorkspaceWithRole>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT w.id, w.name, w.owner_id, w.plan_id, r.id, r.name, r.description
             FROM workspace_members m
             JOIN workspaces w ON w.id = m.workspace_id
             JOIN roles r ON r.id = m.role_id
             WHERE m.user_id = ?1
             ORDER BY m.created_at, m.rowid",
        )?;
        let workspaces = stmt
            .query_map([user_id.to_string()], |row| {
                Ok(WorkspaceWithRole {
                    workspace: Workspace {
                        id: WorkspaceId::from_uuid(uuid_column(row, 0)?),
                        name: row.get(1)?,
                        owner_id: UserId::from_uuid(uuid_column(row, 2)?),
                        plan_id: row.get(3)?,
                    },
                    role: RoleRecord {
                        id: row.get(4)?,
                        name: row.get(5)?,
                        description: row.get(6)?,
                    },
                })
            })?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(workspaces)
    }

    pub fn workspace_members(&self, workspace_id: WorkspaceId) -> Result<Vec<MemberEntry>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT u.id, u.full_name, u.is_super_admin, r.id, r.name, r.description
             FROM workspace_members m
             JOIN user_profiles u ON u.id = m.user_id
             JOIN roles r ON r.id = m.role_id
             WHERE m.workspace_id = ?1
             ORDER BY m.created_at, m.rowid",
        )?;
        let members = stmt
            .query_map([workspace_id.to_string()], |row| {
                Ok(MemberEntry {
                    user: profile_from_row(row)?,
                    role: RoleRecord {
                        id: row.get(3)?,
                        name: row.get(4)?,
                        description: row.get(5)?,
                    },
                })
            })?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(members)
    }

    pub fn load_membership(
        &self,
        user_id: UserId,
        workspace_id: WorkspaceId,
    ) -> Result<Option<WorkspaceMembership>, StoreError> {
        let conn = self.conn()?;
        load_membership(&conn, user_id, workspace_id)
    }

    /// Adds an existing user, looked up by email, to the workspace.
    pub fn invite_member(
        &self,
        workspace_id: WorkspaceId,
        email: &str,
        role: RoleName,
    ) -> Result<WorkspaceMembership, StoreError> {
        let user = self
            .find_user_by_email(email)?
            .ok_or_else(|| StoreError::NotFound(format!("user with email {}", email)))?;
        self.add_member(workspace_id, user.id, role)
    }

    pub fn add_member(
        &self,
        workspace_id: WorkspaceId,
        user_id: UserId,
        role: RoleName,
    ) -> Result<WorkspaceMembership, StoreError> {
        let conn = self.conn()?;

        if !row_exists(&conn, "workspaces", &workspace_id.to_string())? {
            return Err(StoreError::NotFound(format!("workspace {}", workspace_id)));
        }
        if !row_exists(&conn, "user_profiles", &user_id.to_string())? {
            return Err(StoreError::NotFound(format!("user {}", user_id)));
        }
        if load_membership(&conn, user_id, workspace_id)?.is_some() {
            return Err(StoreError::AlreadyMember {
                user_id,
                workspace_id,
            });
        }

        let role = role_by_name(&conn, role)?;
        let now = timestamp(Utc::now());
        conn.execute(
            "INSERT INTO workspace_members (workspace_id, user_id, role_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)",
            params![workspace_id.to_string(), user_id.to_string(), role.id, now],
        )?;

        tracing::info!("Added {} to {} as {}", user_id, workspace_id, role.name);
        Ok(WorkspaceMembership {
            workspace_id,
            user_id,
            role_id: role.id,
        })
    }

    pub fn update_member_role(
        &self,
        workspace_id: WorkspaceId,
        user_id: UserId,
        role: RoleName,
    ) -> Result<WorkspaceMembership, StoreError> {
        let conn = self.conn()?;
        let role = role_by_name(&conn, role)?;

        let updated = conn.execute(
            "UPDATE workspace_members SET role_id = ?1, updated_at = ?2
             WHERE workspace_id = ?3 AND user_id = ?4",
            params![
                role.id,
                timestamp(Utc::now()),
                workspace_id.to_string(),
                user_id.to_string(),
            ],
        )?;
        if updated == 0 {
            return Err(membership_not_found(user_id, workspace_id));
        }

        tracing::info!("Changed role of {} in {} to {}", user_id, workspace_id, role.name);
        Ok(WorkspaceMembership {
            workspace_id,
            user_id,
            role_id: role.id,
        })
    }

    pub fn remove_member(&self, workspace_id: WorkspaceId, user_id: UserId) -> Result<(), StoreError> {
        let removed = self.conn()?.execute(
            "DELETE FROM workspace_members WHERE workspace_id = ?1 AND user_id = ?2",
            params![workspace_id.to_string(), user_id.to_string()],
        )?;
        if removed == 0 {
            return Err(membership_not_found(user_id, workspace_id));
        }

        tracing::info!("Removed {} from {}", user_id, workspace_id);
        Ok(())
    }

    pub fn store_post(&self, post: &ScheduledPost) -> Result<(), StoreError> {
        let data = serde_json::to_string(post)?;
        self.conn()?.execute(
            "INSERT OR REPLACE INTO scheduled_posts (id, workspace_id, scheduled_at, data)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                &post.id,
                post.workspace_id.to_string(),
                timestamp(post.scheduled_at),
                &data,
            ],
        )?;
        Ok(())
    }

    pub fn load_post(&self, id: &str) -> Result<Option<ScheduledPost>, StoreError> {
        let conn = self.conn()?;
        let data: Option<String> = conn
            .query_row("SELECT data FROM scheduled_posts WHERE id = ?1", [id], |row| row.get(0))
            .optional()?;

        match data {
            Some(data) => Ok(Some(serde_json::from_str(&data)?)),
            None => Ok(None),
        }
    }

    pub fn delete_post(&self, id: &str) -> Result<(), StoreError> {
        self.conn()?
            .execute("DELETE FROM scheduled_posts WHERE id = ?1", [id])?;
        Ok(())
    }

    /// Posts of one workspace scheduled in `[start, end)`, earliest first.
    pub fn posts_between(
        &self,
        workspace_id: WorkspaceId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ScheduledPost>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT data FROM scheduled_posts
             WHERE workspace_id = ?1 AND scheduled_at >= ?2 AND scheduled_at < ?3
             ORDER BY scheduled_at, id",
        )?;
        let rows = stmt
            .query_map(
                params![workspace_id.to_string(), timestamp(start), timestamp(end)],
                |row| row.get::<_, String>(0),
            )?
            .collect::<SqliteResult<Vec<_>>>()?;

        let posts = rows
            .iter()
            .map(|data| serde_json::from_str(data))
            .collect::<Result<Vec<ScheduledPost>, _>>()?;
        tracing::debug!("Loaded {} posts for {}", posts.len(), workspace_id);
        Ok(posts)
    }
}

// The lookups are primary-key reads that run inline on the calling task while
// holding the connection mutex. A store shared by many concurrent requests
// should move them onto `tokio::task::spawn_blocking` behind an `Arc<Store>`.
#[async_trait]
impl AccessDirectory for Store {
    async fn user_profile(&self, user_id: UserId) -> Result<Option<UserProfile>, AccessError> {
        Ok(self.load_user_profile(user_id)?)
    }

    async fn membership(
        &self,
        user_id: UserId,
        workspace_id: WorkspaceId,
    ) -> Result<Option<WorkspaceMembership>, AccessError> {
        Ok(self.load_membership(user_id, workspace_id)?)
    }

    async fn role(&self, role_id: RoleId) -> Result<Option<RoleRecord>, AccessError> {
        Ok(self.load_role(role_id)?)
    }
}

// Fixed-width UTC so stored timestamps compare correctly as text.
pub(super) fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

// `table` is always one of the literal table names above.
pub(super) fn row_exists(conn: &Connection, table: &str, id: &str) -> Result<bool, StoreError> {
    let found: Option<i64> = conn
        .query_row(&format!("SELECT 1 FROM {} WHERE id = ?1", table), [id], |row| row.get(0))
        .optional()?;
    Ok(found.is_some())
}

fn membership_not_found(user_id: UserId, workspace_id: WorkspaceId) -> StoreError {
    StoreError::NotFound(format!("membership of {} in {}", user_id, workspace_id))
}

fn role_by_name(conn: &Connection, role: RoleName) -> Result<RoleRecord, StoreError> {
    conn.query_row(
        "SELECT id, name, description FROM roles WHERE name = ?1",
        [role.as_str()],
        role_from_row,
    )
    .optional()?
    .ok_or_else(|| StoreError::NotFound(format!("role {}", role)))
}

fn load_membership(
    conn: &Connection,
    user_id: UserId,
    workspace_id: WorkspaceId,
) -> Result<Option<WorkspaceMembership>, StoreError> {
    let role_id: Option<RoleId> = conn
        .query_row(
            "SELECT role_id FROM workspace_members WHERE workspace_id = ?1 AND user_id = ?2",
            params![workspace_id.to_string(), user_id.to_string()],
            |row| row.get(0),
        )
        .optional()?;

    Ok(role_id.map(|role_id| WorkspaceMembership {
        workspace_id,
        user_id,
        role_id,
    }))
}

fn uuid_column(row: &Row<'_>, index: usize) -> SqliteResult<Uuid> {
    let raw: String = row.get(index)?;
    Uuid::parse_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(e)))
}

fn role_from_row(row: &Row<'_>) -> SqliteResult<RoleRecord> {
    Ok(RoleRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
    })
}

fn profile_from_row(row: &Row<'_>) -> SqliteResult<UserProfile> {
    Ok(UserProfile {
        id: UserId::from_uuid(uuid_column(row, 0)?),
        full_name: row.get(1)?,
        is_super_admin: row.get(2)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::{AccessDecision, Authorizer};
    use crate::grid::test_support::{date, post_at};
    use chrono::TimeZone;
    use std::sync::Arc;

    fn create_test_store() -> Store {
        Store::open_in_memory().unwrap()
    }

    #[test]
    fn creates_database_schema() {
        let store = create_test_store();

        for table in [
            "roles",
            "user_profiles",
            "workspaces",
            "workspace_members",
            "scheduled_posts",
            "subscription_plans",
            "feature_flags",
            "workspace_feature_flags",
        ] {
            assert!(store.table_exists(table), "{}", table);
        }
    }

    #[test]
    fn seeds_fixed_roles_once() {
        let store = create_test_store();
        store.initialize().unwrap();

        let names: Vec<_> = store.list_roles().unwrap().into_iter().map(|r| r.name).collect();

        assert_eq!(names, vec!["owner", "admin", "editor", "analyst", "support"]);
    }

    #[test]
    fn stores_and_loads_user_profile() {
        let store = create_test_store();

        let profile = store.create_user_profile("ada@example.com", Some("Ada"), false).unwrap();

        assert_eq!(store.load_user_profile(profile.id).unwrap(), Some(profile.clone()));
        assert_eq!(store.find_user_by_email("ada@example.com").unwrap(), Some(profile));
        assert_eq!(store.load_user_profile(UserId::new()).unwrap(), None);
    }

    #[test]
    fn create_workspace_makes_creator_owner() {
        let store = create_test_store();
        let owner = store.create_user_profile("owner@example.com", None, false).unwrap();

        let workspace = store.create_workspace("Bakery", owner.id).unwrap();

        assert_eq!(workspace.plan_id, "basic");
        let workspaces = store.user_workspaces(owner.id).unwrap();
        assert_eq!(workspaces.len(), 1);
        assert_eq!(workspaces[0].workspace, workspace);
        assert_eq!(workspaces[0].role.name, "owner");
    }

    #[test]
    fn invite_member_by_email() {
        let store = create_test_store();
        let owner = store.create_user_profile("owner@example.com", None, false).unwrap();
        let editor = store.create_user_profile("editor@example.com", Some("Eddie"), false).unwrap();
        let workspace = store.create_workspace("Bakery", owner.id).unwrap();

        store.invite_member(workspace.id, "editor@example.com", RoleName::Editor).unwrap();

        let members = store.workspace_members(workspace.id).unwrap();
        assert_eq!(members.len(), 2);
        assert_eq!(members[1].user, editor);
        assert_eq!(members[1].role.name, "editor");
    }

    #[test]
    fn members_are_listed_in_join_order_within_the_same_second() {
        let store = create_test_store();
        let owner = store.create_user_profile("owner@example.com", None, false).unwrap();
        let workspace = store.create_workspace("Bakery", owner.id).unwrap();
        let mut joined = vec![owner.id];
        for index in 0..8 {
            let email = format!("member{}@example.com", index);
            let member = store.create_user_profile(&email, None, false).unwrap();
            store.invite_member(workspace.id, &email, RoleName::Support).unwrap();
            joined.push(member.id);
        }

        let listed: Vec<_> = store
            .workspace_members(workspace.id)
            .unwrap()
            .into_iter()
            .map(|m| m.user.id)
            .collect();

        assert_eq!(listed, joined);
    }

    #[test]
    fn user_workspaces_are_listed_in_join_order() {
        let store = create_test_store();
        let user = store.create_user_profile("user@example.com", None, false).unwrap();
        let owner = store.create_user_profile("owner@example.com", None, false).unwrap();
        let own = store.create_workspace("Own", user.id).unwrap();
        let mut expected = vec![own.id];
        for index in 0..5 {
            let workspace = store.create_workspace(&format!("Shop {}", index), owner.id).unwrap();
            store.add_member(workspace.id, user.id, RoleName::Analyst).unwrap();
            expected.push(workspace.id);
        }

        let listed: Vec<_> = store
            .user_workspaces(user.id)
            .unwrap()
            .into_iter()
            .map(|w| w.workspace.id)
            .collect();

        assert_eq!(listed, expected);
    }

    #[test]
    fn membership_in_unknown_workspace_is_not_found() {
        let store = create_test_store();
        let user = store.create_user_profile("user@example.com", None, false).unwrap();

        let result = store.add_member(WorkspaceId::new(), user.id, RoleName::Owner);

        assert!(matches!(result, Err(StoreError::NotFound(_))));
        assert!(store.user_workspaces(user.id).unwrap().is_empty());
    }

    #[test]
    fn membership_for_unknown_user_is_not_found() {
        let store = create_test_store();
        let owner = store.create_user_profile("owner@example.com", None, false).unwrap();
        let workspace = store.create_workspace("Bakery", owner.id).unwrap();
        let ghost = UserId::new();

        let result = store.add_member(workspace.id, ghost, RoleName::Owner);

        assert!(matches!(result, Err(StoreError::NotFound(_))));
        assert!(store.load_membership(ghost, workspace.id).unwrap().is_none());
    }

    #[test]
    fn foreign_keys_reject_dangling_membership_rows() {
        let store = create_test_store();
        let conn = store.conn().unwrap();

        let result = conn.execute(
            "INSERT INTO workspace_members (workspace_id, user_id, role_id, created_at, updated_at)
             VALUES (?1, ?2, 1, 'now', 'now')",
            params![WorkspaceId::new().to_string(), UserId::new().to_string()],
        );

        assert!(result.is_err());
    }

    #[test]
    fn workspace_for_unknown_owner_is_not_found() {
        let store = create_test_store();

        let result = store.create_workspace("Nobody's", UserId::new());

        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn super_admin_toggle_feeds_the_authorizer() {
        let store = Arc::new(create_test_store());
        let user = store.create_user_profile("staff@example.com", None, false).unwrap();
        let authorizer = Authorizer::new(store.clone());
        let workspace = WorkspaceId::new();

        let before = authorizer.authorize(user.id, workspace, "manage_pages").await.unwrap();
        store.set_super_admin(user.id, true).unwrap();
        let granted = authorizer.authorize(user.id, workspace, "manage_pages").await.unwrap();
        store.set_super_admin(user.id, false).unwrap();
        let revoked = authorizer.authorize(user.id, workspace, "manage_pages").await.unwrap();

        assert_eq!(before, AccessDecision::Deny);
        assert_eq!(granted, AccessDecision::Allow);
        assert_eq!(revoked, AccessDecision::Deny);
    }

    #[test]
    fn super_admin_toggle_for_unknown_user_is_not_found() {
        let store = create_test_store();

        assert!(matches!(
            store.set_super_admin(UserId::new(), true),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn invite_unknown_email_is_not_found() {
        let store = create_test_store();
        let owner = store.create_user_profile("owner@example.com", None, false).unwrap();
        let workspace = store.create_workspace("Bakery", owner.id).unwrap();

        let result = store.invite_member(workspace.id, "nobody@example.com", RoleName::Support);

        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[test]
    fn second_membership_in_same_workspace_is_rejected() {
        let store = create_test_store();
        let owner = store.create_user_profile("owner@example.com", None, false).unwrap();
        let workspace = store.create_workspace("Bakery", owner.id).unwrap();

        let result = store.add_member(workspace.id, owner.id, RoleName::Editor);

        assert!(matches!(result, Err(StoreError::AlreadyMember { .. })));
    }

    #[test]
    fn update_member_role_replaces_role() {
        let store = create_test_store();
        let owner = store.create_user_profile("owner@example.com", None, false).unwrap();
        let member = store.create_user_profile("member@example.com", None, false).unwrap();
        let workspace = store.create_workspace("Bakery", owner.id).unwrap();
        store.add_member(workspace.id, member.id, RoleName::Support).unwrap();

        let updated = store
            .update_member_role(workspace.id, member.id, RoleName::Analyst)
            .unwrap();

        let analyst = store.role_by_name(RoleName::Analyst).unwrap();
        assert_eq!(updated.role_id, analyst.id);
        assert_eq!(
            store.load_membership(member.id, workspace.id).unwrap().map(|m| m.role_id),
            Some(analyst.id)
        );
    }

    #[test]
    fn update_role_of_non_member_is_not_found() {
        let store = create_test_store();

        let result = store.update_member_role(WorkspaceId::new(), UserId::new(), RoleName::Admin);

        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[test]
    fn remove_member_deletes_membership() {
        let store = create_test_store();
        let owner = store.create_user_profile("owner@example.com", None, false).unwrap();
        let member = store.create_user_profile("member@example.com", None, false).unwrap();
        let workspace = store.create_workspace("Bakery", owner.id).unwrap();
        store.add_member(workspace.id, member.id, RoleName::Editor).unwrap();

        store.remove_member(workspace.id, member.id).unwrap();

        assert!(store.load_membership(member.id, workspace.id).unwrap().is_none());
        assert!(matches!(
            store.remove_member(workspace.id, member.id),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn stores_and_loads_post() {
        let store = create_test_store();
        let post = post_at("post1", "Launch", date(2023, 6, 20), 14, 0);

        store.store_post(&post).unwrap();

        assert_eq!(store.load_post("post1").unwrap(), Some(post));
        assert_eq!(store.load_post("missing").unwrap(), None);
    }

    #[test]
    fn deletes_post() {
        let store = create_test_store();
        let post = post_at("post1", "Launch", date(2023, 6, 20), 14, 0);
        store.store_post(&post).unwrap();

        store.delete_post("post1").unwrap();

        assert!(store.load_post("post1").unwrap().is_none());
    }

    #[test]
    fn posts_between_filters_by_workspace_and_range() {
        let store = create_test_store();
        let workspace = WorkspaceId::new();
        let mut inside_late = post_at("b", "Inside late", date(2023, 6, 20), 18, 0);
        let mut inside_early = post_at("a", "Inside early", date(2023, 6, 2), 9, 0);
        let mut outside = post_at("c", "Outside", date(2023, 7, 1), 0, 0);
        let other_workspace = post_at("d", "Elsewhere", date(2023, 6, 10), 12, 0);
        for post in [&mut inside_late, &mut inside_early, &mut outside] {
            post.workspace_id = workspace;
        }
        for post in [&inside_late, &inside_early, &outside, &other_workspace] {
            store.store_post(post).unwrap();
        }

        let posts = store
            .posts_between(
                workspace,
                Utc.with_ymd_and_hms(2023, 6, 1, 0, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2023, 7, 1, 0, 0, 0).unwrap(),
            )
            .unwrap();

        let ids: Vec<_> = posts.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn store_backs_the_authorizer() {
        let store = Arc::new(create_test_store());
        let owner = store.create_user_profile("owner@example.com", None, false).unwrap();
        let support = store.create_user_profile("support@example.com", None, false).unwrap();
        let workspace = store.create_workspace("Bakery", owner.id).unwrap();
        store.add_member(workspace.id, support.id, RoleName::Support).unwrap();
        let authorizer = Authorizer::new(store.clone());

        let reply = authorizer.authorize(support.id, workspace.id, "reply_messages").await.unwrap();
        let manage = authorizer.authorize(support.id, workspace.id, "manage_pages").await.unwrap();
        let owner_anything = authorizer.authorize(owner.id, workspace.id, "export_data").await.unwrap();

        assert_eq!(reply, AccessDecision::Allow);
        assert_eq!(manage, AccessDecision::Deny);
        assert_eq!(owner_anything, AccessDecision::Allow);
    }

    #[test]
    fn opens_database_file_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("pagehub.db");

        let store = Store::open(&path).unwrap();
        let profile = store.create_user_profile("disk@example.com", None, true).unwrap();
        drop(store);

        let reopened = Store::open(&path).unwrap();
        assert_eq!(reopened.load_user_profile(profile.id).unwrap(), Some(profile));
    }
}
