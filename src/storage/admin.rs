use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Result as SqliteResult, Row, params};
use serde::{Deserialize, Serialize};

use super::database::{Store, StoreError, row_exists, timestamp};
use crate::access::WorkspaceId;

pub type FeatureFlagId = i64;

/// Limits bundled with a subscription plan, stored as JSON on the plan row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanFeatures {
    pub max_pages: u32,
    pub ai_captions: bool,
    pub ai_images: bool,
    pub analytics: String,
    pub team_members: u32,
}

impl Default for PlanFeatures {
    fn default() -> Self {
        Self {
            max_pages: 1,
            ai_captions: true,
            ai_images: false,
            analytics: "basic".to_string(),
            team_members: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionPlan {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub interval: String,
    pub features: PlanFeatures,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureFlag {
    pub id: FeatureFlagId,
    pub name: String,
    pub description: Option<String>,
    pub enabled: bool,
}

impl Store {
    /// All plans, cheapest first.
    pub fn list_plans(&self) -> Result<Vec<SubscriptionPlan>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, description, price, interval, features
             FROM subscription_plans ORDER BY price, id",
        )?;
        let rows = stmt
            .query_map([], plan_row)?
            .collect::<SqliteResult<Vec<_>>>()?;

        rows.into_iter().map(PlanRow::into_plan).collect()
    }

    pub fn load_plan(&self, plan_id: &str) -> Result<Option<SubscriptionPlan>, StoreError> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                "SELECT id, name, description, price, interval, features
                 FROM subscription_plans WHERE id = ?1",
                [plan_id],
                plan_row,
            )
            .optional()?;

        row.map(PlanRow::into_plan).transpose()
    }

    pub fn create_plan(&self, plan: &SubscriptionPlan) -> Result<(), StoreError> {
        let now = timestamp(Utc::now());
        self.conn()?.execute(
            "INSERT INTO subscription_plans
                (id, name, description, price, interval, features, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
            params![
                &plan.id,
                &plan.name,
                &plan.description,
                plan.price,
                &plan.interval,
                serde_json::to_string(&plan.features)?,
                now,
            ],
        )?;

        tracing::info!("Created subscription plan {}", plan.id);
        Ok(())
    }

    pub fn update_plan(&self, plan: &SubscriptionPlan) -> Result<(), StoreError> {
        let updated = self.conn()?.execute(
            "UPDATE subscription_plans
             SET name = ?2, description = ?3, price = ?4, interval = ?5, features = ?6,
                 updated_at = ?7
             WHERE id = ?1",
            params![
                &plan.id,
                &plan.name,
                &plan.description,
                plan.price,
                &plan.interval,
                serde_json::to_string(&plan.features)?,
                timestamp(Utc::now()),
            ],
        )?;
        if updated == 0 {
            return Err(StoreError::NotFound(format!("plan {}", plan.id)));
        }

        tracing::info!("Updated subscription plan {}", plan.id);
        Ok(())
    }

    /// Removes a plan no workspace is on.
    pub fn delete_plan(&self, plan_id: &str) -> Result<(), StoreError> {
        let conn = self.conn()?;
        let in_use: i64 = conn.query_row(
            "SELECT COUNT(*) FROM workspaces WHERE plan_id = ?1",
            [plan_id],
            |row| row.get(0),
        )?;
        if in_use > 0 {
            return Err(StoreError::PlanInUse(plan_id.to_string()));
        }

        let removed = conn.execute("DELETE FROM subscription_plans WHERE id = ?1", [plan_id])?;
        if removed == 0 {
            return Err(StoreError::NotFound(format!("plan {}", plan_id)));
        }

        tracing::info!("Deleted subscription plan {}", plan_id);
        Ok(())
    }

    pub fn set_workspace_plan(&self, workspace_id: WorkspaceId, plan_id: &str) -> Result<(), StoreError> {
        let conn = self.conn()?;
        if !row_exists(&conn, "subscription_plans", plan_id)? {
            return Err(StoreError::NotFound(format!("plan {}", plan_id)));
        }

        let updated = conn.execute(
            "UPDATE workspaces SET plan_id = ?1 WHERE id = ?2",
            params![plan_id, workspace_id.to_string()],
        )?;
        if updated == 0 {
            return Err(StoreError::NotFound(format!("workspace {}", workspace_id)));
        }

        tracing::info!("Moved {} to plan {}", workspace_id, plan_id);
        Ok(())
    }

    /// Global flags ordered by name.
    pub fn list_feature_flags(&self) -> Result<Vec<FeatureFlag>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, description, enabled FROM feature_flags ORDER BY name",
        )?;
        let flags = stmt
            .query_map([], flag_from_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(flags)
    }

    pub fn create_feature_flag(
        &self,
        name: &str,
        description: Option<&str>,
        enabled: bool,
    ) -> Result<FeatureFlag, StoreError> {
        let conn = self.conn()?;
        let now = timestamp(Utc::now());
        conn.execute(
            "INSERT INTO feature_flags (name, description, enabled, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)",
            params![name, description, enabled, now],
        )?;

        let flag = FeatureFlag {
            id: conn.last_insert_rowid(),
            name: name.to_string(),
            description: description.map(str::to_string),
            enabled,
        };
        tracing::info!("Created feature flag {} ({})", flag.name, flag.id);
        Ok(flag)
    }

    pub fn set_feature_flag_enabled(&self, flag_id: FeatureFlagId, enabled: bool) -> Result<(), StoreError> {
        let updated = self.conn()?.execute(
            "UPDATE feature_flags SET enabled = ?1, updated_at = ?2 WHERE id = ?3",
            params![enabled, timestamp(Utc::now()), flag_id],
        )?;
        if updated == 0 {
            return Err(StoreError::NotFound(format!("feature flag {}", flag_id)));
        }
        Ok(())
    }

    /// Overrides the global value of a flag for one workspace.
    pub fn set_workspace_feature(
        &self,
        workspace_id: WorkspaceId,
        flag_id: FeatureFlagId,
        enabled: bool,
    ) -> Result<(), StoreError> {
        let conn = self.conn()?;
        if !row_exists(&conn, "workspaces", &workspace_id.to_string())? {
            return Err(StoreError::NotFound(format!("workspace {}", workspace_id)));
        }
        if load_flag(&conn, flag_id)?.is_none() {
            return Err(StoreError::NotFound(format!("feature flag {}", flag_id)));
        }

        let now = timestamp(Utc::now());
        conn.execute(
            "INSERT INTO workspace_feature_flags (workspace_id, feature_id, enabled, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)
             ON CONFLICT (workspace_id, feature_id)
             DO UPDATE SET enabled = excluded.enabled, updated_at = excluded.updated_at",
            params![workspace_id.to_string(), flag_id, enabled, now],
        )?;
        Ok(())
    }

    pub fn clear_workspace_feature(
        &self,
        workspace_id: WorkspaceId,
        flag_id: FeatureFlagId,
    ) -> Result<(), StoreError> {
        self.conn()?.execute(
            "DELETE FROM workspace_feature_flags WHERE workspace_id = ?1 AND feature_id = ?2",
            params![workspace_id.to_string(), flag_id],
        )?;
        Ok(())
    }

    /// The workspace override when one exists, otherwise the global value.
    pub fn feature_enabled(&self, workspace_id: WorkspaceId, name: &str) -> Result<bool, StoreError> {
        let conn = self.conn()?;
        let resolved: Option<(bool, Option<bool>)> = conn
            .query_row(
                "SELECT f.enabled, w.enabled
                 FROM feature_flags f
                 LEFT JOIN workspace_feature_flags w
                   ON w.feature_id = f.id AND w.workspace_id = ?1
                 WHERE f.name = ?2",
                params![workspace_id.to_string(), name],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        match resolved {
            Some((global, workspace)) => Ok(workspace.unwrap_or(global)),
            None => Err(StoreError::NotFound(format!("feature flag {}", name))),
        }
    }
}

struct PlanRow {
    id: String,
    name: String,
    description: Option<String>,
    price: f64,
    interval: String,
    features: String,
}

impl PlanRow {
    fn into_plan(self) -> Result<SubscriptionPlan, StoreError> {
        Ok(SubscriptionPlan {
            id: self.id,
            name: self.name,
            description: self.description,
            price: self.price,
            interval: self.interval,
            features: serde_json::from_str(&self.features)?,
        })
    }
}

fn plan_row(row: &Row<'_>) -> SqliteResult<PlanRow> {
    Ok(PlanRow {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        price: row.get(3)?,
        interval: row.get(4)?,
        features: row.get(5)?,
    })
}

fn flag_from_row(row: &Row<'_>) -> SqliteResult<FeatureFlag> {
    Ok(FeatureFlag {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        enabled: row.get(3)?,
    })
}

fn load_flag(conn: &Connection, flag_id: FeatureFlagId) -> Result<Option<FeatureFlag>, StoreError> {
    let flag = conn
        .query_row(
            "SELECT id, name, description, enabled FROM feature_flags WHERE id = ?1",
            [flag_id],
            flag_from_row,
        )
        .optional()?;
    Ok(flag)
}
