pub mod admin;
pub mod config;
pub mod database;

pub use admin::{FeatureFlag, FeatureFlagId, PlanFeatures, SubscriptionPlan};
pub use config::{Config, ConfigError};
pub use database::{MemberEntry, Store, StoreError, Workspace, WorkspaceWithRole};
