use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::access::WorkspaceId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledPost {
    pub id: String,
    pub workspace_id: WorkspaceId,
    pub title: String,
    pub content: String,
    pub image_url: Option<String>,
    pub scheduled_at: DateTime<Utc>,
    pub recurrence: Option<Recurrence>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecurrencePattern {
    Daily,
    Weekly,
    Monthly,
}

/// Stored alongside a post. Only the post's own `scheduled_at` is ever placed
/// on a calendar grid; occurrences are not materialised.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recurrence {
    pub pattern: RecurrencePattern,
    pub ends_on: Option<NaiveDate>,
}

impl ScheduledPost {
    pub fn is_recurring(&self) -> bool {
        self.recurrence.is_some()
    }

    pub fn local_time(&self, offset: &FixedOffset) -> NaiveDateTime {
        self.scheduled_at.with_timezone(offset).naive_local()
    }
}
