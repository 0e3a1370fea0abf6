use chrono::NaiveDate;
use serde::Serialize;

use super::{GridOptions, HourSlot, hour_slots, posts_on};
use crate::calendar::ScheduledPost;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayGrid {
    pub date: NaiveDate,
    pub is_today: bool,
    pub hours: Vec<HourSlot>,
}

impl DayGrid {
    pub fn slot(&self, hour: u32) -> Option<&HourSlot> {
        self.hours.iter().find(|slot| slot.hour == hour)
    }
}

// Every matching post is listed; the day view has no per-slot cap.
pub fn build(
    date: NaiveDate,
    posts: &[ScheduledPost],
    options: &GridOptions,
    today: NaiveDate,
) -> DayGrid {
    let offset = options.utc_offset();
    let day_posts: Vec<&ScheduledPost> = posts_on(posts, date, &offset).collect();

    DayGrid {
        date,
        is_today: date == today,
        hours: hour_slots(&day_posts, options),
    }
}
