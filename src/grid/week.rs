use chrono::{Datelike, Days, NaiveDate};
use serde::Serialize;

use super::{GridError, GridOptions, HourSlot, hour_slots, posts_on};
use crate::calendar::ScheduledPost;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeekGrid {
    pub week_start: NaiveDate,
    pub days: Vec<DayColumn>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayColumn {
    pub date: NaiveDate,
    pub is_today: bool,
    pub slots: Vec<HourSlot>,
}

impl WeekGrid {
    /// The Sunday on or before `date`.
    pub fn week_of_date(date: NaiveDate) -> Result<NaiveDate, GridError> {
        let days_from_sunday = u64::from(date.weekday().num_days_from_sunday());
        date.checked_sub_days(Days::new(days_from_sunday))
            .ok_or(GridError::DateOutOfRange(date))
    }

    pub fn post_count(&self) -> usize {
        self.days
            .iter()
            .flat_map(|day| &day.slots)
            .map(|slot| slot.posts.len())
            .sum()
    }
}

pub fn build(
    reference: NaiveDate,
    posts: &[ScheduledPost],
    options: &GridOptions,
    today: NaiveDate,
) -> Result<WeekGrid, GridError> {
    let week_start = WeekGrid::week_of_date(reference)?;
    let offset = options.utc_offset();

    let mut days = Vec::with_capacity(7);
    for day_offset in 0..7u64 {
        let date = week_start
            .checked_add_days(Days::new(day_offset))
            .ok_or(GridError::DateOutOfRange(week_start))?;
        let day_posts: Vec<&ScheduledPost> = posts_on(posts, date, &offset).collect();

        days.push(DayColumn {
            date,
            is_today: date == today,
            slots: hour_slots(&day_posts, options),
        });
    }

    Ok(WeekGrid { week_start, days })
}
