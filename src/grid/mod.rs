//! Calendar grid computation for scheduled posts.
//!
//! Every builder is a pure function of the view, the post list, the options and
//! the caller's notion of "today". Posts are only read; within a cell they keep
//! the order of the input slice.

pub mod day;
pub mod month;
pub mod week;

use chrono::{FixedOffset, NaiveDate, NaiveDateTime, Offset, Timelike, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::calendar::{CalendarView, RecurrencePattern, ScheduledPost, ViewMode};

pub use day::DayGrid;
pub use month::{MonthCell, MonthGrid};
pub use week::{DayColumn, WeekGrid};

pub const MONTH_CELL_COUNT: usize = 35;
pub const DEFAULT_MAX_VISIBLE_POSTS: usize = 2;
pub const DEFAULT_FIRST_HOUR: u32 = 8;
pub const DEFAULT_LAST_HOUR: u32 = 19;

#[derive(Debug, Error, PartialEq)]
pub enum GridError {
    #[error("Invalid reference date: {0}")]
    InvalidReferenceDate(String),
    #[error("Unknown view mode: {0}")]
    UnknownViewMode(String),
    #[error("Date arithmetic out of range near {0}")]
    DateOutOfRange(NaiveDate),
    #[error("Invalid grid options: {0}")]
    InvalidOptions(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct GridOptions {
    max_visible_posts: usize,
    first_hour: u32,
    last_hour: u32,
    utc_offset: FixedOffset,
}

impl GridOptions {
    pub fn new(
        max_visible_posts: usize,
        first_hour: u32,
        last_hour: u32,
        utc_offset: FixedOffset,
    ) -> Result<Self, GridError> {
        if max_visible_posts == 0 {
            return Err(GridError::InvalidOptions(
                "max_visible_posts must be at least 1".to_string(),
            ));
        }
        if last_hour > 23 {
            return Err(GridError::InvalidOptions(format!(
                "last_hour {} is past 23",
                last_hour
            )));
        }
        if first_hour > last_hour {
            return Err(GridError::InvalidOptions(format!(
                "first_hour {} is after last_hour {}",
                first_hour, last_hour
            )));
        }

        Ok(Self {
            max_visible_posts,
            first_hour,
            last_hour,
            utc_offset,
        })
    }

    pub fn max_visible_posts(&self) -> usize {
        self.max_visible_posts
    }

    pub fn hours(&self) -> std::ops::RangeInclusive<u32> {
        self.first_hour..=self.last_hour
    }

    pub fn utc_offset(&self) -> FixedOffset {
        self.utc_offset
    }
}

impl Default for GridOptions {
    fn default() -> Self {
        Self {
            max_visible_posts: DEFAULT_MAX_VISIBLE_POSTS,
            first_hour: DEFAULT_FIRST_HOUR,
            last_hour: DEFAULT_LAST_HOUR,
            utc_offset: Utc.fix(),
        }
    }
}

/// The slice of a post a grid cell needs to show.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostSummary {
    pub post_id: String,
    pub title: String,
    pub local_time: NaiveDateTime,
    pub recurrence: Option<RecurrencePattern>,
    pub has_media: bool,
}

impl PostSummary {
    fn from_post(post: &ScheduledPost, offset: &FixedOffset) -> Self {
        Self {
            post_id: post.id.clone(),
            title: post.title.clone(),
            local_time: post.local_time(offset),
            recurrence: post.recurrence.as_ref().map(|r| r.pattern),
            has_media: post.image_url.is_some(),
        }
    }
}

/// One hour row of a week column or of the day view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourSlot {
    pub hour: u32,
    pub posts: Vec<PostSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "view", rename_all = "lowercase")]
pub enum CalendarGrid {
    Month(MonthGrid),
    Week(WeekGrid),
    Day(DayGrid),
}

pub fn build_grid(
    view: &CalendarView,
    posts: &[ScheduledPost],
    options: &GridOptions,
    today: NaiveDate,
) -> Result<CalendarGrid, GridError> {
    tracing::debug!(
        "Building {} grid for {} with {} posts",
        view.mode,
        view.reference,
        posts.len()
    );

    let grid = match view.mode {
        ViewMode::Month => {
            CalendarGrid::Month(month::build(view.reference, posts, options, today)?)
        }
        ViewMode::Week => {
            CalendarGrid::Week(week::build(view.reference, posts, options, today)?)
        }
        ViewMode::Day => CalendarGrid::Day(day::build(view.reference, posts, options, today)),
    };

    Ok(grid)
}

fn posts_on<'a>(
    posts: &'a [ScheduledPost],
    date: NaiveDate,
    offset: &'a FixedOffset,
) -> impl Iterator<Item = &'a ScheduledPost> + 'a {
    posts
        .iter()
        .filter(move |post| post.local_time(offset).date() == date)
}

fn hour_slots(posts: &[&ScheduledPost], options: &GridOptions) -> Vec<HourSlot> {
    let offset = options.utc_offset();

    options
        .hours()
        .map(|hour| HourSlot {
            hour,
            posts: posts
                .iter()
                .filter(|post| post.local_time(&offset).hour() == hour)
                .map(|post| PostSummary::from_post(post, &offset))
                .collect(),
        })
        .collect()
}
