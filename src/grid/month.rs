use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;

use super::{GridError, GridOptions, MONTH_CELL_COUNT, PostSummary, posts_on};
use crate::calendar::ScheduledPost;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthGrid {
    pub year: i32,
    pub month: u32,
    pub cells: Vec<MonthCell>,
}

impl MonthGrid {
    pub fn rows(&self) -> impl Iterator<Item = &[MonthCell]> {
        self.cells.chunks(7)
    }

    pub fn cell_for(&self, date: NaiveDate) -> Option<&MonthCell> {
        self.cells.iter().find(|cell| cell.date == date)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthCell {
    pub date: NaiveDate,
    pub in_current_month: bool,
    pub is_today: bool,
    pub posts: Vec<PostSummary>,
    pub overflow: usize,
}

impl MonthCell {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            in_current_month: true,
            is_today: false,
            posts: Vec::new(),
            overflow: 0,
        }
    }

    pub fn with_current_month(mut self, in_current_month: bool) -> Self {
        self.in_current_month = in_current_month;
        self
    }

    pub fn with_today(mut self, today: bool) -> Self {
        self.is_today = today;
        self
    }

    /// Keeps the first `limit` matches and counts the rest as overflow.
    pub fn with_posts(mut self, matches: Vec<PostSummary>, limit: usize) -> Self {
        self.overflow = matches.len().saturating_sub(limit);
        self.posts = matches;
        self.posts.truncate(limit);
        self
    }

    pub fn total_posts(&self) -> usize {
        self.posts.len() + self.overflow
    }
}

pub fn build(
    reference: NaiveDate,
    posts: &[ScheduledPost],
    options: &GridOptions,
    today: NaiveDate,
) -> Result<MonthGrid, GridError> {
    let year = reference.year();
    let month = reference.month();
    let offset = options.utc_offset();

    let first_day = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or(GridError::DateOutOfRange(reference))?;
    let leading_days = i64::from(first_day.weekday().num_days_from_sunday());

    let mut cells = Vec::with_capacity(MONTH_CELL_COUNT);
    for index in 0..MONTH_CELL_COUNT as i64 {
        let date = first_day
            .checked_add_signed(Duration::days(index - leading_days))
            .ok_or(GridError::DateOutOfRange(first_day))?;

        let matches: Vec<PostSummary> = posts_on(posts, date, &offset)
            .map(|post| PostSummary::from_post(post, &offset))
            .collect();

        cells.push(
            MonthCell::new(date)
                .with_current_month(date.month() == month && date.year() == year)
                .with_today(date == today)
                .with_posts(matches, options.max_visible_posts()),
        );
    }

    Ok(MonthGrid { year, month, cells })
}
