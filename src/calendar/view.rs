use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::grid::GridError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    Month,
    Week,
    Day,
}

impl ViewMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViewMode::Month => "month",
            ViewMode::Week => "week",
            ViewMode::Day => "day",
        }
    }
}

impl fmt::Display for ViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ViewMode {
    type Err = GridError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "month" => Ok(ViewMode::Month),
            "week" => Ok(ViewMode::Week),
            "day" => Ok(ViewMode::Day),
            other => Err(GridError::UnknownViewMode(other.to_string())),
        }
    }
}

/// Accepts `YYYY-MM-DD` or `YYYY/MM/DD`.
pub fn parse_reference_date(value: &str) -> Result<NaiveDate, GridError> {
    let trimmed = value.trim();
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(trimmed, "%Y/%m/%d"))
        .map_err(|_| GridError::InvalidReferenceDate(value.to_string()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarView {
    pub mode: ViewMode,
    pub reference: NaiveDate,
}

impl CalendarView {
    pub fn new(mode: ViewMode, reference: NaiveDate) -> Self {
        Self { mode, reference }
    }

    pub fn next(&self) -> Result<Self, GridError> {
        let reference = match self.mode {
            ViewMode::Month => shift_months(self.reference, 1),
            ViewMode::Week => self.reference.checked_add_days(Days::new(7)),
            ViewMode::Day => self.reference.checked_add_days(Days::new(1)),
        }
        .ok_or(GridError::DateOutOfRange(self.reference))?;

        Ok(Self { mode: self.mode, reference })
    }

    pub fn previous(&self) -> Result<Self, GridError> {
        let reference = match self.mode {
            ViewMode::Month => shift_months(self.reference, -1),
            ViewMode::Week => self.reference.checked_sub_days(Days::new(7)),
            ViewMode::Day => self.reference.checked_sub_days(Days::new(1)),
        }
        .ok_or(GridError::DateOutOfRange(self.reference))?;

        Ok(Self { mode: self.mode, reference })
    }

    pub fn today(&self, today: NaiveDate) -> Self {
        Self { mode: self.mode, reference: today }
    }
}

// Keeps the day-of-month and lets it spill into the following month when the
// target month is shorter: Jan 31 + 1 month lands on Mar 3 (Mar 2 in leap years).
fn shift_months(date: NaiveDate, delta: i32) -> Option<NaiveDate> {
    let months = date.year() * 12 + date.month0() as i32 + delta;
    let year = months.div_euclid(12);
    let month = months.rem_euclid(12) as u32 + 1;

    NaiveDate::from_ymd_opt(year, month, 1)?
        .checked_add_days(Days::new(u64::from(date.day() - 1)))
}
