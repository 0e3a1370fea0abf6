pub mod access;
pub mod calendar;
pub mod generation;
pub mod grid;
pub mod storage;

pub use access::{AccessDecision, Authorizer, Permission, RoleName};
pub use calendar::{CalendarView, ScheduledPost, ViewMode};
pub use grid::{CalendarGrid, GridOptions, build_grid};
