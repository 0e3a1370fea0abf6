pub mod post;
pub mod view;

pub use post::{Recurrence, RecurrencePattern, ScheduledPost};
pub use view::{CalendarView, ViewMode, parse_reference_date};
