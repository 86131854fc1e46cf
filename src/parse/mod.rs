pub mod datetime;
pub mod ical;
pub mod todo;

pub use datetime::{format_utc, parse_datetime, parse_property};
pub use ical::{ParseError, parse_calendar, serialize_calendar};
pub use todo::{apply_task, task_from_component};
