use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike};

use crate::model::task::{MAX_PRIORITY, Task};

/// Date format used in prompts and the todo list
pub const DATE_FORMAT: &str = "%Y-%m-%d";
/// Time-of-day format used in prompts
pub const TIME_FORMAT: &str = "%H:%M";

/// Rejected user input. The message is shown back to the user as-is.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskError {
    #[error("Title cannot be empty")]
    EmptyTitle,
    #[error("Priority must be a number between 0 and 9 (got \"{0}\")")]
    InvalidPriority(String),
    #[error("Bad date \"{0}\". Should be yyyy-mm-dd.")]
    InvalidDate(String),
    #[error("Bad time \"{0}\". Should be HH:MM.")]
    InvalidTime(String),
    #[error("{0} does not exist in the local time zone")]
    NonexistentLocalTime(String),
    #[error("Start time cannot be cleared on its own. Clear the start date instead.")]
    StartTimeRequired,
}

// ---------------------------------------------------------------------------
// Field edits
// ---------------------------------------------------------------------------

/// Set the title. Line breaks become spaces; an empty title is rejected.
pub fn set_title(task: &mut Task, input: &str) -> Result<(), TaskError> {
    let title = single_line(input);
    if title.is_empty() {
        return Err(TaskError::EmptyTitle);
    }
    task.summary = title;
    task.mark_dirty();
    Ok(())
}

/// Set the description. A literal `\n` in the input is a line break.
pub fn set_description(task: &mut Task, input: &str) {
    task.description = input.trim().replace("\\n", "\n");
    task.mark_dirty();
}

/// Title as shown on a single menu line
pub fn title_for_prompt(task: &Task) -> String {
    single_line(&task.summary)
}

/// Categories as shown on a single menu line
pub fn categories_for_prompt(task: &Task) -> String {
    single_line(&task.categories.join(","))
}

/// Description as shown on a single menu line
pub fn description_for_prompt(task: &Task) -> String {
    task.description.replace('\n', "\\n")
}

/// Set the priority from `0`..`9`. Empty input clears it.
pub fn set_priority(task: &mut Task, input: &str) -> Result<(), TaskError> {
    let input = input.trim();
    let priority = if input.is_empty() {
        0
    } else {
        match input.parse::<u8>() {
            Ok(p) if p <= MAX_PRIORITY => p,
            _ => return Err(TaskError::InvalidPriority(input.to_string())),
        }
    };
    task.priority = priority;
    task.mark_dirty();
    Ok(())
}

/// Split comma-separated categories, trimming each and dropping empty and
/// repeated entries. `""` yields no categories at all.
pub fn parse_categories(input: &str) -> Vec<String> {
    let mut categories: Vec<String> = Vec::new();
    for item in input.split(',') {
        let item = single_line(item);
        if !item.is_empty() && !categories.contains(&item) {
            categories.push(item);
        }
    }
    categories
}

pub fn set_categories(task: &mut Task, input: &str) {
    task.categories = parse_categories(input);
    task.mark_dirty();
}

/// Set the due date (`yyyy-mm-dd`), keeping an existing time of day.
/// Empty input removes the due date.
pub fn set_due_date(task: &mut Task, input: &str) -> Result<(), TaskError> {
    let input = input.trim();
    if input.is_empty() {
        task.due = None;
        task.mark_dirty();
        return Ok(());
    }
    let date = parse_date(input)?;
    let time = task.due.map_or(NaiveTime::MIN, |d| d.time());
    task.due = Some(local_datetime(date.and_time(time))?);
    task.mark_dirty();
    Ok(())
}

/// Set the start date (`yyyy-mm-dd`), keeping an existing start time.
/// Empty input removes the whole start timestamp.
pub fn set_start_date(task: &mut Task, input: &str) -> Result<(), TaskError> {
    let input = input.trim();
    if input.is_empty() {
        task.start = None;
        task.mark_dirty();
        return Ok(());
    }
    let date = parse_date(input)?;
    let time = task.start.map_or(NaiveTime::MIN, |s| s.time());
    task.start = Some(local_datetime(date.and_time(time))?);
    task.mark_dirty();
    Ok(())
}

/// Set the start time (`HH:MM`). Without a start date, today is used.
///
/// The time cannot be cleared separately from the date; empty input with
/// an existing start is rejected and leaves the timestamp alone.
pub fn set_start_time(task: &mut Task, input: &str, now: DateTime<Local>) -> Result<(), TaskError> {
    let input = input.trim();
    if input.is_empty() {
        return match task.start {
            Some(_) => Err(TaskError::StartTimeRequired),
            None => Ok(()),
        };
    }
    let time = NaiveTime::parse_from_str(input, TIME_FORMAT)
        .map_err(|_| TaskError::InvalidTime(input.to_string()))?;
    let date = task.start.map_or(now.date_naive(), |s| s.date_naive());
    task.start = Some(local_datetime(date.and_time(time))?);
    task.mark_dirty();
    Ok(())
}

/// Complete an open task or reopen a completed one
pub fn toggle_complete(task: &mut Task, now: DateTime<Local>) {
    task.status = task.status.toggled();
    task.touch(now);
}

// ---------------------------------------------------------------------------
// Display helpers
// ---------------------------------------------------------------------------

/// `yyyy-mm-dd` in the local zone
pub fn display_date(dt: &DateTime<Local>) -> String {
    dt.format(DATE_FORMAT).to_string()
}

/// `HH:MM` in the local zone, empty for a date-only (midnight) value
pub fn display_time(dt: &DateTime<Local>) -> String {
    if has_time_of_day(dt) {
        dt.format(TIME_FORMAT).to_string()
    } else {
        String::new()
    }
}

/// Whether the timestamp carries a time other than local midnight
pub fn has_time_of_day(dt: &DateTime<Local>) -> bool {
    dt.num_seconds_from_midnight() != 0
}

fn single_line(input: &str) -> String {
    input
        .split(['\n', '\r'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn parse_date(input: &str) -> Result<NaiveDate, TaskError> {
    NaiveDate::parse_from_str(input, DATE_FORMAT).map_err(|_| TaskError::InvalidDate(input.to_string()))
}

fn local_datetime(naive: NaiveDateTime) -> Result<DateTime<Local>, TaskError> {
    Local
        .from_local_datetime(&naive)
        .earliest()
        .ok_or_else(|| TaskError::NonexistentLocalTime(naive.format("%Y-%m-%d %H:%M").to_string()))
}
