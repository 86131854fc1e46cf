use chrono::{DateTime, Local};
use icalendar::{Component, Todo};
use tracing::warn;

use crate::model::task::{MAX_PRIORITY, Task, TaskStatus};

use super::datetime::{format_utc, parse_property};
use super::ical::{escape_text, join_text_list, split_text_list, todo_uid, unescape_text};

/// Properties rebuilt from the task on every write
const MANAGED: [&str; 10] = [
    "UID",
    "SUMMARY",
    "DESCRIPTION",
    "STATUS",
    "COMPLETED",
    "LAST-MODIFIED",
    "DTSTART",
    "DUE",
    "PRIORITY",
    "CATEGORIES",
];

/// Build a task from a VTODO component. The task starts clean.
pub fn task_from_component(todo: &Todo) -> Task {
    let text = |name: &str| todo.property_value(name).map(unescape_text).unwrap_or_default();
    let timestamp = |name: &str| todo.properties().get(name).and_then(parse_property);

    let categories = todo
        .property_value("CATEGORIES")
        .map(split_text_list)
        .unwrap_or_default()
        .into_iter()
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect();

    Task {
        uid: todo_uid(todo).unwrap_or_default().to_string(),
        summary: text("SUMMARY"),
        description: text("DESCRIPTION"),
        categories,
        status: todo
            .property_value("STATUS")
            .map(TaskStatus::from_ical)
            .unwrap_or_default(),
        priority: parse_priority(todo),
        created: timestamp("CREATED"),
        last_modified: timestamp("LAST-MODIFIED"),
        due: timestamp("DUE"),
        start: timestamp("DTSTART"),
        source_path: None,
        dirty: false,
        pending_removal: false,
    }
}

fn parse_priority(todo: &Todo) -> u8 {
    let Some(value) = todo.property_value("PRIORITY") else {
        return 0;
    };
    match value.trim().parse::<u8>() {
        Ok(p) if p <= MAX_PRIORITY => p,
        _ => {
            warn!(uid = todo_uid(todo).unwrap_or(""), value, "priority out of range, ignoring");
            0
        }
    }
}

/// Build the VTODO for `task`, starting from the component it was loaded
/// from (if any).
///
/// Managed fields are written when non-empty and left out when empty. An
/// existing `CREATED` is never overwritten, an existing `COMPLETED` stamp
/// is kept while the task stays completed, and properties this crate does
/// not manage are carried over unchanged.
pub fn apply_task(task: &Task, existing: Option<&Todo>) -> Todo {
    let mut todo = Todo::new();
    if let Some(old) = existing {
        for (key, prop) in old.properties() {
            if !MANAGED.iter().any(|m| m.eq_ignore_ascii_case(key)) {
                todo.append_property(prop.clone());
            }
        }
    }

    todo.add_property("UID", task.uid.as_str());
    add_text(&mut todo, "SUMMARY", escape_text(&task.summary));
    add_text(&mut todo, "DESCRIPTION", escape_text(&task.description));
    todo.add_property("STATUS", task.status.as_str());
    if task.status == TaskStatus::Completed {
        match existing.and_then(|old| old.properties().get("COMPLETED")) {
            Some(stamp) => {
                todo.append_property(stamp.clone());
            }
            None => {
                let done = task.last_modified.unwrap_or_else(Local::now);
                todo.add_property("COMPLETED", format_utc(&done));
            }
        }
    }
    add_time(&mut todo, "LAST-MODIFIED", task.last_modified.as_ref());
    add_time(&mut todo, "DTSTART", task.start.as_ref());
    add_time(&mut todo, "DUE", task.due.as_ref());
    if task.priority > 0 {
        todo.add_property("PRIORITY", task.priority.to_string());
    }
    add_text(&mut todo, "CATEGORIES", join_text_list(&task.categories));

    if !todo.properties().contains_key("CREATED")
        && let Some(created) = &task.created
    {
        todo.add_property("CREATED", format_utc(created));
    }
    if !todo.properties().contains_key("DTSTAMP") {
        let stamp = task.last_modified.unwrap_or_else(Local::now);
        todo.add_property("DTSTAMP", format_utc(&stamp));
    }
    todo
}

fn add_text(todo: &mut Todo, name: &str, value: String) {
    if !value.is_empty() {
        todo.add_property(name, value);
    }
}

fn add_time(todo: &mut Todo, name: &str, value: Option<&DateTime<Local>>) {
    if let Some(dt) = value {
        todo.add_property(name, format_utc(dt));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::ical::{parse_calendar, todos};
    use chrono::{TimeZone, Utc};

    const SAMPLE: &str = "BEGIN:VCALENDAR\r\n\
BEGIN:VTODO\r\n\
UID:sLNz \r\n\
SUMMARY:Move git repos\r\n\
DESCRIPTION:Move git repos?\\nAll of them\\, really\r\n\
STATUS:NEEDS-ACTION\r\n\
PRIORITY:3\r\n\
CATEGORIES:tech,git, projects\r\n\
CREATED:20240101T100000Z\r\n\
DUE:20250101T080000Z\r\n\
X-APPLE-SORT-ORDER:7\r\n\
END:VTODO\r\n\
END:VCALENDAR\r\n";

    fn sample_todo() -> Todo {
        todos(&parse_calendar(SAMPLE).unwrap()).next().unwrap().clone()
    }

    #[test]
    fn test_task_from_component() {
        let task = task_from_component(&sample_todo());
        assert_eq!(task.uid, "sLNz");
        assert_eq!(task.summary, "Move git repos");
        assert_eq!(task.description, "Move git repos?\nAll of them, really");
        assert_eq!(task.categories, vec!["tech", "git", "projects"]);
        assert_eq!(task.priority, 3);
        assert_eq!(task.status, TaskStatus::NeedsAction);
        assert_eq!(
            task.due.unwrap().with_timezone(&Utc),
            Utc.with_ymd_and_hms(2025, 1, 1, 8, 0, 0).unwrap()
        );
        assert!(task.start.is_none());
        assert!(!task.dirty);
    }

    #[test]
    fn test_out_of_range_priority_is_unset() {
        let mut todo = sample_todo();
        todo.add_property("PRIORITY", "12");
        assert_eq!(task_from_component(&todo).priority, 0);
        todo.add_property("PRIORITY", "high");
        assert_eq!(task_from_component(&todo).priority, 0);
    }

    #[test]
    fn test_apply_task_sets_and_removes() {
        let old = sample_todo();
        let mut task = task_from_component(&old);
        task.summary = "Moved, finally".to_string();
        task.description.clear();
        task.priority = 0;
        task.categories = vec!["git".to_string()];
        task.due = None;
        task.status = TaskStatus::Completed;

        let todo = apply_task(&task, Some(&old));

        assert_eq!(todo.property_value("UID"), Some("sLNz"));
        assert_eq!(todo.property_value("SUMMARY"), Some(r"Moved\, finally"));
        assert_eq!(todo.property_value("DESCRIPTION"), None);
        assert_eq!(todo.property_value("PRIORITY"), None);
        assert_eq!(todo.property_value("DUE"), None);
        assert_eq!(todo.property_value("CATEGORIES"), Some("git"));
        assert_eq!(todo.property_value("STATUS"), Some("COMPLETED"));
        assert!(todo.property_value("COMPLETED").is_some());

        task.status = TaskStatus::NeedsAction;
        let reopened = apply_task(&task, Some(&todo));
        assert_eq!(reopened.property_value("COMPLETED"), None);
        assert_eq!(reopened.property_value("X-APPLE-SORT-ORDER"), Some("7"));
    }

    #[test]
    fn test_completed_stamp_is_kept_while_completed() {
        let old = sample_todo();
        let mut task = task_from_component(&old);
        task.status = TaskStatus::Completed;
        task.last_modified = Some(Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap().with_timezone(&Local));
        let done = apply_task(&task, Some(&old));
        assert_eq!(done.property_value("COMPLETED"), Some("20240506T070809Z"));

        task.last_modified = Some(Local::now());
        let again = apply_task(&task, Some(&done));
        assert_eq!(again.property_value("COMPLETED"), Some("20240506T070809Z"));
    }

    #[test]
    fn test_apply_task_preserves_existing_created() {
        let old = sample_todo();
        let mut task = task_from_component(&old);
        task.created = Some(Local::now());
        let todo = apply_task(&task, Some(&old));
        assert_eq!(todo.property_value("CREATED"), Some("20240101T100000Z"));

        let created = Utc.with_ymd_and_hms(2024, 3, 4, 5, 6, 7).unwrap().with_timezone(&Local);
        task.created = Some(created);
        let fresh = apply_task(&task, None);
        assert_eq!(fresh.property_value("CREATED"), Some("20240304T050607Z"));
        assert_eq!(todo_uid(&fresh), Some("sLNz"));
        assert!(fresh.property_value("DTSTAMP").is_some());
    }
}
