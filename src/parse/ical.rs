//! Calendar documents through the `icalendar` crate.
//!
//! The crate owns line unfolding, content-line parsing, folding and CRLF
//! output. This module adds what todocal needs on top: uid lookup of VTODOs
//! and the TEXT escaping rules for the values todocal writes itself.

use icalendar::{Calendar, CalendarComponent, Component, Todo};

/// A file that is not a complete calendar document
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ParseError(String);

/// Parse a whole iCalendar document.
///
/// A document that never closes its `VCALENDAR` is rejected even when the
/// parser would accept the prefix.
pub fn parse_calendar(text: &str) -> Result<Calendar, ParseError> {
    let closed = text
        .lines()
        .any(|line| line.trim_end().eq_ignore_ascii_case("END:VCALENDAR"));
    if !closed {
        return Err(ParseError("VCALENDAR is never closed".to_string()));
    }
    text.parse::<Calendar>().map_err(ParseError)
}

/// CRLF-terminated, folded output
pub fn serialize_calendar(calendar: &Calendar) -> String {
    calendar.to_string()
}

/// Every VTODO of the document, in file order
pub fn todos(calendar: &Calendar) -> impl Iterator<Item = &Todo> {
    calendar.components.iter().filter_map(|c| match c {
        CalendarComponent::Todo(todo) => Some(todo),
        _ => None,
    })
}

/// The `UID` of a todo with surrounding whitespace dropped. A blank `UID`
/// counts as missing.
pub fn todo_uid(todo: &Todo) -> Option<&str> {
    todo.property_value("UID")
        .map(str::trim)
        .filter(|uid| !uid.is_empty())
}

/// Index of the todo with the given uid. When no todo carries that uid,
/// falls back to the first todo without one (its identity was derived from
/// the file name on load).
fn todo_position(calendar: &Calendar, uid: &str) -> Option<usize> {
    find_todo(calendar, |u| u == Some(uid)).or_else(|| find_todo(calendar, |u| u.is_none()))
}

fn find_todo(calendar: &Calendar, pred: impl Fn(Option<&str>) -> bool) -> Option<usize> {
    calendar.components.iter().position(|c| match c {
        CalendarComponent::Todo(todo) => pred(todo_uid(todo)),
        _ => false,
    })
}

pub fn todo_mut<'a>(calendar: &'a mut Calendar, uid: &str) -> Option<&'a mut Todo> {
    let index = todo_position(calendar, uid)?;
    match calendar.components.get_mut(index) {
        Some(CalendarComponent::Todo(todo)) => Some(todo),
        _ => None,
    }
}

/// Remove the todo with the given uid. Returns whether one was removed.
pub fn remove_todo(calendar: &mut Calendar, uid: &str) -> bool {
    match todo_position(calendar, uid) {
        Some(index) => {
            calendar.components.remove(index);
            true
        }
        None => false,
    }
}

/// Number of todos and events in the document. Timezones and other
/// supporting components do not count.
pub fn entry_count(calendar: &Calendar) -> usize {
    calendar
        .components
        .iter()
        .filter(|c| matches!(c, CalendarComponent::Todo(_) | CalendarComponent::Event(_)))
        .count()
}

/// Decode an escaped TEXT value (`\\`, `\;`, `\,`, `\n`)
pub fn unescape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') | Some('N') => out.push('\n'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// Encode a TEXT value (inverse of `unescape_text`)
pub fn escape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            ';' => out.push_str("\\;"),
            ',' => out.push_str("\\,"),
            '\n' => out.push_str("\\n"),
            '\r' => {}
            other => out.push(other),
        }
    }
    out
}

/// Split a TEXT list on unescaped commas and decode each item
pub fn split_text_list(value: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut current = String::new();
    let mut escaped = false;
    for c in value.chars() {
        if escaped {
            current.push('\\');
            current.push(c);
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == ',' {
            items.push(unescape_text(&current));
            current.clear();
        } else {
            current.push(c);
        }
    }
    if escaped {
        current.push('\\');
    }
    items.push(unescape_text(&current));
    items
}

/// Encode a TEXT list, comma-joined
pub fn join_text_list(items: &[String]) -> String {
    items
        .iter()
        .map(|item| escape_text(item))
        .collect::<Vec<_>>()
        .join(",")
}
