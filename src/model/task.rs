use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Local};

/// Todo completion status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskStatus {
    #[default]
    NeedsAction,
    Completed,
}

impl TaskStatus {
    /// The iCalendar `STATUS` value
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::NeedsAction => "NEEDS-ACTION",
            TaskStatus::Completed => "COMPLETED",
        }
    }

    /// Parse a `STATUS` value. Anything other than COMPLETED is still open.
    pub fn from_ical(value: &str) -> TaskStatus {
        if value.trim().eq_ignore_ascii_case("COMPLETED") {
            TaskStatus::Completed
        } else {
            TaskStatus::NeedsAction
        }
    }

    pub fn toggled(self) -> TaskStatus {
        match self {
            TaskStatus::NeedsAction => TaskStatus::Completed,
            TaskStatus::Completed => TaskStatus::NeedsAction,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Highest accepted priority value. 0 means "no priority".
pub const MAX_PRIORITY: u8 = 9;

/// One todo entry, derived from a VTODO component
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Task {
    /// Stable identity and storage key
    pub uid: String,
    pub summary: String,
    pub description: String,
    /// Categories in source order
    pub categories: Vec<String>,
    pub status: TaskStatus,
    /// 0..=9, 0 = unset
    pub priority: u8,
    pub created: Option<DateTime<Local>>,
    pub last_modified: Option<DateTime<Local>>,
    pub due: Option<DateTime<Local>>,
    pub start: Option<DateTime<Local>>,

    // --- Source tracking ---
    /// File this task was loaded from (None for tasks created this session)
    pub source_path: Option<PathBuf>,
    /// Whether this task has been modified since load
    pub dirty: bool,
    /// Marked for removal; dropped from the store on the next compaction
    pub pending_removal: bool,
}

impl Task {
    /// Create a new, empty task with the given uid and creation time
    pub fn new(uid: String, now: DateTime<Local>) -> Self {
        Task {
            uid,
            created: Some(now),
            last_modified: Some(now),
            ..Task::default()
        }
    }

    /// Mark this task as dirty (will be written on the next save)
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Stamp `last_modified` and mark dirty
    pub fn touch(&mut self, now: DateTime<Local>) {
        self.last_modified = Some(now);
        self.dirty = true;
    }

    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }

    /// A task needs a non-empty summary before it can be saved
    pub fn is_valid(&self) -> bool {
        !self.summary.trim().is_empty()
    }
}
