use std::cmp::Ordering;

use chrono::{DateTime, Local};
use indexmap::IndexMap;

use crate::model::config::DisplayConfig;
use crate::model::task::{Task, TaskStatus};
use crate::ops::task_ops::display_date;

pub const ADD_ITEM: &str = "Add Item";
pub const VIEW_COMPLETED: &str = "View Completed Items";
pub const DELETE_ALL_COMPLETED: &str = "Delete All Completed";

/// Width of the priority column, `(N) `
const PRIORITY_WIDTH: usize = 4;
/// Width of the created column, `yyyy-mm-dd `
const CREATED_WIDTH: usize = 11;

/// Which tasks a todo list shows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Active,
    Completed,
}

impl Mode {
    fn status(self) -> TaskStatus {
        match self {
            Mode::Active => TaskStatus::NeedsAction,
            Mode::Completed => TaskStatus::Completed,
        }
    }
}

/// What selecting a line of the todo list does
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    AddItem,
    ViewCompleted,
    DeleteAllCompleted,
    /// Edit the task at this index of the store
    Edit(usize),
}

/// A rendered todo list: lines in display order, each tagged with its action
#[derive(Debug, Clone, Default)]
pub struct Menu {
    entries: IndexMap<String, MenuAction>,
}

impl Menu {
    fn push(&mut self, line: String, action: MenuAction) {
        // Identical lines collapse; the later task wins.
        self.entries.insert(line, action);
    }

    /// Launcher input, one line per entry
    pub fn text(&self) -> String {
        let mut text = String::new();
        for line in self.entries.keys() {
            text.push_str(line);
            text.push('\n');
        }
        text
    }

    /// The action for a line returned by the launcher
    pub fn action(&self, line: &str) -> Option<MenuAction> {
        self.entries.get(line).copied()
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

/// Renders the todo list according to the display settings
#[derive(Debug, Clone)]
pub struct Renderer {
    show_created_date: bool,
    threshold: bool,
}

impl Renderer {
    pub fn new(display: &DisplayConfig) -> Self {
        Renderer {
            show_created_date: display.show_created_date,
            threshold: display.threshold,
        }
    }

    /// Sort `tasks` in place and build the menu for `mode`.
    ///
    /// Indices in [`MenuAction::Edit`] refer to the sorted slice.
    pub fn render(&self, tasks: &mut [Task], mode: Mode, now: DateTime<Local>) -> Menu {
        sort_tasks(tasks);

        let mut menu = Menu::default();
        match mode {
            Mode::Active => {
                menu.push(ADD_ITEM.to_string(), MenuAction::AddItem);
                menu.push(VIEW_COMPLETED.to_string(), MenuAction::ViewCompleted);
            }
            Mode::Completed => {
                menu.push(DELETE_ALL_COMPLETED.to_string(), MenuAction::DeleteAllCompleted);
            }
        }
        for (index, line) in self.task_lines(tasks, mode, now) {
            menu.push(line, MenuAction::Edit(index));
        }
        menu
    }

    /// Lazily render the tasks visible in `mode`, with their indices
    pub fn task_lines<'a>(
        &'a self,
        tasks: &'a [Task],
        mode: Mode,
        now: DateTime<Local>,
    ) -> impl Iterator<Item = (usize, String)> + 'a {
        tasks
            .iter()
            .enumerate()
            .filter(move |(_, t)| self.is_visible(t, mode, now))
            .map(|(i, t)| (i, self.task_line(t)))
    }

    fn is_visible(&self, task: &Task, mode: Mode, now: DateTime<Local>) -> bool {
        if task.pending_removal || task.status != mode.status() {
            return false;
        }
        if self.threshold && mode == Mode::Active && task.start.is_some_and(|start| start > now) {
            return false;
        }
        true
    }

    /// One todo as a single menu line:
    /// `(N) yyyy-mm-dd summary @cat1 @cat2 due:yyyy-mm-dd`
    pub fn task_line(&self, task: &Task) -> String {
        let mut line = String::new();

        if task.priority > 0 {
            line.push_str(&format!("({}) ", task.priority));
        } else {
            line.push_str(&" ".repeat(PRIORITY_WIDTH));
        }

        if self.show_created_date {
            match &task.created {
                Some(created) => {
                    line.push_str(&display_date(created));
                    line.push(' ');
                }
                None => line.push_str(&" ".repeat(CREATED_WIDTH)),
            }
        }

        line.push_str(&task.summary.replace(['\n', '\r'], " "));

        for category in &task.categories {
            line.push_str(" @");
            line.push_str(category);
        }

        if let Some(due) = &task.due {
            line.push_str(" due:");
            line.push_str(&display_date(due));
        }

        line
    }
}

/// Menu order: tasks with a due date first (earliest first), then by
/// priority with unset last, then newest first.
pub fn compare_tasks(a: &Task, b: &Task) -> Ordering {
    let due = match (&a.due, &b.due) {
        (Some(x), Some(y)) => x.cmp(y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    due.then_with(|| priority_rank(a.priority).cmp(&priority_rank(b.priority)))
        .then_with(|| b.created.cmp(&a.created))
}

pub fn sort_tasks(tasks: &mut [Task]) {
    tasks.sort_by(compare_tasks);
}

/// Priority 0 means unset and ranks after 9
fn priority_rank(priority: u8) -> u8 {
    if priority == 0 { u8::MAX } else { priority }
}
