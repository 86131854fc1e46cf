use chrono::{DateTime, Local};
use tracing::{debug, info};

use crate::io::launcher::{Launcher, LauncherError, Selection};
use crate::io::store::TaskStore;
use crate::model::task::Task;
use crate::ops::task_ops::{self, TaskError};

pub const NEW_CATEGORY: &str = "Enter new category";

const TITLE_PROMPT: &str = "Todo Title:";

/// How an edit session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    /// Changes were committed to the store
    Saved,
    /// Nothing changed
    Cancelled,
    /// The task was deleted (or a new one discarded)
    Deleted,
}

/// Lines of the item menu
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EditAction {
    Save,
    ToggleComplete,
    Title,
    Priority,
    Categories,
    DueDate,
    StartDate,
    StartTime,
    Description,
    Delete,
}

/// Where the item menu loop stopped
enum Step {
    Save,
    Cancel,
    Delete,
}

/// Drives the per-item edit menu.
///
/// Edits go to a working copy of the task. Only "Save item" writes the
/// copy back to the store, so escaping out leaves the stored task exactly
/// as it was.
pub struct Editor<'a> {
    launcher: &'a mut dyn Launcher,
}

impl<'a> Editor<'a> {
    pub fn new(launcher: &'a mut dyn Launcher) -> Self {
        Editor { launcher }
    }

    /// Edit the task at `index` of the store
    pub fn edit_existing(
        &mut self,
        store: &mut TaskStore,
        index: usize,
    ) -> Result<EditOutcome, LauncherError> {
        let Some(original) = store.tasks().get(index) else {
            return Ok(EditOutcome::Cancelled);
        };
        let mut draft = original.clone();
        let categories = store.categories();

        loop {
            match self.edit_loop(&mut draft, &categories)? {
                Step::Save => {
                    debug!(uid = %draft.uid, "saving todo");
                    store.tasks_mut()[index] = draft;
                    return Ok(EditOutcome::Saved);
                }
                Step::Cancel => return Ok(EditOutcome::Cancelled),
                Step::Delete => {
                    if store.delete(index) {
                        return Ok(EditOutcome::Deleted);
                    }
                    self.feedback("Could not delete item")?;
                }
            }
        }
    }

    /// Ask for a title and edit a new task; it joins the store only when
    /// saved. Escaping or an empty title discards it.
    pub fn add_new(&mut self, store: &mut TaskStore) -> Result<EditOutcome, LauncherError> {
        let title = match self.launcher.prompt(TITLE_PROMPT, "")? {
            Selection::Chosen(title) => title,
            Selection::Cancelled => return Ok(EditOutcome::Cancelled),
        };

        let now = Local::now();
        let mut draft = Task::new(store.generate_uid(now), now);
        if task_ops::set_title(&mut draft, &title).is_err() {
            debug!("discarding new todo without a title");
            return Ok(EditOutcome::Cancelled);
        }

        let categories = store.categories();
        match self.edit_loop(&mut draft, &categories)? {
            Step::Save => {
                let summary = draft.summary.clone();
                if store.push(draft) {
                    info!(%summary, "added todo");
                    Ok(EditOutcome::Saved)
                } else {
                    Ok(EditOutcome::Cancelled)
                }
            }
            Step::Cancel => Ok(EditOutcome::Cancelled),
            Step::Delete => Ok(EditOutcome::Deleted),
        }
    }

    /// Show the item menu until the user saves, deletes or escapes
    fn edit_loop(&mut self, task: &mut Task, categories: &[String]) -> Result<Step, LauncherError> {
        loop {
            let lines = item_menu(task);
            let text: String = lines.iter().map(|(line, _)| format!("{}\n", line)).collect();
            let title = task_ops::title_for_prompt(task);
            let prompt = if title.is_empty() { "New item" } else { title.as_str() };

            let selected = match self.launcher.prompt(prompt, &text)? {
                Selection::Chosen(line) => line,
                Selection::Cancelled => return Ok(Step::Cancel),
            };
            let Some(action) = lines
                .iter()
                .find(|(line, _)| *line == selected)
                .and_then(|(_, action)| *action)
            else {
                continue;
            };

            match action {
                EditAction::Save => {
                    if !task.is_valid() {
                        self.feedback(&TaskError::EmptyTitle.to_string())?;
                        continue;
                    }
                    task.touch(Local::now());
                    return Ok(Step::Save);
                }
                EditAction::ToggleComplete => task_ops::toggle_complete(task, Local::now()),
                EditAction::Title => {
                    if let Some(input) = self.ask(TITLE_PROMPT, &task_ops::title_for_prompt(task))? {
                        self.check(task_ops::set_title(task, &input))?;
                    }
                }
                EditAction::Priority => {
                    let current = if task.priority > 0 {
                        task.priority.to_string()
                    } else {
                        String::new()
                    };
                    if let Some(input) = self.ask("Priority (0-9):", &current)? {
                        self.check(task_ops::set_priority(task, &input))?;
                    }
                }
                EditAction::Categories => self.edit_categories(task, categories)?,
                EditAction::DueDate => {
                    let current = task.due.as_ref().map(task_ops::display_date).unwrap_or_default();
                    if let Some(input) = self.ask("Due date (yyyy-mm-dd):", &current)? {
                        self.check(task_ops::set_due_date(task, &input))?;
                    }
                }
                EditAction::StartDate => {
                    let current = task.start.as_ref().map(task_ops::display_date).unwrap_or_default();
                    if let Some(input) = self.ask("Start date (yyyy-mm-dd):", &current)? {
                        self.check(task_ops::set_start_date(task, &input))?;
                    }
                }
                EditAction::StartTime => {
                    let current = task.start.as_ref().map(task_ops::display_time).unwrap_or_default();
                    if let Some(input) = self.ask("Start time (HH:MM):", &current)? {
                        self.check(task_ops::set_start_time(task, &input, Local::now()))?;
                    }
                }
                EditAction::Description => {
                    let current = task_ops::description_for_prompt(task);
                    if let Some(input) = self.ask("Description:", &current)? {
                        task_ops::set_description(task, &input);
                    }
                }
                EditAction::Delete => {
                    if self.confirm("Delete item? (y/N)")? {
                        return Ok(Step::Delete);
                    }
                }
            }
        }
    }

    /// Pick an existing category, or type a comma-separated list
    fn edit_categories(&mut self, task: &mut Task, categories: &[String]) -> Result<(), LauncherError> {
        let mut menu = format!("{}\n", NEW_CATEGORY);
        for category in categories {
            menu.push_str(category);
            menu.push('\n');
        }
        let selected = match self.launcher.prompt("Categories:", &menu)? {
            Selection::Chosen(line) => line,
            Selection::Cancelled => return Ok(()),
        };
        if selected != NEW_CATEGORY {
            task_ops::set_categories(task, &selected);
            return Ok(());
        }
        if let Some(input) = self.ask("Categories (comma separated):", &task_ops::categories_for_prompt(task))? {
            task_ops::set_categories(task, &input);
        }
        Ok(())
    }

    /// Single-value prompt seeded with `current`; `None` when escaped
    fn ask(&mut self, prompt: &str, current: &str) -> Result<Option<String>, LauncherError> {
        match self.launcher.prompt(prompt, current)? {
            Selection::Chosen(input) => Ok(Some(input)),
            Selection::Cancelled => Ok(None),
        }
    }

    /// y/N question; anything but `y` is no
    pub fn confirm(&mut self, question: &str) -> Result<bool, LauncherError> {
        Ok(matches!(
            self.launcher.prompt(question, "")?,
            Selection::Chosen(answer) if answer.trim().eq_ignore_ascii_case("y")
        ))
    }

    /// Show a message; whatever comes back is ignored
    fn feedback(&mut self, message: &str) -> Result<(), LauncherError> {
        self.launcher.prompt(message, "")?;
        Ok(())
    }

    fn check(&mut self, result: Result<(), TaskError>) -> Result<(), LauncherError> {
        if let Err(e) = result {
            debug!(error = %e, "rejected input");
            self.feedback(&e.to_string())?;
        }
        Ok(())
    }
}

/// The item menu for the current state of `task`, blank lines included
fn item_menu(task: &Task) -> Vec<(String, Option<EditAction>)> {
    let mut lines = vec![("Save item".to_string(), Some(EditAction::Save))];
    if task.is_valid() {
        let toggle = if task.is_completed() {
            "Restore item (uncomplete)"
        } else {
            "Complete item"
        };
        lines.push((toggle.to_string(), Some(EditAction::ToggleComplete)));
    }
    lines.push((String::new(), None));

    let date = |d: &Option<DateTime<Local>>| d.as_ref().map(task_ops::display_date).unwrap_or_default();
    let time = task.start.as_ref().map(task_ops::display_time).unwrap_or_default();
    let priority = if task.priority > 0 {
        task.priority.to_string()
    } else {
        String::new()
    };
    lines.extend([
        (format!("Title: {}", task_ops::title_for_prompt(task)), Some(EditAction::Title)),
        (format!("Priority: {}", priority), Some(EditAction::Priority)),
        (
            format!("Categories: {}", task_ops::categories_for_prompt(task)),
            Some(EditAction::Categories),
        ),
        (format!("Due date (yyyy-mm-dd): {}", date(&task.due)), Some(EditAction::DueDate)),
        (format!("Start date (yyyy-mm-dd): {}", date(&task.start)), Some(EditAction::StartDate)),
        (format!("Start time (HH:MM): {}", time), Some(EditAction::StartTime)),
        (
            format!("Description: {}", task_ops::description_for_prompt(task)),
            Some(EditAction::Description),
        ),
        (String::new(), None),
        ("Delete item".to_string(), Some(EditAction::Delete)),
    ]);
    lines
}
