use chrono::Local;
use tracing::{debug, info};

use crate::io::launcher::{Launcher, LauncherError, Selection};
use crate::io::store::{StoreError, TaskStore};
use crate::menu::edit::Editor;
use crate::menu::render::{MenuAction, Mode, Renderer};
use crate::model::config::Config;

const COMPLETED_PROMPT: &str = "Completed Items";

/// Error type for a whole session
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Launcher(#[from] LauncherError),
}

/// Load the todo directory, run the menus until the user escapes from the
/// top level, then save.
///
/// Changes are saved even when the launcher fails part way; the launcher
/// error is still returned.
pub fn run(config: &Config, launcher: &mut dyn Launcher) -> Result<(), AppError> {
    let mut store = TaskStore::load(&config.todo_dir)?;
    let renderer = Renderer::new(&config.display);
    let title = config.todo_dir.display().to_string();

    let result = todo_menu(&mut store, &renderer, launcher, &title);
    let saved = store.save();
    result?;
    saved?;
    Ok(())
}

fn todo_menu(
    store: &mut TaskStore,
    renderer: &Renderer,
    launcher: &mut dyn Launcher,
    title: &str,
) -> Result<(), LauncherError> {
    loop {
        store.compact();
        let menu = renderer.render(store.tasks_mut(), Mode::Active, Local::now());
        let selected = match launcher.prompt(title, &menu.text())? {
            Selection::Chosen(line) => line,
            Selection::Cancelled => return Ok(()),
        };

        match menu.action(&selected) {
            Some(MenuAction::AddItem) => {
                Editor::new(launcher).add_new(store)?;
            }
            Some(MenuAction::ViewCompleted) => completed_menu(store, renderer, launcher)?,
            Some(MenuAction::Edit(index)) => {
                Editor::new(launcher).edit_existing(store, index)?;
            }
            Some(MenuAction::DeleteAllCompleted) | None => {
                debug!(line = %selected, "ignoring selection");
            }
        }
    }
}

fn completed_menu(
    store: &mut TaskStore,
    renderer: &Renderer,
    launcher: &mut dyn Launcher,
) -> Result<(), LauncherError> {
    loop {
        store.compact();
        let menu = renderer.render(store.tasks_mut(), Mode::Completed, Local::now());
        let selected = match launcher.prompt(COMPLETED_PROMPT, &menu.text())? {
            Selection::Chosen(line) => line,
            Selection::Cancelled => return Ok(()),
        };

        match menu.action(&selected) {
            Some(MenuAction::DeleteAllCompleted) => {
                if Editor::new(launcher).confirm("Delete ALL Completed Items? (y/N)")? {
                    let deleted = store.delete_completed();
                    info!(deleted, "deleted completed todos");
                }
                return Ok(());
            }
            Some(MenuAction::Edit(index)) => {
                Editor::new(launcher).edit_existing(store, index)?;
            }
            _ => debug!(line = %selected, "ignoring selection"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::launcher::ScriptedLauncher;
    use crate::model::task::{Task, TaskStatus};
    use std::fs;
    use tempfile::TempDir;

    fn config(tmp: &TempDir) -> Config {
        Config {
            todo_dir: tmp.path().join("todo"),
            ..Config::default()
        }
    }

    fn seed(config: &Config, tasks: &[(&str, &str, TaskStatus)]) {
        let tasks = tasks
            .iter()
            .map(|(uid, summary, status)| {
                let mut t = Task::new(uid.to_string(), Local::now());
                t.summary = summary.to_string();
                t.status = *status;
                t.mark_dirty();
                t
            })
            .collect();
        fs::create_dir_all(&config.todo_dir).unwrap();
        TaskStore::with_tasks(config.todo_dir.clone(), tasks).save().unwrap();
    }

    fn run_script(config: &Config, script: Vec<Option<&str>>) -> ScriptedLauncher {
        let mut launcher = ScriptedLauncher::new(script);
        run(config, &mut launcher).unwrap();
        launcher
    }

    #[test]
    fn test_escape_at_top_creates_dir_and_exits() {
        let tmp = TempDir::new().unwrap();
        let config = config(&tmp);
        let launcher = run_script(&config, vec![None]);

        assert!(config.todo_dir.is_dir());
        assert_eq!(fs::read_dir(&config.todo_dir).unwrap().count(), 0);
        let (prompt, menu) = &launcher.prompts[0];
        assert_eq!(prompt, &config.todo_dir.display().to_string());
        assert_eq!(menu, "Add Item\nView Completed Items\n");
    }

    #[test]
    fn test_add_item_is_saved_on_exit() {
        let tmp = TempDir::new().unwrap();
        let config = config(&tmp);
        run_script(
            &config,
            vec![Some("Add Item"), Some("Buy milk"), Some("Save item"), None],
        );

        let store = TaskStore::load(&config.todo_dir).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.tasks()[0].summary, "Buy milk");
    }

    #[test]
    fn test_edit_selected_line() {
        let tmp = TempDir::new().unwrap();
        let config = config(&tmp);
        seed(&config, &[("a", "First", TaskStatus::NeedsAction)]);

        let store = TaskStore::load(&config.todo_dir).unwrap();
        let line = Renderer::new(&config.display).task_line(&store.tasks()[0]);

        run_script(
            &config,
            vec![
                Some(line.as_str()),
                Some("Title: First"),
                Some("Renamed"),
                Some("Save item"),
                None,
            ],
        );

        let store = TaskStore::load(&config.todo_dir).unwrap();
        assert_eq!(store.tasks()[0].summary, "Renamed");
    }

    #[test]
    fn test_delete_all_completed() {
        let tmp = TempDir::new().unwrap();
        let config = config(&tmp);
        seed(
            &config,
            &[
                ("open", "Still open", TaskStatus::NeedsAction),
                ("done", "Finished", TaskStatus::Completed),
            ],
        );

        run_script(
            &config,
            vec![
                Some("View Completed Items"),
                Some("Delete All Completed"),
                Some("y"),
                None,
            ],
        );

        assert!(!config.todo_dir.join("done.ics").exists());
        assert!(config.todo_dir.join("open.ics").exists());
        let store = TaskStore::load(&config.todo_dir).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.tasks()[0].uid, "open");
    }

    #[test]
    fn test_declined_delete_all_keeps_files() {
        let tmp = TempDir::new().unwrap();
        let config = config(&tmp);
        seed(&config, &[("done", "Finished", TaskStatus::Completed)]);

        let launcher = run_script(
            &config,
            vec![
                Some("View Completed Items"),
                Some("Delete All Completed"),
                Some("n"),
                None,
            ],
        );

        assert!(config.todo_dir.join("done.ics").exists());
        assert!(launcher.is_exhausted());
    }

    #[test]
    fn test_untouched_files_are_not_rewritten() {
        let tmp = TempDir::new().unwrap();
        let config = config(&tmp);
        fs::create_dir_all(&config.todo_dir).unwrap();
        let path = config.todo_dir.join("hand.ics");
        let text = "BEGIN:VCALENDAR\nVERSION:2.0\nBEGIN:VTODO\nUID:hand\nSUMMARY:Hand written\nX-CUSTOM:keep\nEND:VTODO\nEND:VCALENDAR\n";
        fs::write(&path, text).unwrap();

        run_script(&config, vec![Some("Add Item"), Some("Other"), Some("Save item"), None]);

        assert_eq!(fs::read_to_string(&path).unwrap(), text);
        assert_eq!(TaskStore::load(&config.todo_dir).unwrap().len(), 2);
    }
}
