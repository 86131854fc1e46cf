use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use icalendar::Calendar;

use crate::model::task::Task;
use crate::parse::ical::{entry_count, remove_todo, todo_mut, todos};
use crate::parse::{ParseError, apply_task, parse_calendar, serialize_calendar, task_from_component};

/// File extension of todo records
pub const EXTENSION: &str = "ics";

/// Error type for task store I/O
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("could not create todo directory {path}: {source}")]
    CreateDir { path: PathBuf, source: io::Error },
    #[error("could not read todo directory {path}: {source}")]
    ReadDir { path: PathBuf, source: io::Error },
    #[error("could not read {path}: {source}")]
    ReadError { path: PathBuf, source: io::Error },
    #[error("could not parse {path}: {source}")]
    ParseError { path: PathBuf, source: ParseError },
    #[error("could not write {path}: {source}")]
    WriteError { path: PathBuf, source: io::Error },
    #[error("could not remove {path}: {source}")]
    RemoveError { path: PathBuf, source: io::Error },
    #[error("todo {uid} not found in {path}")]
    TodoNotFound { path: PathBuf, uid: String },
}

/// All todos of one directory, in menu order once sorted.
///
/// The store owns every task; the menu and editor only borrow them.
#[derive(Debug)]
pub struct TaskStore {
    dir: PathBuf,
    tasks: Vec<Task>,
}

impl TaskStore {
    /// Load every `.ics` file in `dir`, creating the directory if needed.
    ///
    /// A file that cannot be read or parsed is logged and skipped. Only an
    /// unreadable directory is an error.
    pub fn load(dir: &Path) -> Result<Self, StoreError> {
        if !dir.exists() {
            fs::create_dir_all(dir).map_err(|e| StoreError::CreateDir {
                path: dir.to_path_buf(),
                source: e,
            })?;
            info!(dir = %dir.display(), "created todo directory");
        }

        let read_dir_err = |e| StoreError::ReadDir {
            path: dir.to_path_buf(),
            source: e,
        };
        let mut paths = Vec::new();
        for entry in fs::read_dir(dir).map_err(read_dir_err)? {
            let path = entry.map_err(read_dir_err)?.path();
            if path.is_file() && has_record_extension(&path) {
                paths.push(path);
            }
        }
        paths.sort();

        let mut tasks: Vec<Task> = Vec::new();
        let mut seen = HashSet::new();
        for path in paths {
            let file_tasks = match load_file(&path) {
                Ok(file_tasks) => file_tasks,
                Err(e) => {
                    warn!(error = %e, "skipping todo file");
                    continue;
                }
            };
            for task in file_tasks {
                if !seen.insert(task.uid.clone()) {
                    warn!(uid = %task.uid, path = %path.display(), "duplicate uid, skipping");
                    continue;
                }
                tasks.push(task);
            }
        }

        if tasks.is_empty() {
            warn!(dir = %dir.display(), "no todos found");
        } else {
            debug!(count = tasks.len(), dir = %dir.display(), "loaded todos");
        }

        Ok(TaskStore {
            dir: dir.to_path_buf(),
            tasks,
        })
    }

    /// A store over an in-memory task list (nothing is read from `dir`)
    pub fn with_tasks(dir: PathBuf, tasks: Vec<Task>) -> Self {
        TaskStore { dir, tasks }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn tasks_mut(&mut self) -> &mut [Task] {
        &mut self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Append a committed new task. Tasks without a summary, or whose uid is
    /// already taken, are rejected.
    pub fn push(&mut self, mut task: Task) -> bool {
        if !task.is_valid() {
            debug!(uid = %task.uid, "not adding todo without a title");
            return false;
        }
        if self.tasks.iter().any(|t| t.uid == task.uid) {
            warn!(uid = %task.uid, "not adding todo with duplicate uid");
            return false;
        }
        task.mark_dirty();
        self.tasks.push(task);
        true
    }

    /// A time-derived uid that is unique within this store and directory
    pub fn generate_uid(&self, now: DateTime<Local>) -> String {
        let mut n = now
            .timestamp_nanos_opt()
            .unwrap_or_else(|| now.timestamp_micros().saturating_mul(1000));
        loop {
            let uid = n.to_string();
            let taken = self.tasks.iter().any(|t| t.uid == uid)
                || self.dir.join(file_name_for(&uid)).exists();
            if !taken {
                return uid;
            }
            n += 1;
        }
    }

    /// Every category in use, deduplicated and sorted
    pub fn categories(&self) -> Vec<String> {
        self.tasks
            .iter()
            .filter(|t| !t.pending_removal)
            .flat_map(|t| t.categories.iter())
            .filter(|c| !c.is_empty())
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Delete the task at `index` from disk and mark it for removal.
    ///
    /// The backing file is removed first; if that fails the task is left
    /// untouched and `false` is returned. The entry itself disappears on the
    /// next [`compact`](Self::compact), so indices stay valid until then.
    pub fn delete(&mut self, index: usize) -> bool {
        let Some(task) = self.tasks.get_mut(index) else {
            return false;
        };
        if task.pending_removal {
            return true;
        }
        if let Some(path) = &task.source_path
            && let Err(e) = remove_from_file(path, &task.uid)
        {
            warn!(error = %e, uid = %task.uid, "could not delete todo");
            return false;
        }
        task.pending_removal = true;
        info!(summary = %task.summary, "deleted todo");
        true
    }

    /// Delete every completed task. Returns how many were deleted.
    pub fn delete_completed(&mut self) -> usize {
        let indices: Vec<usize> = self
            .tasks
            .iter()
            .enumerate()
            .filter(|(_, t)| t.is_completed() && !t.pending_removal)
            .map(|(i, _)| i)
            .collect();
        indices.into_iter().filter(|&i| self.delete(i)).count()
    }

    /// Drop tasks marked for removal. Returns how many were dropped.
    pub fn compact(&mut self) -> usize {
        let before = self.tasks.len();
        self.tasks.retain(|t| !t.pending_removal);
        before - self.tasks.len()
    }

    /// Write every dirty task back to its file and clear its dirty flag.
    ///
    /// Clean tasks are skipped entirely, so their files stay byte-for-byte
    /// as they were on disk.
    pub fn save(&mut self) -> Result<(), StoreError> {
        let mut written = 0;
        for task in self
            .tasks
            .iter_mut()
            .filter(|t| t.dirty && !t.pending_removal)
        {
            let path = task
                .source_path
                .clone()
                .unwrap_or_else(|| self.dir.join(file_name_for(&task.uid)));
            write_task(&path, task)?;
            task.source_path = Some(path);
            task.dirty = false;
            written += 1;
        }
        if written > 0 {
            info!(written, dir = %self.dir.display(), "saved todos");
        }
        Ok(())
    }
}

/// `<uid>.ics`, with path separators in the uid replaced
pub fn file_name_for(uid: &str) -> String {
    let safe: String = uid
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | '\0') { '_' } else { c })
        .collect();
    format!("{}.{}", safe, EXTENSION)
}

fn has_record_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(EXTENSION))
}

/// Read one record file into tasks, one per VTODO.
fn load_file(path: &Path) -> Result<Vec<Task>, StoreError> {
    let text = fs::read_to_string(path).map_err(|e| StoreError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;
    let calendar = parse_calendar(&text).map_err(|e| StoreError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })?;

    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_string();
    Ok(todos(&calendar)
        .map(|todo| {
            let mut task = task_from_component(todo);
            if task.uid.is_empty() {
                task.uid = stem.clone();
            }
            task.source_path = Some(path.to_path_buf());
            task
        })
        .collect())
}

/// Update (or create) the VTODO for `task` inside the file at `path`.
fn write_task(path: &Path, task: &Task) -> Result<(), StoreError> {
    let mut calendar = match fs::read_to_string(path) {
        Ok(text) => parse_calendar(&text).map_err(|e| StoreError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?,
        Err(e) if e.kind() == io::ErrorKind::NotFound => Calendar::new(),
        Err(e) => {
            return Err(StoreError::ReadError {
                path: path.to_path_buf(),
                source: e,
            });
        }
    };

    match todo_mut(&mut calendar, &task.uid) {
        Some(todo) => {
            let updated = apply_task(task, Some(&*todo));
            *todo = updated;
        }
        None => {
            calendar.push(apply_task(task, None));
        }
    }

    let content = serialize_calendar(&calendar);
    atomic_write(path, content.as_bytes()).map_err(|e| StoreError::WriteError {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Remove the VTODO `uid` from its file: the whole file when it holds
/// nothing else, otherwise rewrite it without that component.
///
/// A file that no longer contains `uid` is left alone and reported as an
/// error, so other entries are never lost.
fn remove_from_file(path: &Path, uid: &str) -> Result<(), StoreError> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => {
            return Err(StoreError::RemoveError {
                path: path.to_path_buf(),
                source: e,
            });
        }
    };

    if let Ok(mut calendar) = parse_calendar(&text) {
        if !remove_todo(&mut calendar, uid) {
            return Err(StoreError::TodoNotFound {
                path: path.to_path_buf(),
                uid: uid.to_string(),
            });
        }
        if entry_count(&calendar) > 0 {
            let content = serialize_calendar(&calendar);
            return atomic_write(path, content.as_bytes()).map_err(|e| StoreError::WriteError {
                path: path.to_path_buf(),
                source: e,
            });
        }
    }

    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(StoreError::RemoveError {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Write `content` to `path` atomically using a temp file + rename.
fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    let dir = path.parent().unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
