use std::path::PathBuf;

use serde::Deserialize;

/// Resolved runtime configuration, passed explicitly to the store,
/// renderer, edit controller and launcher.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Config {
    /// Directory holding one `.ics` file per todo
    #[serde(default = "default_todo_dir")]
    pub todo_dir: PathBuf,
    #[serde(default)]
    pub launcher: LauncherConfig,
    #[serde(default)]
    pub display: DisplayConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            todo_dir: default_todo_dir(),
            launcher: LauncherConfig::default(),
            display: DisplayConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LauncherConfig {
    /// Launcher program (dmenu, rofi, wofi, fuzzel --dmenu ...)
    #[serde(default = "default_launcher")]
    pub command: String,
    /// Extra arguments appended after the built-in ones
    #[serde(default)]
    pub args: Vec<String>,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        LauncherConfig {
            command: default_launcher(),
            args: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DisplayConfig {
    /// Show the creation date column in the todo list
    #[serde(default = "default_true")]
    pub show_created_date: bool,
    /// Hide open todos whose start date is still in the future
    #[serde(default)]
    pub threshold: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        DisplayConfig {
            show_created_date: true,
            threshold: false,
        }
    }
}

fn default_todo_dir() -> PathBuf {
    PathBuf::from("todo")
}

fn default_launcher() -> String {
    "dmenu".to_string()
}

fn default_true() -> bool {
    true
}
