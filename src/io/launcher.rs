use std::io::{self, Write};
use std::path::Path;
use std::process::{Command, Stdio};

use tracing::debug;

use crate::model::config::LauncherConfig;

/// Exit status a dmenu-style launcher uses for "nothing selected" (Esc)
const CANCEL_EXIT_CODE: i32 = 1;

/// Outcome of one launcher prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// The selected (or typed) line, without the trailing newline
    Chosen(String),
    /// The user dismissed the prompt
    Cancelled,
}

/// Error type for launcher invocations
#[derive(Debug, thiserror::Error)]
pub enum LauncherError {
    #[error("could not start launcher `{command}`: {source}")]
    Spawn { command: String, source: io::Error },
    #[error("launcher `{command}` I/O failed: {source}")]
    Io { command: String, source: io::Error },
    #[error("launcher `{command}` failed: {stderr}")]
    Diagnostics { command: String, stderr: String },
    #[error("launcher `{command}` exited with {status}")]
    Exit { command: String, status: String },
}

/// The only way the application talks to the user: show a list of lines,
/// get one line back.
pub trait Launcher {
    /// Present `menu` (newline-separated lines) under `prompt`.
    fn prompt(&mut self, prompt: &str, menu: &str) -> Result<Selection, LauncherError>;
}

/// Runs an external dmenu-compatible program per prompt
#[derive(Debug, Clone)]
pub struct ProcessLauncher {
    command: String,
    extra_args: Vec<String>,
}

impl ProcessLauncher {
    pub fn new(config: &LauncherConfig) -> Self {
        ProcessLauncher {
            command: config.command.clone(),
            extra_args: config.args.clone(),
        }
    }

    /// Full argument list for one prompt
    fn args(&self, prompt: &str) -> Vec<String> {
        let program = Path::new(&self.command)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(&self.command);
        let mut args = Vec::new();
        match program {
            "rofi" => args.push("-dmenu".to_string()),
            "wofi" => args.push("--dmenu".to_string()),
            _ => {}
        }
        args.extend(["-i".to_string(), "-p".to_string(), prompt.to_string()]);
        args.extend(self.extra_args.iter().cloned());
        args
    }
}

impl Launcher for ProcessLauncher {
    fn prompt(&mut self, prompt: &str, menu: &str) -> Result<Selection, LauncherError> {
        let args = self.args(prompt);
        debug!(command = %self.command, ?args, "running launcher");

        let mut child = Command::new(&self.command)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| LauncherError::Spawn {
                command: self.command.clone(),
                source: e,
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            // A launcher may exit without reading its input; the exit status
            // decides what that means.
            match stdin.write_all(menu.as_bytes()) {
                Err(e) if e.kind() != io::ErrorKind::BrokenPipe => {
                    return Err(LauncherError::Io {
                        command: self.command.clone(),
                        source: e,
                    });
                }
                _ => {}
            }
        }

        let output = child.wait_with_output().map_err(|e| LauncherError::Io {
            command: self.command.clone(),
            source: e,
        })?;

        interpret_output(
            &self.command,
            output.status.success(),
            output.status.code(),
            &output.stdout,
            &output.stderr,
        )
    }
}

/// Map a finished launcher run onto a selection.
///
/// Cancellation is "exit 1 and nothing on stderr"; any stderr output on a
/// failed run is fatal regardless of the code.
fn interpret_output(
    command: &str,
    success: bool,
    code: Option<i32>,
    stdout: &[u8],
    stderr: &[u8],
) -> Result<Selection, LauncherError> {
    if success {
        let out = String::from_utf8_lossy(stdout);
        return Ok(Selection::Chosen(out.trim_end_matches(['\n', '\r']).to_string()));
    }

    let stderr = String::from_utf8_lossy(stderr).trim().to_string();
    if !stderr.is_empty() {
        return Err(LauncherError::Diagnostics {
            command: command.to_string(),
            stderr,
        });
    }
    if code == Some(CANCEL_EXIT_CODE) {
        return Ok(Selection::Cancelled);
    }
    Err(LauncherError::Exit {
        command: command.to_string(),
        status: code.map_or_else(|| "a signal".to_string(), |c| format!("status {}", c)),
    })
}

/// Replays canned selections and records every prompt it was shown
#[cfg(test)]
pub(crate) struct ScriptedLauncher {
    responses: std::collections::VecDeque<Selection>,
    pub prompts: Vec<(String, String)>,
}

#[cfg(test)]
impl ScriptedLauncher {
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = Option<S>>,
        S: Into<String>,
    {
        ScriptedLauncher {
            responses: responses
                .into_iter()
                .map(|r| match r {
                    Some(line) => Selection::Chosen(line.into()),
                    None => Selection::Cancelled,
                })
                .collect(),
            prompts: Vec::new(),
        }
    }

    /// Whether every scripted response has been consumed
    pub fn is_exhausted(&self) -> bool {
        self.responses.is_empty()
    }
}

#[cfg(test)]
impl Launcher for ScriptedLauncher {
    fn prompt(&mut self, prompt: &str, menu: &str) -> Result<Selection, LauncherError> {
        self.prompts.push((prompt.to_string(), menu.to_string()));
        Ok(self.responses.pop_front().unwrap_or(Selection::Cancelled))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn launcher(command: &str, args: &[&str]) -> ProcessLauncher {
        ProcessLauncher::new(&LauncherConfig {
            command: command.to_string(),
            args: args.iter().map(|s| s.to_string()).collect(),
        })
    }

    #[test]
    fn test_args_per_launcher() {
        assert_eq!(launcher("dmenu", &[]).args("Todo"), vec!["-i", "-p", "Todo"]);
        assert_eq!(
            launcher("/usr/bin/rofi", &["-theme", "dark"]).args("Todo"),
            vec!["-dmenu", "-i", "-p", "Todo", "-theme", "dark"]
        );
        assert_eq!(launcher("wofi", &[]).args("x"), vec!["--dmenu", "-i", "-p", "x"]);
    }

    #[test]
    fn test_interpret_success_trims_newline() {
        let sel = interpret_output("dmenu", true, Some(0), b"Add Item\n", b"").unwrap();
        assert_eq!(sel, Selection::Chosen("Add Item".to_string()));
    }

    #[test]
    fn test_interpret_cancel_needs_empty_stderr() {
        assert_eq!(
            interpret_output("dmenu", false, Some(1), b"", b"").unwrap(),
            Selection::Cancelled
        );
        assert!(matches!(
            interpret_output("dmenu", false, Some(1), b"", b"cannot grab keyboard\n"),
            Err(LauncherError::Diagnostics { .. })
        ));
        assert!(matches!(
            interpret_output("dmenu", false, Some(2), b"", b""),
            Err(LauncherError::Exit { .. })
        ));
    }

    #[cfg(unix)]
    fn script(dir: &Path, body: &str) -> String {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join("launcher.sh");
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[cfg(unix)]
    #[test]
    fn test_process_selects_line() {
        let tmp = tempfile::TempDir::new().unwrap();
        let mut first_line = launcher(&script(tmp.path(), "head -n 1"), &[]);
        assert_eq!(
            first_line.prompt("Todo", "Add Item\nView Completed Items\n").unwrap(),
            Selection::Chosen("Add Item".to_string())
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_process_cancel_and_failure() {
        let mut cancel = launcher("false", &[]);
        assert_eq!(cancel.prompt("x", "a\nb\n").unwrap(), Selection::Cancelled);

        let tmp = tempfile::TempDir::new().unwrap();
        let mut noisy = launcher(&script(tmp.path(), "echo 'no display' >&2; exit 1"), &[]);
        match noisy.prompt("x", "a") {
            Err(LauncherError::Diagnostics { stderr, .. }) => assert_eq!(stderr, "no display"),
            other => panic!("expected diagnostics error, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_program_is_spawn_error() {
        let mut missing = launcher("definitely-not-a-launcher-7f3a", &[]);
        assert!(matches!(
            missing.prompt("x", "a"),
            Err(LauncherError::Spawn { .. })
        ));
    }
}
