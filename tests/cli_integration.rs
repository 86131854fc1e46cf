//! Integration tests for the `todocal` binary.
//!
//! Each test runs `todocal` as a subprocess against a temp todo directory,
//! with a small shell script standing in for dmenu.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

/// Get the path to the built `todocal` binary.
fn todocal_bin() -> PathBuf {
    // cargo test builds to target/debug/
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("todocal");
    path
}

fn run_todocal(args: &[&str]) -> Output {
    Command::new(todocal_bin())
        .args(args)
        .env("RUST_LOG", "todocal=debug")
        .output()
        .expect("failed to run todocal")
}

/// Write an executable launcher script
#[cfg(unix)]
fn launcher_script(dir: &Path, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;
    let path = dir.join("launcher.sh");
    fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

#[test]
fn help_lists_flags() {
    let output = run_todocal(&["--help"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for flag in ["--cmd", "--opts", "--todo", "--no-created-date", "--threshold", "--config"] {
        assert!(stdout.contains(flag), "missing {} in help:\n{}", flag, stdout);
    }
}

#[cfg(unix)]
#[test]
fn cancel_at_top_level_exits_cleanly() {
    let tmp = TempDir::new().unwrap();
    let todo_dir = tmp.path().join("todo");

    // `false` exits 1 without output: the user pressed escape
    let output = run_todocal(&["--cmd", "false", "--todo", todo_dir.to_str().unwrap()]);

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(todo_dir.is_dir());
    assert_eq!(fs::read_dir(&todo_dir).unwrap().count(), 0);
}

#[cfg(unix)]
#[test]
fn launcher_receives_menu_on_stdin() {
    let tmp = TempDir::new().unwrap();
    let todo_dir = tmp.path().join("todo");
    let seen = tmp.path().join("seen.txt");
    let script = launcher_script(
        tmp.path(),
        &format!("echo \"$@\" >> '{0}'\ncat >> '{0}'\nexit 1", seen.display()),
    );

    let output = run_todocal(&[
        "--cmd",
        script.to_str().unwrap(),
        "--opts",
        "-l 10",
        "--todo",
        todo_dir.to_str().unwrap(),
    ]);

    assert!(output.status.success());
    let seen = fs::read_to_string(&seen).unwrap();
    assert!(seen.starts_with(&format!("-i -p {} -l 10\n", todo_dir.display())));
    assert!(seen.contains("Add Item\nView Completed Items\n"));
}

#[cfg(unix)]
#[test]
fn launcher_diagnostics_are_fatal() {
    let tmp = TempDir::new().unwrap();
    let todo_dir = tmp.path().join("todo");
    let script = launcher_script(tmp.path(), "echo 'cannot open display' >&2\nexit 1");

    let output = run_todocal(&[
        "--cmd",
        script.to_str().unwrap(),
        "--todo",
        todo_dir.to_str().unwrap(),
    ]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("cannot open display"), "stderr: {}", stderr);
}

#[test]
fn missing_config_file_is_fatal() {
    let tmp = TempDir::new().unwrap();
    let output = run_todocal(&[
        "--config",
        tmp.path().join("absent.toml").to_str().unwrap(),
        "--cmd",
        "false",
        "--todo",
        tmp.path().join("todo").to_str().unwrap(),
    ]);
    assert!(!output.status.success());
    assert!(!tmp.path().join("todo").exists());
}

#[cfg(unix)]
#[test]
fn config_file_sets_launcher() {
    let tmp = TempDir::new().unwrap();
    let todo_dir = tmp.path().join("from-config");
    let config = tmp.path().join("config.toml");
    fs::write(
        &config,
        format!(
            "todo_dir = \"{}\"\n\n[launcher]\ncommand = \"false\"\n",
            todo_dir.display()
        ),
    )
    .unwrap();

    let output = run_todocal(&["--config", config.to_str().unwrap()]);
    assert!(output.status.success());
    assert!(todo_dir.is_dir());
}
