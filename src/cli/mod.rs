pub mod commands;

use std::path::Path;

use crate::io::config_io::{ConfigError, expand_home, load_config};
use crate::model::config::Config;

pub use commands::Cli;

/// Build the effective config: defaults, then the config file, then flags
pub fn resolve_config(cli: &Cli) -> Result<Config, ConfigError> {
    let config = load_config(cli.config.as_deref())?;
    Ok(apply_flags(config, cli, dirs::home_dir().as_deref()))
}

/// Layer command-line flags over a loaded config
pub fn apply_flags(mut config: Config, cli: &Cli, home: Option<&Path>) -> Config {
    if let Some(cmd) = &cli.cmd {
        config.launcher.command = cmd.clone();
    }
    if let Some(opts) = &cli.opts {
        config.launcher.args = opts.split_whitespace().map(str::to_string).collect();
    }
    if let Some(dir) = &cli.todo_dir {
        config.todo_dir = dir.clone();
    }
    if cli.no_created_date {
        config.display.show_created_date = false;
    }
    if cli.threshold {
        config.display.threshold = true;
    }
    config.todo_dir = expand_home(&config.todo_dir, home);
    config
}
