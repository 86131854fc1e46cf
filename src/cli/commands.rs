use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug, Default)]
#[command(
    name = "todocal",
    about = concat!("todocal v", env!("CARGO_PKG_VERSION"), " - iCalendar todos in a dmenu"),
    version
)]
pub struct Cli {
    /// Launcher command (dmenu, rofi, wofi, ...)
    #[arg(long = "cmd", value_name = "COMMAND")]
    pub cmd: Option<String>,

    /// Extra launcher arguments, whitespace separated
    #[arg(long, value_name = "ARGS", allow_hyphen_values = true)]
    pub opts: Option<String>,

    /// Directory holding the .ics todo files
    #[arg(long = "todo", value_name = "DIR")]
    pub todo_dir: Option<PathBuf>,

    /// Hide the created date column
    #[arg(long)]
    pub no_created_date: bool,

    /// Hide todos whose start date is in the future
    #[arg(long)]
    pub threshold: bool,

    /// Config file (default: <config dir>/todocal/config.toml)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short, long)]
    pub verbose: bool,
}
