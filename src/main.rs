use clap::Parser;
use todocal::cli::{Cli, resolve_config};
use todocal::io::launcher::ProcessLauncher;
use tracing::error;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "todocal=debug,info"
    } else {
        "todocal=info,warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = match resolve_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    let mut launcher = ProcessLauncher::new(&config.launcher);
    if let Err(e) = todocal::menu::run(&config, &mut launcher) {
        error!("{}", e);
        std::process::exit(1);
    }
}
