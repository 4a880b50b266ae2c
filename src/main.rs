mod cli;
mod dispatcher;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use carteira::config::Settings;
use cli::Cli;
use dispatcher::{dispatch_command, AppContext};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so --json output stays parseable
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(!cli.no_color)
        .init();

    if cli.no_color {
        colored::control::set_override(false);
    }

    let settings = Settings::load(cli.config.as_deref())?;
    let ctx = AppContext {
        settings,
        json_output: cli.json,
    };

    dispatch_command(cli.command, &ctx)
}
