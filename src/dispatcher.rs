//! Routes parsed CLI commands to the library and prints their results

use anyhow::{Context, Result};
use chrono::Local;
use std::path::PathBuf;
use tracing::info;

use carteira::config::Settings;
use carteira::{db, pipeline};

use crate::cli::{formatters, parse_date, Commands};

/// Execution context shared by every command
pub struct AppContext {
    pub settings: Settings,
    pub json_output: bool,
}

impl AppContext {
    fn db_path(&self) -> Option<PathBuf> {
        self.settings.database_path.clone()
    }
}

pub fn dispatch_command(command: Commands, ctx: &AppContext) -> Result<()> {
    match command {
        Commands::Init => dispatch_init(ctx),
        Commands::Rebuild { as_of } => dispatch_rebuild(as_of.as_deref(), ctx),
        Commands::Returns { asset, year } => dispatch_returns(asset.as_deref(), year, ctx),
        Commands::Summary { last } => dispatch_summary(last, ctx),
    }
}

fn dispatch_init(ctx: &AppContext) -> Result<()> {
    db::init_database(ctx.db_path())?;
    if ctx.json_output {
        println!(r#"{{"initialized": true}}"#);
    } else {
        println!("Database ready");
    }
    Ok(())
}

fn dispatch_rebuild(as_of: Option<&str>, ctx: &AppContext) -> Result<()> {
    let today = match as_of {
        Some(raw) => parse_date(raw)?,
        None => Local::now().date_naive(),
    };

    db::init_database(ctx.db_path())?;
    let mut conn = db::open_db(ctx.db_path())?;
    info!("Rebuilding derived tables as of {}", today);
    let stats = pipeline::run(&mut conn, &ctx.settings, today).context("Rebuild failed")?;

    if ctx.json_output {
        println!("{}", formatters::format_rebuild_json(&stats));
    } else {
        println!("{}", formatters::format_rebuild_table(&stats));
    }
    Ok(())
}

fn dispatch_returns(asset: Option<&str>, year: Option<i32>, ctx: &AppContext) -> Result<()> {
    db::init_database(ctx.db_path())?;
    let conn = db::open_db(ctx.db_path())?;
    let returns = db::load_monthly_returns(&conn, asset, year)?;

    if ctx.json_output {
        println!("{}", formatters::format_returns_json(&returns));
    } else if returns.is_empty() {
        print!("{}", formatters::format_no_returns());
    } else {
        println!("{}", formatters::format_returns_table(&returns));
    }
    Ok(())
}

fn dispatch_summary(last: Option<usize>, ctx: &AppContext) -> Result<()> {
    db::init_database(ctx.db_path())?;
    let conn = db::open_db(ctx.db_path())?;
    let mut summary = db::load_summary_returns(&conn)?;
    if let Some(n) = last {
        let skip = summary.len().saturating_sub(n);
        summary.drain(..skip);
    }

    if ctx.json_output {
        println!("{}", formatters::format_summary_json(&summary));
    } else if summary.is_empty() {
        print!("{}", formatters::format_no_returns());
    } else {
        println!("{}", formatters::format_summary_table(&summary));
    }
    Ok(())
}
