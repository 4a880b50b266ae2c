use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use carteira::error::PortfolioError;

pub mod formatters;

#[derive(Parser)]
#[command(name = "carteira")]
#[command(
    version,
    about = "Daily balance history and monthly returns for a Brazilian investment portfolio"
)]
#[command(
    long_about = "Rebuilds daily balances for equities, fixed income (CDI, IPCA, pre-fixed, Tesouro Selic) and FGTS from the operations stored in SQLite, then derives per-asset monthly returns and a portfolio summary with moving averages."
)]
pub struct Cli {
    /// Disable colorized/ANSI output
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,

    /// Output results in JSON format
    #[arg(long = "json", global = true)]
    pub json: bool,

    /// Settings file (defaults to <config dir>/carteira/config.toml)
    #[arg(long = "config", global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the database schema (safe to re-run)
    Init,

    /// Recompute every derived table from the input tables
    Rebuild {
        /// Last date of the rebuilt history (YYYY-MM-DD, defaults to today)
        #[arg(long = "as-of", value_name = "DATE")]
        as_of: Option<String>,
    },

    /// Per-asset monthly returns from the last rebuild
    Returns {
        /// Only this asset or ticker
        #[arg(long)]
        asset: Option<String>,

        /// Only this year
        #[arg(long)]
        year: Option<i32>,
    },

    /// Portfolio totals per month with moving averages
    Summary {
        /// Show only the most recent N months
        #[arg(long, value_name = "N")]
        last: Option<usize>,
    },
}

/// Parse a `YYYY-MM-DD` command-line date
pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|e| {
        PortfolioError::Parse(format!("invalid date '{}' (expected YYYY-MM-DD): {}", raw, e))
            .into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date("2024-02-29").unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
        );
        assert!(parse_date("2023-02-29").is_err());
        assert!(parse_date("29/02/2024").is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["carteira", "returns", "--year", "2023", "--json"]).unwrap();
        assert!(cli.json);
        match cli.command {
            Commands::Returns { asset, year } => {
                assert_eq!(asset, None);
                assert_eq!(year, Some(2023));
            }
            _ => panic!("expected returns command"),
        }
    }

    #[test]
    fn test_rebuild_as_of_flag() {
        let cli = Cli::try_parse_from(["carteira", "rebuild", "--as-of", "2024-06-30"]).unwrap();
        match cli.command {
            Commands::Rebuild { as_of } => assert_eq!(as_of.as_deref(), Some("2024-06-30")),
            _ => panic!("expected rebuild command"),
        }
    }
}
