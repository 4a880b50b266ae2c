//! Rebuild settings
//!
//! Loaded from a TOML file; every field has a default so an absent file
//! (the common case) yields the stock behavior.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::PortfolioError;

const CONFIG_FILENAME: &str = "config.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// SQLite file; defaults to ~/.carteira/data.db
    pub database_path: Option<PathBuf>,
    /// Earliest date of the date dimension
    pub calendar_epoch: NaiveDate,
    /// Open end of the last validity window of a forward-filled series
    pub far_future: NaiveDate,
    /// Quote series used to convert foreign-currency tickers to BRL
    pub fx_ticker: String,
    /// Minimum employers reporting in a month for it to count as an FGTS observation
    pub fgts_min_companies: usize,
    /// Business days the monthly IPCA factor is spread over
    pub ipca_business_days: u32,
    /// Business days per year used to de-annualize pre-fixed rates
    pub annual_business_days: u32,
    /// Merge the built-in manual price overrides before densification
    pub seed_manual_prices: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_path: None,
            calendar_epoch: NaiveDate::from_ymd_opt(2018, 1, 1).unwrap_or(NaiveDate::MIN),
            far_future: NaiveDate::from_ymd_opt(2099, 1, 1).unwrap_or(NaiveDate::MAX),
            fx_ticker: "BRL=X".to_string(),
            fgts_min_companies: 2,
            ipca_business_days: 21,
            annual_business_days: 252,
            seed_manual_prices: true,
        }
    }
}

impl Settings {
    /// Load settings from an explicit path, or from the default location.
    /// A missing default file is not an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match default_config_path() {
                Some(p) if p.exists() => p,
                _ => {
                    debug!("No config file found, using defaults");
                    return Ok(Self::default());
                }
            },
        };

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        let settings = Self::from_toml(&content)
            .with_context(|| format!("Invalid config file {:?}", path))?;
        debug!("Loaded settings from {:?}", path);
        Ok(settings)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let settings: Settings = toml::from_str(content)
            .map_err(|e| PortfolioError::Config(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.ipca_business_days == 0 || self.annual_business_days == 0 {
            return Err(PortfolioError::Config(
                "business day counts must be positive".to_string(),
            )
            .into());
        }
        if self.far_future <= self.calendar_epoch {
            return Err(PortfolioError::Config(format!(
                "far_future {} must be after calendar_epoch {}",
                self.far_future, self.calendar_epoch
            ))
            .into());
        }
        if self.fx_ticker.trim().is_empty() {
            return Err(PortfolioError::Config("fx_ticker must not be empty".to_string()).into());
        }
        Ok(())
    }
}

/// `<config_home>/carteira/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dir_spec::config_home().map(|dir| dir.join("carteira").join(CONFIG_FILENAME))
}
