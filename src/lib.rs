//! Carteira - daily balance history and monthly returns for a Brazilian portfolio
//!
//! Reads equity, fixed income and FGTS operations from SQLite, rebuilds the
//! daily balance of every position and derives per-asset monthly returns plus
//! a portfolio summary with moving averages.

pub mod balances;
pub mod calendar;
pub mod config;
pub mod db;
pub mod error;
pub mod pipeline;
pub mod pricing;
pub mod reports;
pub mod tesouro;
pub mod utils;
