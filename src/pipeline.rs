//! Full rebuild of every derived table
//!
//! `rebuild` is a pure function of the inputs, the settings and the as-of
//! date. `run` wraps it with loading from and committing to SQLite.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::Connection;
use serde::Serialize;
use tracing::info;

use crate::balances::{
    aggregate_daily_balances, build_equity_balances, build_fgts_balances,
    build_fixed_income_balances, build_quota_balances, DailyIndexes,
};
use crate::calendar::Calendar;
use crate::config::Settings;
use crate::db::{
    self, CashFlow, DailyBalance, DailyPrice, EquityDailyBalance, FgtsDailyBalance,
    FixedIncomeDailyBalance, MonthlyReturn, PortfolioInputs, SummaryReturn,
};
use crate::pricing::{densify_quotes, seed, DailyPriceBook};
use crate::reports::{build_cash_flows, calculate_monthly_returns, summarize_returns};

/// Every derived table, computed in memory and committed as one unit
#[derive(Debug, Clone, Default)]
pub struct DerivedSnapshot {
    pub as_of: Option<NaiveDate>,
    pub dates: Vec<NaiveDate>,
    pub daily_prices: Vec<DailyPrice>,
    pub equity_balances: Vec<EquityDailyBalance>,
    pub fixed_income_balances: Vec<FixedIncomeDailyBalance>,
    pub fgts_balances: Vec<FgtsDailyBalance>,
    pub daily_balances: Vec<DailyBalance>,
    pub cash_flows: Vec<CashFlow>,
    pub monthly_returns: Vec<MonthlyReturn>,
    pub summary_returns: Vec<SummaryReturn>,
}

/// Row counts of a rebuild
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RebuildStats {
    pub as_of: Option<NaiveDate>,
    pub dates: usize,
    pub daily_prices: usize,
    pub equity_balances: usize,
    pub fixed_income_balances: usize,
    pub fgts_balances: usize,
    pub daily_balances: usize,
    pub cash_flows: usize,
    pub monthly_returns: usize,
    pub summary_returns: usize,
}

impl DerivedSnapshot {
    pub fn stats(&self) -> RebuildStats {
        RebuildStats {
            as_of: self.as_of,
            dates: self.dates.len(),
            daily_prices: self.daily_prices.len(),
            equity_balances: self.equity_balances.len(),
            fixed_income_balances: self.fixed_income_balances.len(),
            fgts_balances: self.fgts_balances.len(),
            daily_balances: self.daily_balances.len(),
            cash_flows: self.cash_flows.len(),
            monthly_returns: self.monthly_returns.len(),
            summary_returns: self.summary_returns.len(),
        }
    }
}

/// Recompute every derived table from the inputs, as of `today`.
pub fn rebuild(
    inputs: &PortfolioInputs,
    settings: &Settings,
    today: NaiveDate,
) -> Result<DerivedSnapshot> {
    let calendar = Calendar::spanning(
        settings.calendar_epoch,
        inputs.earliest_operation_date(),
        today,
    );
    info!(
        "Calendar: {} dates ({:?} to {:?})",
        calendar.len(),
        calendar.first(),
        calendar.last()
    );

    let mut quotes = inputs.quotes.clone();
    if settings.seed_manual_prices {
        seed::merge_manual_prices(&mut quotes);
    }
    let daily_prices = densify_quotes(&calendar, &quotes, settings.far_future);
    let prices = DailyPriceBook::new(&daily_prices);
    info!(
        "Daily prices: {} rows from {} quotes",
        daily_prices.len(),
        quotes.len()
    );

    let equity_balances = build_equity_balances(&inputs.operations, &prices, &settings.fx_ticker)
        .context("Failed to build equity balances")?;
    info!("Equity balances: {} rows", equity_balances.len());

    let indexes = DailyIndexes::build(
        &inputs.index_factors,
        settings.far_future,
        settings.ipca_business_days,
    );
    let mut fixed_income_balances = build_fixed_income_balances(
        &inputs.deposits,
        &indexes,
        &calendar,
        settings.annual_business_days,
    )
    .context("Failed to build fixed-income balances")?;
    let quota_balances = build_quota_balances(&inputs.deposits, &indexes);
    info!(
        "Fixed-income balances: {} compounded rows, {} quota rows",
        fixed_income_balances.len(),
        quota_balances.len()
    );
    fixed_income_balances.extend(quota_balances);

    let fgts_balances = build_fgts_balances(
        &inputs.fgts_events,
        &calendar,
        settings.fgts_min_companies,
        settings.far_future,
    );
    info!("FGTS balances: {} rows", fgts_balances.len());

    let daily_balances = aggregate_daily_balances(&equity_balances, &fixed_income_balances);
    info!("Daily balances: {} rows", daily_balances.len());

    let cash_flows = build_cash_flows(
        &inputs.operations,
        &inputs.deposits,
        &prices,
        &settings.fx_ticker,
    );
    let monthly_returns = calculate_monthly_returns(&daily_balances, &cash_flows);
    let summary_returns = summarize_returns(&monthly_returns);
    info!(
        "Returns: {} cash flows, {} asset-months, {} summary months",
        cash_flows.len(),
        monthly_returns.len(),
        summary_returns.len()
    );

    Ok(DerivedSnapshot {
        as_of: Some(today),
        dates: calendar.dates().to_vec(),
        daily_prices,
        equity_balances,
        fixed_income_balances,
        fgts_balances,
        daily_balances,
        cash_flows,
        monthly_returns,
        summary_returns,
    })
}

/// Load the inputs, rebuild, and atomically replace the derived tables.
///
/// Nothing is written when any stage fails.
pub fn run(conn: &mut Connection, settings: &Settings, today: NaiveDate) -> Result<RebuildStats> {
    let inputs = db::load_inputs(conn).context("Failed to load inputs")?;
    info!(
        "Loaded {} equity operations, {} fixed-income lots, {} quotes, {} index factors, {} FGTS events",
        inputs.operations.len(),
        inputs.deposits.len(),
        inputs.quotes.len(),
        inputs.index_factors.len(),
        inputs.fgts_events.len()
    );

    let snapshot = rebuild(&inputs, settings, today)?;
    db::replace_derived(conn, &snapshot).context("Failed to commit derived tables")?;

    let stats = snapshot.stats();
    info!("Rebuild as of {} committed", today);
    Ok(stats)
}
