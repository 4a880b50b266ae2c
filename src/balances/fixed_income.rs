use anyhow::Result;
use chrono::NaiveDate;
use rust_decimal::{Decimal, MathematicalOps};
use std::collections::BTreeMap;
use std::ops::AddAssign;
use tracing::{debug, warn};

use super::indexes::DailyIndexes;
use crate::calendar::Calendar;
use crate::db::{FixedIncomeDailyBalance, FixedIncomeDeposit};
use crate::error::PortfolioError;
use crate::tesouro;

/// Value of a lot (or of a summed position) on one index date
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Accrual {
    pub deposit: Decimal,
    pub gross: Decimal,
    pub tax: Decimal,
    pub net: Decimal,
}

impl AddAssign for Accrual {
    fn add_assign(&mut self, other: Self) {
        self.deposit += other.deposit;
        self.gross += other.gross;
        self.tax += other.tax;
        self.net += other.net;
    }
}

/// `(1 + annual_rate)^(1 / business_days) - 1`
pub fn daily_pre_rate(annual_rate: Decimal, business_days: u32) -> Result<Decimal> {
    if annual_rate.is_zero() {
        return Ok(Decimal::ZERO);
    }
    let exponent = Decimal::ONE / Decimal::from(business_days);
    let factor = (Decimal::ONE + annual_rate)
        .checked_powd(exponent)
        .ok_or_else(|| {
            PortfolioError::Validation(format!("cannot de-annualize pre rate {}", annual_rate))
        })?;
    Ok(factor - Decimal::ONE)
}

/// Compound one lot over every index date in `[purchase_date, due_date]`.
///
/// The cumulative factor is `exp(sum(ln(daily_total_rate)))`, accumulated in
/// date order so long horizons do not drift.
pub fn accrue_lot(
    lot: &FixedIncomeDeposit,
    indexes: &DailyIndexes,
    annual_business_days: u32,
) -> Result<Vec<(NaiveDate, Accrual)>> {
    let pre = daily_pre_rate(lot.pre_rate, annual_business_days)?;
    let principal = lot.signed_value();

    let mut log_sum = Decimal::ZERO;
    let mut accruals = Vec::new();
    for &(date, factor) in indexes.between(lot.financial_index, lot.purchase_date, lot.due_date) {
        let post = lot.post_rate * (factor - Decimal::ONE) + Decimal::ONE;
        let total = pre + post;
        if total <= Decimal::ZERO {
            return Err(PortfolioError::Validation(format!(
                "{} has non-positive daily rate {} on {}",
                lot.asset, total, date
            ))
            .into());
        }

        log_sum += total.checked_ln().ok_or_else(|| {
            PortfolioError::Validation(format!("ln({}) overflow for {}", total, lot.asset))
        })?;
        let cumulative = log_sum.checked_exp().ok_or_else(|| {
            PortfolioError::Validation(format!("cumulative factor overflow for {}", lot.asset))
        })?;

        let gross = principal * cumulative;
        let tax = if lot.is_pgbl {
            gross * lot.tax_rate
        } else {
            (gross - principal) * lot.tax_rate
        };
        accruals.push((
            date,
            Accrual {
                deposit: principal,
                gross,
                tax,
                net: gross - tax,
            },
        ));
    }

    Ok(accruals)
}

struct Position {
    tax_rate: Decimal,
    is_pgbl: bool,
    by_date: BTreeMap<NaiveDate, Accrual>,
}

impl Position {
    /// Summed value on one index date, taxed on the position's total gain.
    /// None once redemptions have taken the principal or the gross value to zero.
    fn settle(&self, summed: &Accrual) -> Option<Accrual> {
        if summed.deposit <= Decimal::ZERO || summed.gross <= Decimal::ZERO {
            return None;
        }
        let tax = if self.is_pgbl {
            summed.gross * self.tax_rate
        } else {
            (summed.gross - summed.deposit).max(Decimal::ZERO) * self.tax_rate
        };
        Some(Accrual {
            deposit: summed.deposit,
            gross: summed.gross,
            tax,
            net: summed.gross - tax,
        })
    }
}

/// Daily balances of every lot-compounded (non-quota) fixed-income position.
///
/// Lots sharing `(asset, due_date)` are summed per index date and taxed on the
/// summed gain; each summed value then holds over the calendar until the next
/// index date, and the last one until the due date (exclusive). A position
/// redeemed down to a non-positive principal or gross value emits no rows.
pub fn build_fixed_income_balances(
    deposits: &[FixedIncomeDeposit],
    indexes: &DailyIndexes,
    calendar: &Calendar,
    annual_business_days: u32,
) -> Result<Vec<FixedIncomeDailyBalance>> {
    let mut positions: BTreeMap<(&str, NaiveDate), Position> = BTreeMap::new();

    for lot in deposits.iter().filter(|d| !tesouro::is_quota_based(&d.asset)) {
        let accruals = accrue_lot(lot, indexes, annual_business_days)?;
        if accruals.is_empty() {
            warn!(
                "No {} factors between {} and {} for {}",
                lot.financial_index.as_str(),
                lot.purchase_date,
                lot.due_date,
                lot.asset
            );
            continue;
        }

        let position = positions
            .entry((lot.asset.as_str(), lot.due_date))
            .or_insert_with(|| Position {
                tax_rate: lot.tax_rate,
                is_pgbl: lot.is_pgbl,
                by_date: BTreeMap::new(),
            });
        for (date, accrual) in accruals {
            *position.by_date.entry(date).or_default() += accrual;
        }
    }

    let mut balances = Vec::new();
    for ((asset, due_date), position) in positions {
        let points: Vec<(NaiveDate, Accrual)> = position
            .by_date
            .iter()
            .map(|(date, summed)| (*date, *summed))
            .collect();
        let before = balances.len();
        for (i, (start, summed)) in points.iter().enumerate() {
            let Some(accrual) = position.settle(summed) else {
                continue;
            };
            let until = points.get(i + 1).map_or(due_date, |(next, _)| *next);
            for &date in calendar.window(*start, until) {
                balances.push(FixedIncomeDailyBalance {
                    asset: asset.to_string(),
                    due_date,
                    date,
                    tax_rate: position.tax_rate,
                    deposit_value: accrual.deposit,
                    gross_value: accrual.gross,
                    tax_value: accrual.tax,
                    net_value: accrual.net,
                });
            }
        }
        debug!(
            "{} (due {}): {} daily rows",
            asset,
            due_date,
            balances.len() - before
        );
    }

    Ok(balances)
}
