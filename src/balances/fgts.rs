use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tracing::debug;

use crate::calendar::Calendar;
use crate::db::{FgtsDailyBalance, FgtsEvent};

/// Monthly FGTS statements turned into a daily balance.
///
/// Each employer contributes its highest balance of the month. Months where
/// fewer than `min_companies` employers reported are treated as incomplete and
/// dropped; the remaining monthly totals are forward-filled from the first of
/// the month until the next kept month (or `far_future`).
pub fn build_fgts_balances(
    events: &[FgtsEvent],
    calendar: &Calendar,
    min_companies: usize,
    far_future: NaiveDate,
) -> Vec<FgtsDailyBalance> {
    let mut by_company: BTreeMap<(NaiveDate, &str), Decimal> = BTreeMap::new();
    for event in events {
        let Some(month) = first_of_month(event.date) else {
            continue;
        };
        by_company
            .entry((month, event.company.as_str()))
            .and_modify(|best| *best = (*best).max(event.balance))
            .or_insert(event.balance);
    }

    let mut by_month: BTreeMap<NaiveDate, (Decimal, usize)> = BTreeMap::new();
    for ((month, _), balance) in by_company {
        let entry = by_month.entry(month).or_insert((Decimal::ZERO, 0));
        entry.0 += balance;
        entry.1 += 1;
    }

    let total_months = by_month.len();
    let kept: Vec<(NaiveDate, Decimal)> = by_month
        .into_iter()
        .filter(|(_, (_, companies))| *companies >= min_companies)
        .map(|(month, (balance, _))| (month, balance))
        .collect();
    if kept.len() < total_months {
        debug!(
            "Dropped {} FGTS months with fewer than {} companies",
            total_months - kept.len(),
            min_companies
        );
    }

    let mut balances = Vec::new();
    for (i, (month, balance)) in kept.iter().enumerate() {
        let until = kept.get(i + 1).map_or(far_future, |(next, _)| *next);
        balances.extend(calendar.window(*month, until).iter().map(|&date| FgtsDailyBalance {
            date,
            balance: *balance,
        }));
    }

    balances
}

fn first_of_month(date: NaiveDate) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(date.year(), date.month(), 1)
}
