use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tracing::debug;

use crate::db::{BalanceClass, DailyBalance, EquityDailyBalance, FixedIncomeDailyBalance};

/// Union of equity and fixed-income balances, summed per `(asset, class, date)`.
///
/// Each side is cut at the other side's latest date so the union never reaches
/// past the point where both are known. An empty side leaves the other whole.
pub fn aggregate_daily_balances(
    equity: &[EquityDailyBalance],
    fixed_income: &[FixedIncomeDailyBalance],
) -> Vec<DailyBalance> {
    let equity_end = equity.iter().map(|r| r.date).max();
    let fixed_end = fixed_income.iter().map(|r| r.date).max();
    let equity_cutoff = fixed_end.unwrap_or(NaiveDate::MAX);
    let fixed_cutoff = equity_end.unwrap_or(NaiveDate::MAX);

    let mut totals: BTreeMap<(&str, BalanceClass, NaiveDate), Decimal> = BTreeMap::new();
    for row in equity.iter().filter(|r| r.date <= equity_cutoff) {
        *totals
            .entry((row.ticker.as_str(), BalanceClass::Equity, row.date))
            .or_insert(Decimal::ZERO) += row.value;
    }
    for row in fixed_income.iter().filter(|r| r.date <= fixed_cutoff) {
        *totals
            .entry((row.asset.as_str(), BalanceClass::FixedIncome, row.date))
            .or_insert(Decimal::ZERO) += row.net_value;
    }

    let input_rows = equity.len() + fixed_income.len();
    let balances: Vec<DailyBalance> = totals
        .into_iter()
        .map(|((asset, class, date), value)| DailyBalance {
            asset: asset.to_string(),
            date,
            value,
            class,
        })
        .collect();
    debug!(
        "Aggregated {} balance rows into {}",
        input_rows,
        balances.len()
    );

    balances
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Currency;
    use rust_decimal_macros::dec;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn equity_row(ticker: &str, date: NaiveDate, value: Decimal) -> EquityDailyBalance {
        EquityDailyBalance {
            ticker: ticker.to_string(),
            date,
            price: value,
            fx_price: None,
            currency: Currency::Real,
            amount_change: None,
            amount: dec!(1),
            value,
        }
    }

    fn fixed_row(asset: &str, due: NaiveDate, date: NaiveDate, net: Decimal) -> FixedIncomeDailyBalance {
        FixedIncomeDailyBalance {
            asset: asset.to_string(),
            due_date: due,
            date,
            tax_rate: Decimal::ZERO,
            deposit_value: net,
            gross_value: net,
            tax_value: Decimal::ZERO,
            net_value: net,
        }
    }

    #[test]
    fn test_union_is_truncated_at_the_shorter_side() {
        let equity: Vec<_> = (1..=10).map(|day| equity_row("BOVA11", d(2024, 1, day), dec!(100))).collect();
        let fixed: Vec<_> = (1..=7)
            .map(|day| fixed_row("CDB", d(2025, 1, 1), d(2024, 1, day), dec!(50)))
            .collect();

        let rows = aggregate_daily_balances(&equity, &fixed);

        assert_eq!(rows.iter().map(|r| r.date).max(), Some(d(2024, 1, 7)));
        assert_eq!(rows.iter().filter(|r| r.class == BalanceClass::Equity).count(), 7);
        assert_eq!(rows.iter().filter(|r| r.class == BalanceClass::FixedIncome).count(), 7);
    }

    #[test]
    fn test_lots_with_different_due_dates_are_summed() {
        let fixed = vec![
            fixed_row("LCA", d(2025, 1, 1), d(2024, 1, 1), dec!(10)),
            fixed_row("LCA", d(2026, 1, 1), d(2024, 1, 1), dec!(15)),
        ];

        let rows = aggregate_daily_balances(&[], &fixed);

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].value, dec!(25));
        assert_eq!(rows[0].class, BalanceClass::FixedIncome);
    }

    #[test]
    fn test_empty_side_keeps_the_other_whole() {
        let equity: Vec<_> = (1..=3).map(|day| equity_row("IVV", d(2024, 1, day), dec!(1))).collect();
        assert_eq!(aggregate_daily_balances(&equity, &[]).len(), 3);
        assert!(aggregate_daily_balances(&[], &[]).is_empty());
    }
}
