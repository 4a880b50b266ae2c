use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use std::collections::BTreeMap;

use crate::db::{CashFlow, DailyBalance, MonthlyReturn};

/// Per-asset monthly returns from the daily balances and the cash-flow ledger.
///
/// A month is measured between two reference points: the last balance seen
/// before the month begins and the last balance seen before the following
/// observed month begins. The final observed month of an asset has no closing
/// reference yet and is not reported.
pub fn calculate_monthly_returns(balances: &[DailyBalance], flows: &[CashFlow]) -> Vec<MonthlyReturn> {
    let mut by_asset: BTreeMap<&str, BTreeMap<NaiveDate, Decimal>> = BTreeMap::new();
    for row in balances {
        *by_asset
            .entry(row.asset.as_str())
            .or_default()
            .entry(row.date)
            .or_insert(Decimal::ZERO) += row.value;
    }

    let mut deposits: BTreeMap<(&str, i32, u32), Decimal> = BTreeMap::new();
    for flow in flows {
        let key = (
            flow.asset.as_str(),
            flow.operation_date.year(),
            flow.operation_date.month(),
        );
        *deposits.entry(key).or_insert(Decimal::ZERO) += flow.value;
    }

    let mut returns = Vec::new();
    for (asset, series) in by_asset {
        let references = month_references(&series);

        for pair in references.windows(2) {
            let ((year, month), start_value) = pair[0];
            let (_, end_value) = pair[1];
            let deposit = deposits
                .get(&(asset, year, month))
                .copied()
                .unwrap_or(Decimal::ZERO);

            let net_increase = end_value - start_value;
            let profit = net_increase - deposit;
            let relative_return_pct = if start_value.is_zero() {
                None
            } else {
                Some(profit / start_value * Decimal::ONE_HUNDRED)
            };

            returns.push(MonthlyReturn {
                asset: asset.to_string(),
                year,
                month,
                start_value,
                end_value,
                deposit,
                net_increase,
                profit,
                relative_return_pct,
            });
        }
    }

    returns
}

/// `(year, month)` of each observed month with the value observed just before
/// its first date (zero for the very first observation)
fn month_references(series: &BTreeMap<NaiveDate, Decimal>) -> Vec<((i32, u32), Decimal)> {
    let mut references: Vec<((i32, u32), Decimal)> = Vec::new();
    let mut previous = Decimal::ZERO;

    for (date, value) in series {
        let key = (date.year(), date.month());
        if references.last().map(|(k, _)| *k) != Some(key) {
            references.push((key, previous));
        }
        previous = *value;
    }

    references
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{BalanceClass, Currency, OperationType};
    use rust_decimal_macros::dec;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn balance(asset: &str, date: NaiveDate, value: Decimal, class: BalanceClass) -> DailyBalance {
        DailyBalance {
            asset: asset.to_string(),
            date,
            value,
            class,
        }
    }

    fn deposit(asset: &str, date: NaiveDate, value: Decimal) -> CashFlow {
        CashFlow {
            asset: asset.to_string(),
            operation_type: OperationType::Buy,
            operation_date: date,
            value,
            currency: Currency::Real,
            fx_price: None,
        }
    }

    #[test]
    fn test_month_with_deposit_and_gain() {
        let balances = vec![
            balance("BOVA11", d(2023, 1, 31), dec!(10000), BalanceClass::Equity),
            balance("BOVA11", d(2023, 2, 1), dec!(10600), BalanceClass::Equity),
            balance("BOVA11", d(2023, 2, 28), dec!(11000), BalanceClass::Equity),
            balance("BOVA11", d(2023, 3, 1), dec!(11050), BalanceClass::Equity),
        ];
        let flows = vec![deposit("BOVA11", d(2023, 2, 1), dec!(500))];

        let returns = calculate_monthly_returns(&balances, &flows);

        assert_eq!(returns.len(), 2);
        let feb = &returns[1];
        assert_eq!((feb.year, feb.month), (2023, 2));
        assert_eq!(feb.start_value, dec!(10000));
        assert_eq!(feb.end_value, dec!(11000));
        assert_eq!(feb.deposit, dec!(500));
        assert_eq!(feb.net_increase, dec!(1000));
        assert_eq!(feb.profit, dec!(500));
        assert_eq!(feb.relative_return_pct, Some(dec!(5)));
    }

    #[test]
    fn test_first_month_starts_from_zero_and_has_no_relative_return() {
        let balances = vec![
            balance("CDB", d(2023, 1, 10), dec!(1000), BalanceClass::FixedIncome),
            balance("CDB", d(2023, 1, 31), dec!(1010), BalanceClass::FixedIncome),
            balance("CDB", d(2023, 2, 1), dec!(1011), BalanceClass::FixedIncome),
        ];
        let flows = vec![deposit("CDB", d(2023, 1, 10), dec!(1000))];

        let returns = calculate_monthly_returns(&balances, &flows);

        assert_eq!(returns.len(), 1);
        assert_eq!(returns[0].start_value, Decimal::ZERO);
        assert_eq!(returns[0].end_value, dec!(1010));
        assert_eq!(returns[0].profit, dec!(10));
        assert_eq!(returns[0].relative_return_pct, None);
    }

    #[test]
    fn test_classes_are_summed_per_asset_and_identities_hold() {
        let mut balances = Vec::new();
        for (i, day) in [d(2023, 3, 31), d(2023, 4, 3), d(2023, 4, 28), d(2023, 5, 2), d(2023, 6, 1)]
            .into_iter()
            .enumerate()
        {
            let step = Decimal::from(i as i64 * 10);
            balances.push(balance("Mixed", day, dec!(100) + step, BalanceClass::Equity));
            balances.push(balance("Mixed", day, dec!(200) + step, BalanceClass::FixedIncome));
        }

        let returns = calculate_monthly_returns(&balances, &[]);

        assert_eq!(returns.len(), 3);
        let april = &returns[1];
        assert_eq!(april.start_value, dec!(300));
        assert_eq!(april.end_value, dec!(340));
        for r in &returns {
            assert_eq!(r.net_increase, r.end_value - r.start_value);
            assert_eq!(r.profit, r.net_increase - r.deposit);
        }
    }

    #[test]
    fn test_single_month_is_not_reported() {
        let balances = vec![balance("NU", d(2023, 1, 2), dec!(5), BalanceClass::Equity)];
        assert!(calculate_monthly_returns(&balances, &[]).is_empty());
    }
}
