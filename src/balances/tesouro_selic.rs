use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tracing::{debug, warn};

use super::indexes::DailyIndexes;
use crate::db::{FinancialIndex, FixedIncomeDailyBalance, FixedIncomeDeposit};
use crate::tesouro;

/// State of a quota-tracked asset after one CDI tick
#[derive(Debug, Clone, PartialEq)]
pub struct QuotaSnapshot {
    pub asset: String,
    pub date: NaiveDate,
    pub due_date: NaiveDate,
    pub quota_balance: Decimal,
    pub cash_balance: Decimal,
    pub last_purchase_value: Decimal,
}

struct QuotaState {
    quotas: Decimal,
    cash: Decimal,
    last_purchase_value: Decimal,
    due_date: NaiveDate,
}

impl QuotaState {
    fn apply(&mut self, lot: &FixedIncomeDeposit) {
        self.cash += lot.signed_value();
        self.quotas += lot.signed_quotas();
        self.last_purchase_value = lot.signed_value();
        self.due_date = lot.due_date;

        if self.quotas < Decimal::ZERO {
            warn!(
                "{} quota balance would be {} after the {} {} on {}, flooring at zero",
                lot.asset,
                self.quotas,
                lot.operation_type.as_str(),
                lot.quotas,
                lot.purchase_date
            );
            self.quotas = Decimal::ZERO;
            self.cash = Decimal::ZERO;
        }
    }

    fn accrue(&mut self, factor: Decimal) {
        if self.quotas > Decimal::ZERO {
            self.cash *= factor;
        } else {
            self.cash = Decimal::ZERO;
        }
    }
}

/// Replay every quota-tracked asset over the CDI business days from its first
/// purchase up to (excluding) the latest due date, one snapshot per tick.
///
/// Lots are applied on the first tick at or after their purchase date. The
/// opening tick only initializes the position; every later tick applies its
/// lots and then accrues one CDI factor.
pub fn replay_quota_events(
    deposits: &[FixedIncomeDeposit],
    indexes: &DailyIndexes,
) -> Vec<QuotaSnapshot> {
    let mut by_asset: BTreeMap<&str, Vec<&FixedIncomeDeposit>> = BTreeMap::new();
    for lot in deposits.iter().filter(|d| tesouro::is_quota_based(&d.asset)) {
        by_asset.entry(lot.asset.as_str()).or_default().push(lot);
    }

    let mut snapshots = Vec::new();
    for (asset, mut lots) in by_asset {
        lots.sort_by_key(|lot| lot.purchase_date);
        let first_purchase = lots[0].purchase_date;
        let last_due = lots
            .iter()
            .map(|lot| lot.due_date)
            .max()
            .unwrap_or(first_purchase);

        let mut state = QuotaState {
            quotas: Decimal::ZERO,
            cash: Decimal::ZERO,
            last_purchase_value: Decimal::ZERO,
            due_date: lots[0].due_date,
        };
        let mut pending = lots.iter().peekable();
        let mut opened = false;
        let before = snapshots.len();

        let ticks = indexes
            .between(FinancialIndex::Cdi, first_purchase, last_due)
            .iter()
            .take_while(|(date, _)| *date < last_due);
        for &(date, factor) in ticks {
            while let Some(lot) = pending.next_if(|lot| lot.purchase_date <= date) {
                state.apply(lot);
            }

            if opened {
                state.accrue(factor);
            } else {
                opened = true;
            }

            snapshots.push(QuotaSnapshot {
                asset: asset.to_string(),
                date,
                due_date: state.due_date,
                quota_balance: state.quotas,
                cash_balance: state.cash,
                last_purchase_value: state.last_purchase_value,
            });
        }

        if snapshots.len() == before {
            warn!("No CDI factors after {} for {}", first_purchase, asset);
        }
    }

    snapshots
}

/// Fixed-income rows for quota-tracked assets, one per tick with positive cash
pub fn build_quota_balances(
    deposits: &[FixedIncomeDeposit],
    indexes: &DailyIndexes,
) -> Vec<FixedIncomeDailyBalance> {
    let snapshots = replay_quota_events(deposits, indexes);
    let ticks = snapshots.len();

    let balances: Vec<FixedIncomeDailyBalance> = snapshots
        .into_iter()
        .filter(|s| s.cash_balance > Decimal::ZERO)
        .map(|s| FixedIncomeDailyBalance {
            asset: s.asset,
            due_date: s.due_date,
            date: s.date,
            tax_rate: Decimal::ZERO,
            deposit_value: s.last_purchase_value,
            gross_value: s.cash_balance,
            tax_value: Decimal::ZERO,
            net_value: s.cash_balance,
        })
        .collect();

    debug!(
        "Quota replay: {} ticks, {} with a positive balance",
        ticks,
        balances.len()
    );
    balances
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{IndexFactor, OperationType};
    use rust_decimal_macros::dec;

    const ASSET: &str = "Tesouro Selic 2029";

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn cdi(days: std::ops::RangeInclusive<u32>) -> DailyIndexes {
        let factors: Vec<IndexFactor> = days
            .map(|day| IndexFactor {
                financial_index: FinancialIndex::Cdi,
                date: d(2023, 1, day),
                factor: dec!(1.0004),
            })
            .collect();
        DailyIndexes::build(&factors, d(2099, 1, 1), 21)
    }

    fn lot(op: OperationType, date: NaiveDate, quotas: Decimal, value: Decimal) -> FixedIncomeDeposit {
        FixedIncomeDeposit {
            asset: ASSET.to_string(),
            operation_type: op,
            quotas,
            purchase_date: date,
            due_date: d(2029, 3, 1),
            financial_index: FinancialIndex::Cdi,
            value,
            pre_rate: Decimal::ZERO,
            post_rate: Decimal::ONE,
            tax_rate: Decimal::ZERO,
            is_pgbl: false,
        }
    }

    #[test]
    fn test_opening_tick_does_not_accrue() {
        let deposits = vec![lot(OperationType::Buy, d(2023, 1, 2), dec!(100), dec!(1000))];
        let snapshots = replay_quota_events(&deposits, &cdi(2..=4));

        assert_eq!(snapshots.len(), 3);
        assert_eq!(snapshots[0].cash_balance, dec!(1000));
        assert_eq!(snapshots[1].cash_balance, dec!(1000.4));
        assert_eq!(snapshots[2].cash_balance, dec!(1000.80016));
        assert!(snapshots.iter().all(|s| s.quota_balance == dec!(100)));
    }

    #[test]
    fn test_full_redemption_zeroes_cash_and_stops_rows() {
        let deposits = vec![
            lot(OperationType::Buy, d(2023, 1, 2), dec!(100), dec!(1000)),
            lot(OperationType::Sell, d(2023, 1, 6), dec!(100), dec!(1001)),
        ];
        let indexes = cdi(2..=10);

        let snapshots = replay_quota_events(&deposits, &indexes);
        let after: Vec<&QuotaSnapshot> = snapshots.iter().filter(|s| s.date >= d(2023, 1, 6)).collect();
        assert!(!after.is_empty());
        assert!(after.iter().all(|s| s.cash_balance.is_zero() && s.quota_balance.is_zero()));

        let rows = build_quota_balances(&deposits, &indexes);
        assert_eq!(rows.last().map(|r| r.date), Some(d(2023, 1, 5)));
        assert!(rows.iter().all(|r| r.tax_value.is_zero() && r.gross_value == r.net_value));
    }

    #[test]
    fn test_repurchase_restarts_accrual_from_new_cash() {
        let deposits = vec![
            lot(OperationType::Buy, d(2023, 1, 2), dec!(100), dec!(1000)),
            lot(OperationType::Sell, d(2023, 1, 4), dec!(100), dec!(1000.4)),
            lot(OperationType::Buy, d(2023, 1, 8), dec!(50), dec!(600)),
        ];
        let rows = build_quota_balances(&deposits, &cdi(2..=10));

        assert!(rows.iter().all(|r| r.date != d(2023, 1, 5)));
        let reopened = rows.iter().find(|r| r.date == d(2023, 1, 8)).unwrap();
        assert_eq!(reopened.net_value, dec!(600.24));
        assert_eq!(reopened.deposit_value, dec!(600));
    }

    #[test]
    fn test_oversold_quotas_floor_at_zero() {
        let deposits = vec![
            lot(OperationType::Buy, d(2023, 1, 2), dec!(100), dec!(1000)),
            lot(OperationType::Sell, d(2023, 1, 3), dec!(150), dec!(1500)),
        ];
        let snapshots = replay_quota_events(&deposits, &cdi(2..=5));

        assert!(snapshots.iter().all(|s| s.quota_balance >= Decimal::ZERO));
        assert_eq!(snapshots[1].quota_balance, Decimal::ZERO);
        assert_eq!(snapshots[1].cash_balance, Decimal::ZERO);
    }

    #[test]
    fn test_ticks_stop_before_due_date() {
        let mut short = lot(OperationType::Buy, d(2023, 1, 2), dec!(1), dec!(10));
        short.due_date = d(2023, 1, 5);
        let snapshots = replay_quota_events(&[short], &cdi(2..=10));

        let dates: Vec<NaiveDate> = snapshots.iter().map(|s| s.date).collect();
        assert_eq!(dates, vec![d(2023, 1, 2), d(2023, 1, 3), d(2023, 1, 4)]);
    }

    #[test]
    fn test_non_quota_assets_are_ignored() {
        let mut cdb = lot(OperationType::Buy, d(2023, 1, 2), dec!(1), dec!(10));
        cdb.asset = "CDB Nubank".to_string();
        assert!(replay_quota_events(&[cdb], &cdi(2..=4)).is_empty());
    }
}
