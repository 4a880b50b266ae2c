use rust_decimal::Decimal;
use std::collections::BTreeMap;

use crate::db::{MonthlyReturn, MovingAverages, SummaryReturn};

/// Trailing windows, in summary rows, of the moving averages
pub const MOVING_AVERAGE_WINDOWS: [usize; 4] = [3, 6, 9, 12];

#[derive(Default)]
struct MonthTotals {
    end_value: Decimal,
    start_value: Decimal,
    deposit: Decimal,
    profit: Decimal,
}

/// Portfolio totals per month, oldest first, with trailing moving averages
pub fn summarize_returns(monthly: &[MonthlyReturn]) -> Vec<SummaryReturn> {
    let mut by_month: BTreeMap<(i32, u32), MonthTotals> = BTreeMap::new();
    for r in monthly {
        let totals = by_month.entry((r.year, r.month)).or_default();
        totals.end_value += r.end_value;
        totals.start_value += r.start_value;
        totals.deposit += r.deposit;
        totals.profit += r.profit;
    }

    let mut summary: Vec<SummaryReturn> = by_month
        .into_iter()
        .map(|((year, month), totals)| SummaryReturn {
            year,
            month,
            end_value: totals.end_value,
            total_deposit: totals.deposit,
            total_profit: totals.profit,
            total_return_pct: if totals.start_value.is_zero() {
                None
            } else {
                Some(totals.profit / totals.start_value * Decimal::ONE_HUNDRED)
            },
            moving_averages: Vec::new(),
        })
        .collect();

    for i in 0..summary.len() {
        let averages: Vec<MovingAverages> = MOVING_AVERAGE_WINDOWS
            .iter()
            .map(|&months| {
                let from = (i + 1).saturating_sub(months);
                trailing_average(&summary[from..=i], months)
            })
            .collect();
        summary[i].moving_averages = averages;
    }

    summary
}

fn trailing_average(window: &[SummaryReturn], months: usize) -> MovingAverages {
    let rows = Decimal::from(window.len());
    let deposit: Decimal = window.iter().map(|s| s.total_deposit).sum();
    let profit: Decimal = window.iter().map(|s| s.total_profit).sum();

    let returns: Vec<Decimal> = window.iter().filter_map(|s| s.total_return_pct).collect();
    let return_pct = if returns.is_empty() {
        None
    } else {
        Some(returns.iter().sum::<Decimal>() / Decimal::from(returns.len()))
    };

    MovingAverages {
        months,
        deposit: deposit / rows,
        profit: profit / rows,
        return_pct,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn monthly(asset: &str, year: i32, month: u32, start: Decimal, deposit: Decimal, profit: Decimal) -> MonthlyReturn {
        let net_increase = deposit + profit;
        MonthlyReturn {
            asset: asset.to_string(),
            year,
            month,
            start_value: start,
            end_value: start + net_increase,
            deposit,
            net_increase,
            profit,
            relative_return_pct: if start.is_zero() {
                None
            } else {
                Some(profit / start * dec!(100))
            },
        }
    }

    #[test]
    fn test_assets_are_summed_per_month() {
        let rows = vec![
            monthly("A", 2023, 2, dec!(10000), dec!(500), dec!(500)),
            monthly("B", 2023, 2, dec!(5000), dec!(0), dec!(250)),
        ];

        let summary = summarize_returns(&rows);

        assert_eq!(summary.len(), 1);
        assert_eq!(summary[0].end_value, dec!(16250));
        assert_eq!(summary[0].total_deposit, dec!(500));
        assert_eq!(summary[0].total_profit, dec!(750));
        assert_eq!(summary[0].total_return_pct, Some(dec!(5)));
    }

    #[test]
    fn test_moving_averages_cover_current_and_previous_rows() {
        let rows: Vec<MonthlyReturn> = (1..=4)
            .map(|m| monthly("A", 2023, m, dec!(1000), Decimal::from(m * 100), Decimal::from(m * 10)))
            .collect();

        let summary = summarize_returns(&rows);

        let fourth = summary[3].moving_average(3).unwrap();
        // Months 2, 3 and 4
        assert_eq!(fourth.deposit, dec!(300));
        assert_eq!(fourth.profit, dec!(30));
        assert_eq!(fourth.return_pct, Some(dec!(3)));

        // Shorter history than the window averages what exists
        let first = summary[0].moving_average(12).unwrap();
        assert_eq!(first.deposit, dec!(100));
        assert_eq!(summary[3].moving_average(6).unwrap().deposit, dec!(250));
    }

    #[test]
    fn test_return_average_skips_months_without_return() {
        let rows = vec![
            monthly("A", 2023, 1, dec!(0), dec!(1000), dec!(0)),
            monthly("A", 2023, 2, dec!(1000), dec!(0), dec!(20)),
        ];

        let summary = summarize_returns(&rows);

        assert_eq!(summary[0].total_return_pct, None);
        assert_eq!(summary[0].moving_average(3).unwrap().return_pct, None);
        assert_eq!(summary[1].moving_average(3).unwrap().return_pct, Some(dec!(2)));
        assert_eq!(summary[1].moving_average(3).unwrap().deposit, dec!(500));
    }
}
