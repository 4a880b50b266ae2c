use tracing::warn;

use crate::db::{CashFlow, Currency, EquityOperation, FixedIncomeDeposit};
use crate::pricing::DailyPriceBook;

/// Unified ledger of money moved into and out of every asset, in BRL.
///
/// Fixed-income lots contribute their principal; equity operations contribute
/// `amount * price`, converted with the FX quote of the operation date when
/// the ticker trades in dollars. Buys are positive, sells negative.
pub fn build_cash_flows(
    operations: &[EquityOperation],
    deposits: &[FixedIncomeDeposit],
    prices: &DailyPriceBook,
    fx_ticker: &str,
) -> Vec<CashFlow> {
    let mut flows: Vec<CashFlow> = deposits
        .iter()
        .map(|lot| CashFlow {
            asset: lot.asset.clone(),
            operation_type: lot.operation_type,
            operation_date: lot.purchase_date,
            value: lot.signed_value(),
            currency: Currency::Real,
            fx_price: None,
        })
        .collect();

    for op in operations {
        let local = op.amount * op.price * op.operation_type.sign();
        let fx_price = prices.price_on(fx_ticker, op.operation_date);

        let value = match (op.currency.is_foreign(), fx_price) {
            (false, _) => local,
            (true, Some(fx)) => local * fx,
            (true, None) => {
                warn!(
                    "No {} quote on {}, leaving {} {} out of the cash flows",
                    fx_ticker,
                    op.operation_date,
                    op.operation_type.as_str(),
                    op.ticker
                );
                continue;
            }
        };

        flows.push(CashFlow {
            asset: op.ticker.clone(),
            operation_type: op.operation_type,
            operation_date: op.operation_date,
            value,
            currency: op.currency,
            fx_price,
        });
    }

    flows.sort_by(|a, b| {
        a.operation_date
            .cmp(&b.operation_date)
            .then_with(|| a.asset.cmp(&b.asset))
    });
    flows
}
