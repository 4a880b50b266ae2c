use anyhow::Result;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::db::{Currency, EquityDailyBalance, EquityOperation};
use crate::error::PortfolioError;
use crate::pricing::DailyPriceBook;

/// Build the running, FX-adjusted daily value of every equity position.
///
/// For each ticker the signed amounts are netted per date and folded into a
/// running quantity while walking the ticker's densified price series. A row
/// is emitted only while the running quantity is nonzero.
pub fn build_equity_balances(
    operations: &[EquityOperation],
    prices: &DailyPriceBook,
    fx_ticker: &str,
) -> Result<Vec<EquityDailyBalance>> {
    let mut by_ticker: BTreeMap<&str, Vec<&EquityOperation>> = BTreeMap::new();
    for op in operations {
        by_ticker.entry(op.ticker.as_str()).or_default().push(op);
    }

    let mut balances = Vec::new();
    for (ticker, ops) in by_ticker {
        let currency = ticker_currency(ticker, &ops)?;

        let mut changes: BTreeMap<NaiveDate, Decimal> = BTreeMap::new();
        for op in &ops {
            *changes.entry(op.operation_date).or_insert(Decimal::ZERO) += op.signed_amount();
        }
        let changes: Vec<(NaiveDate, Decimal)> = changes.into_iter().collect();

        let series = prices.series(ticker);
        if series.is_empty() {
            warn!("No quotes for {}, skipping {} operations", ticker, ops.len());
            continue;
        }

        let mut quantity = Decimal::ZERO;
        let mut next_change = 0;
        let mut missing_fx = 0usize;
        for &(date, price) in series {
            let mut amount_change = None;
            while next_change < changes.len() && changes[next_change].0 <= date {
                let (change_date, delta) = changes[next_change];
                quantity += delta;
                if change_date == date {
                    amount_change = Some(delta);
                }
                next_change += 1;
            }

            if quantity.is_zero() {
                continue;
            }

            let fx_price = if currency.is_foreign() {
                match prices.price_on(fx_ticker, date) {
                    Some(fx) => Some(fx),
                    None => {
                        missing_fx += 1;
                        continue;
                    }
                }
            } else {
                None
            };

            let value = price * fx_price.unwrap_or(Decimal::ONE) * quantity;
            balances.push(EquityDailyBalance {
                ticker: ticker.to_string(),
                date,
                price,
                fx_price,
                currency,
                amount_change,
                amount: quantity,
                value,
            });
        }

        if missing_fx > 0 {
            debug!(
                "Skipped {} days of {} without a {} quote",
                missing_fx, ticker, fx_ticker
            );
        }
    }

    Ok(balances)
}

fn ticker_currency(ticker: &str, ops: &[&EquityOperation]) -> Result<Currency> {
    let currency = ops[0].currency;
    if let Some(other) = ops.iter().find(|op| op.currency != currency) {
        return Err(PortfolioError::Validation(format!(
            "ticker {} mixes currencies {} and {}",
            ticker,
            currency.as_str(),
            other.currency.as_str()
        ))
        .into());
    }
    Ok(currency)
}
