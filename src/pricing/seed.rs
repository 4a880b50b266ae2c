//! Manual price overrides for instruments without a usable public quote history
//!
//! NU traded privately before its listing; these quarterly marks stand in for
//! the missing history and are merged before densification.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use std::collections::HashSet;
use tracing::debug;

use crate::db::PriceQuote;

static MANUAL_PRICES: Lazy<Vec<PriceQuote>> = Lazy::new(|| {
    // (year, month, day, close in 1e-4 units)
    let marks: [(i32, u32, u32, i64); 7] = [
        (2020, 4, 1, 17354),
        (2020, 7, 1, 17883),
        (2020, 10, 1, 17883),
        (2021, 1, 1, 39783),
        (2021, 4, 1, 39783),
        (2021, 7, 1, 45283),
        (2021, 10, 1, 45283),
    ];
    marks
        .iter()
        .filter_map(|&(y, m, d, close)| {
            let price = Decimal::new(close, 4);
            NaiveDate::from_ymd_opt(y, m, d).map(|quote_date| PriceQuote {
                ticker: "NU".to_string(),
                quote_date,
                open_price: price,
                close_price: price,
            })
        })
        .collect()
});

pub fn manual_prices() -> &'static [PriceQuote] {
    &MANUAL_PRICES
}

/// Insert-or-ignore the manual overrides: an observed quote for the same
/// (ticker, date) always wins. Returns how many seed rows were added.
pub fn merge_manual_prices(quotes: &mut Vec<PriceQuote>) -> usize {
    let existing: HashSet<(String, NaiveDate)> = quotes
        .iter()
        .map(|q| (q.ticker.clone(), q.quote_date))
        .collect();

    let missing: Vec<PriceQuote> = manual_prices()
        .iter()
        .filter(|q| !existing.contains(&(q.ticker.clone(), q.quote_date)))
        .cloned()
        .collect();

    let added = missing.len();
    quotes.extend(missing);
    debug!("Merged {} manual price overrides", added);
    added
}
