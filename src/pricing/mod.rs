// Pricing module - turns sparse quotes into one price per calendar day

pub mod seed;

use chrono::NaiveDate;
use itertools::Itertools;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use crate::calendar::Calendar;
use crate::db::{DailyPrice, PriceQuote};

/// Densify quotes onto the calendar.
///
/// Each quote is valid over `[quote_date, next_quote_date)`; the last quote of
/// a ticker stays valid until `far_future`. Dates before a ticker's first quote
/// get no row at all. Per ticker this is one merge sweep over the sorted quotes
/// and the calendar dates.
pub fn densify_quotes(
    calendar: &Calendar,
    quotes: &[PriceQuote],
    far_future: NaiveDate,
) -> Vec<DailyPrice> {
    let mut by_ticker: BTreeMap<&str, Vec<&PriceQuote>> = BTreeMap::new();
    for quote in quotes {
        by_ticker.entry(quote.ticker.as_str()).or_default().push(quote);
    }

    let mut prices = Vec::new();
    for (ticker, mut series) in by_ticker {
        // Stable sort keeps the first-ingested row when a date repeats
        series.sort_by_key(|q| q.quote_date);
        let series: Vec<&PriceQuote> = series
            .into_iter()
            .dedup_by(|a, b| a.quote_date == b.quote_date)
            .collect();

        let first = series[0].quote_date;
        let mut idx = 0;
        let before = prices.len();
        for &date in calendar.window(first, far_future) {
            while idx + 1 < series.len() && series[idx + 1].quote_date <= date {
                idx += 1;
            }
            prices.push(DailyPrice {
                ticker: ticker.to_string(),
                date,
                price: series[idx].close_price,
            });
        }
        debug!(
            "Densified {} quotes for {} into {} daily prices",
            series.len(),
            ticker,
            prices.len() - before
        );
    }

    prices
}

/// Lookup over densified prices, keyed by ticker then date
#[derive(Debug, Default, Clone)]
pub struct DailyPriceBook {
    series: HashMap<String, Vec<(NaiveDate, Decimal)>>,
}

impl DailyPriceBook {
    pub fn new(prices: &[DailyPrice]) -> Self {
        let mut series: HashMap<String, Vec<(NaiveDate, Decimal)>> = HashMap::new();
        for p in prices {
            series
                .entry(p.ticker.clone())
                .or_default()
                .push((p.date, p.price));
        }
        for points in series.values_mut() {
            points.sort_by_key(|(date, _)| *date);
        }
        Self { series }
    }

    /// Densified series for a ticker, ordered by date
    pub fn series(&self, ticker: &str) -> &[(NaiveDate, Decimal)] {
        self.series.get(ticker).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn price_on(&self, ticker: &str, date: NaiveDate) -> Option<Decimal> {
        let points = self.series(ticker);
        points
            .binary_search_by_key(&date, |(d, _)| *d)
            .ok()
            .map(|i| points[i].1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn quote(ticker: &str, date: NaiveDate, close: Decimal) -> PriceQuote {
        PriceQuote {
            ticker: ticker.to_string(),
            quote_date: date,
            open_price: close,
            close_price: close,
        }
    }

    #[test]
    fn test_densified_price_is_latest_quote_at_or_before() {
        let cal = Calendar::new(d(2024, 1, 1), d(2024, 1, 10));
        let quotes = vec![
            quote("ITSA4", d(2024, 1, 5), dec!(11)),
            quote("ITSA4", d(2024, 1, 2), dec!(10)),
            quote("ITSA4", d(2024, 1, 8), dec!(12)),
        ];
        let prices = densify_quotes(&cal, &quotes, d(2099, 1, 1));
        let book = DailyPriceBook::new(&prices);

        assert_eq!(book.price_on("ITSA4", d(2024, 1, 1)), None);
        assert_eq!(book.price_on("ITSA4", d(2024, 1, 2)), Some(dec!(10)));
        assert_eq!(book.price_on("ITSA4", d(2024, 1, 4)), Some(dec!(10)));
        assert_eq!(book.price_on("ITSA4", d(2024, 1, 5)), Some(dec!(11)));
        assert_eq!(book.price_on("ITSA4", d(2024, 1, 7)), Some(dec!(11)));
        assert_eq!(book.price_on("ITSA4", d(2024, 1, 10)), Some(dec!(12)));
        assert_eq!(prices.len(), 9);
    }

    #[test]
    fn test_each_ticker_densified_independently() {
        let cal = Calendar::new(d(2024, 1, 1), d(2024, 1, 5));
        let quotes = vec![
            quote("BRL=X", d(2024, 1, 1), dec!(4.9)),
            quote("IVV", d(2024, 1, 4), dec!(470)),
        ];
        let book = DailyPriceBook::new(&densify_quotes(&cal, &quotes, d(2099, 1, 1)));
        assert_eq!(book.series("BRL=X").len(), 5);
        assert_eq!(book.series("IVV").len(), 2);
        assert!(book.series("UNKNOWN").is_empty());
    }

    #[test]
    fn test_duplicate_quote_dates_keep_first_row() {
        let cal = Calendar::new(d(2024, 1, 1), d(2024, 1, 2));
        let quotes = vec![
            quote("NU", d(2024, 1, 1), dec!(5)),
            quote("NU", d(2024, 1, 1), dec!(6)),
        ];
        let prices = densify_quotes(&cal, &quotes, d(2099, 1, 1));
        assert_eq!(prices.len(), 2);
        assert!(prices.iter().all(|p| p.price == dec!(5)));
    }

    #[test]
    fn test_last_window_stops_at_far_future() {
        let cal = Calendar::new(d(2024, 1, 1), d(2024, 1, 10));
        let quotes = vec![quote("X", d(2024, 1, 2), dec!(1))];
        let prices = densify_quotes(&cal, &quotes, d(2024, 1, 6));
        assert_eq!(prices.last().map(|p| p.date), Some(d(2024, 1, 5)));
    }
}
