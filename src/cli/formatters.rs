//! Terminal and JSON rendering of rebuild results and return reports

use carteira::db::{MonthlyReturn, SummaryReturn};
use carteira::pipeline::RebuildStats;
use carteira::reports::MOVING_AVERAGE_WINDOWS;
use carteira::utils::{format_currency, format_percent};
use colored::Colorize;
use rust_decimal::Decimal;
use serde::Serialize;
use tabled::{
    settings::{object::Columns, Alignment, Style},
    Table, Tabled,
};

fn colored_money(value: Decimal) -> String {
    let text = format_currency(value);
    if value >= Decimal::ZERO {
        text.green().to_string()
    } else {
        text.red().to_string()
    }
}

fn colored_percent(value: Option<Decimal>) -> String {
    let text = format_percent(value);
    match value {
        Some(v) if v >= Decimal::ZERO => text.green().to_string(),
        Some(_) => text.red().to_string(),
        None => text.bright_black().to_string(),
    }
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| format!(r#"{{"error": "JSON serialization failed: {}"}}"#, e))
}

pub fn format_rebuild_json(stats: &RebuildStats) -> String {
    to_json(stats)
}

pub fn format_rebuild_table(stats: &RebuildStats) -> String {
    #[derive(Tabled)]
    struct CountRow {
        #[tabled(rename = "Table")]
        table: &'static str,
        #[tabled(rename = "Rows")]
        rows: usize,
    }

    let rows = vec![
        CountRow { table: "dates", rows: stats.dates },
        CountRow { table: "daily_asset_price", rows: stats.daily_prices },
        CountRow { table: "variable_income_daily_balance", rows: stats.equity_balances },
        CountRow { table: "fixed_income_daily_balance", rows: stats.fixed_income_balances },
        CountRow { table: "fgts_daily_balance", rows: stats.fgts_balances },
        CountRow { table: "daily_balance", rows: stats.daily_balances },
        CountRow { table: "operations", rows: stats.cash_flows },
        CountRow { table: "financial_returns", rows: stats.monthly_returns },
        CountRow { table: "summary_returns", rows: stats.summary_returns },
    ];

    let mut table = Table::new(&rows);
    table.with(Style::modern());
    table.modify(Columns::new(1..), Alignment::right());

    let as_of = stats
        .as_of
        .map(|d| d.to_string())
        .unwrap_or_else(|| "-".to_string());
    format!(
        "\n{} Rebuild as of {}\n\n{}\n",
        "✓".green().bold(),
        as_of.bold(),
        table
    )
}

pub fn format_returns_json(returns: &[MonthlyReturn]) -> String {
    to_json(&returns)
}

pub fn format_returns_table(returns: &[MonthlyReturn]) -> String {
    #[derive(Tabled)]
    struct ReturnRow {
        #[tabled(rename = "Month")]
        month: String,
        #[tabled(rename = "Asset")]
        asset: String,
        #[tabled(rename = "Start")]
        start: String,
        #[tabled(rename = "End")]
        end: String,
        #[tabled(rename = "Deposit")]
        deposit: String,
        #[tabled(rename = "Profit")]
        profit: String,
        #[tabled(rename = "Return")]
        return_pct: String,
    }

    let rows: Vec<ReturnRow> = returns
        .iter()
        .map(|r| ReturnRow {
            month: format!("{}-{:02}", r.year, r.month),
            asset: r.asset.clone(),
            start: format_currency(r.start_value),
            end: format_currency(r.end_value),
            deposit: format_currency(r.deposit),
            profit: colored_money(r.profit),
            return_pct: colored_percent(r.relative_return_pct),
        })
        .collect();

    let mut table = Table::new(&rows);
    table.with(Style::modern());
    table.modify(Columns::new(2..), Alignment::right());

    let total_profit: Decimal = returns.iter().map(|r| r.profit).sum();
    format!(
        "\n{} Monthly returns\n\n{}\n\n{:<20} {}\n",
        "📈".cyan().bold(),
        table,
        "Total profit:".bold(),
        colored_money(total_profit)
    )
}

pub fn format_summary_json(summary: &[SummaryReturn]) -> String {
    to_json(&summary)
}

pub fn format_summary_table(summary: &[SummaryReturn]) -> String {
    #[derive(Tabled)]
    struct SummaryRow {
        #[tabled(rename = "Month")]
        month: String,
        #[tabled(rename = "Balance")]
        end_value: String,
        #[tabled(rename = "Deposit")]
        deposit: String,
        #[tabled(rename = "Profit")]
        profit: String,
        #[tabled(rename = "Return")]
        return_pct: String,
        #[tabled(rename = "Avg profit 3m")]
        profit_3: String,
        #[tabled(rename = "Avg return 3m")]
        return_3: String,
        #[tabled(rename = "Avg return 12m")]
        return_12: String,
    }

    let shortest = MOVING_AVERAGE_WINDOWS[0];
    let longest = MOVING_AVERAGE_WINDOWS[MOVING_AVERAGE_WINDOWS.len() - 1];

    let rows: Vec<SummaryRow> = summary
        .iter()
        .map(|s| {
            let short = s.moving_average(shortest);
            let long = s.moving_average(longest);
            SummaryRow {
                month: format!("{}-{:02}", s.year, s.month),
                end_value: format_currency(s.end_value),
                deposit: format_currency(s.total_deposit),
                profit: colored_money(s.total_profit),
                return_pct: colored_percent(s.total_return_pct),
                profit_3: short
                    .map(|m| format_currency(m.profit))
                    .unwrap_or_else(|| "-".to_string()),
                return_3: colored_percent(short.and_then(|m| m.return_pct)),
                return_12: colored_percent(long.and_then(|m| m.return_pct)),
            }
        })
        .collect();

    let mut table = Table::new(&rows);
    table.with(Style::modern());
    table.modify(Columns::new(1..), Alignment::right());

    format!("\n{} Portfolio summary\n\n{}\n", "📊".cyan().bold(), table)
}

pub fn format_no_returns() -> String {
    format!(
        "{} No returns found\nLoad operations and run: {} rebuild\n",
        "ℹ".blue().bold(),
        "carteira".bold()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_return() -> MonthlyReturn {
        MonthlyReturn {
            asset: "BOVA11".to_string(),
            year: 2023,
            month: 2,
            start_value: dec!(10000),
            end_value: dec!(11000),
            deposit: dec!(500),
            net_increase: dec!(1000),
            profit: dec!(500),
            relative_return_pct: Some(dec!(5)),
        }
    }

    #[test]
    fn test_no_returns_message() {
        let msg = format_no_returns();
        assert!(msg.contains("No returns found"));
        assert!(msg.contains("rebuild"));
    }

    #[test]
    fn test_returns_table_uses_brazilian_format() {
        colored::control::set_override(false);
        let out = format_returns_table(&[sample_return()]);
        assert!(out.contains("2023-02"));
        assert!(out.contains("R$ 10.000,00"));
        assert!(out.contains("5,00%"));
    }

    #[test]
    fn test_returns_json_keeps_decimal_precision() {
        let json = format_returns_json(&[sample_return()]);
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed[0]["asset"], "BOVA11");
        assert_eq!(parsed[0]["relative_return_pct"], "5");
    }
}
