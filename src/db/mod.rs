// Database module - SQLite connection, input tables and derived-table commits

pub mod models;

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::info;

use crate::error::PortfolioError;
use crate::pipeline::DerivedSnapshot;
use crate::reports::MOVING_AVERAGE_WINDOWS;
pub use models::{
    BalanceClass, CashFlow, Currency, DailyBalance, DailyPrice, EquityDailyBalance,
    EquityOperation, FgtsDailyBalance, FgtsEvent, FinancialIndex, FixedIncomeDailyBalance,
    FixedIncomeDeposit, IndexFactor, MonthlyReturn, MovingAverages, OperationType,
    PortfolioInputs, PriceQuote, SummaryReturn,
};

/// Tables fully rewritten by every rebuild, in dependency order
pub const DERIVED_TABLES: [&str; 9] = [
    "dates",
    "daily_asset_price",
    "variable_income_daily_balance",
    "fixed_income_daily_balance",
    "fgts_daily_balance",
    "daily_balance",
    "operations",
    "financial_returns",
    "summary_returns",
];

/// Get the default database path (~/.carteira/data.db)
pub fn get_default_db_path() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    let carteira_dir = PathBuf::from(home).join(".carteira");

    std::fs::create_dir_all(&carteira_dir).context("Failed to create .carteira directory")?;

    Ok(carteira_dir.join("data.db"))
}

/// Open database connection
pub fn open_db(db_path: Option<PathBuf>) -> Result<Connection> {
    let path = match db_path {
        Some(path) => path,
        None => get_default_db_path()?,
    };
    let conn = Connection::open(&path).context(format!("Failed to open database at {:?}", path))?;

    conn.execute("PRAGMA foreign_keys = ON", [])
        .context("Failed to enable foreign keys")?;

    Ok(conn)
}

/// Initialize the database with schema
///
/// Safe to run on an existing database: every statement is `IF NOT EXISTS`.
pub fn init_database(db_path: Option<PathBuf>) -> Result<()> {
    let path = match db_path {
        Some(path) => path,
        None => get_default_db_path()?,
    };

    info!("Initializing database at: {:?}", path);

    let conn = open_db(Some(path))?;
    create_schema(&conn)?;

    info!("Database initialized successfully");
    Ok(())
}

/// Run the schema SQL on an open connection
pub fn create_schema(conn: &Connection) -> Result<()> {
    let schema_sql = include_str!("schema.sql");
    conn.execute_batch(schema_sql)
        .context("Failed to execute schema")?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Input writers
// ---------------------------------------------------------------------------

/// Insert equity operation
pub fn insert_equity_operation(conn: &Connection, op: &EquityOperation) -> Result<i64> {
    conn.execute(
        "INSERT INTO variable_income_operations (
            ticker, operation_type, operation_date, amount, price, currency
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            op.ticker,
            op.operation_type.as_str(),
            op.operation_date,
            op.amount.to_string(),
            op.price.to_string(),
            op.currency.as_str(),
        ],
    )?;

    Ok(conn.last_insert_rowid())
}

/// Insert fixed-income purchase or redemption lot
pub fn insert_fixed_income_deposit(conn: &Connection, lot: &FixedIncomeDeposit) -> Result<i64> {
    conn.execute(
        "INSERT INTO fixed_income_operations (
            asset, operation_type, quotas, purchase_date, due_date, financial_index,
            value, pre_rate, post_rate, tax_rate, is_pgbl
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            lot.asset,
            lot.operation_type.as_str(),
            lot.quotas.to_string(),
            lot.purchase_date,
            lot.due_date,
            lot.financial_index.as_str(),
            lot.value.to_string(),
            lot.pre_rate.to_string(),
            lot.post_rate.to_string(),
            lot.tax_rate.to_string(),
            lot.is_pgbl,
        ],
    )?;

    Ok(conn.last_insert_rowid())
}

/// Insert quote unless one already exists for (ticker, date).
/// Returns whether a row was written.
pub fn insert_price_quote(conn: &Connection, quote: &PriceQuote) -> Result<bool> {
    let changed = conn.execute(
        "INSERT OR IGNORE INTO asset_price (ticker, date, open_price, close_price)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            quote.ticker,
            quote.quote_date,
            quote.open_price.to_string(),
            quote.close_price.to_string(),
        ],
    )?;

    Ok(changed > 0)
}

/// Insert or replace an index factor
pub fn insert_index_factor(conn: &Connection, factor: &IndexFactor) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO index_series (financial_index, date, factor)
         VALUES (?1, ?2, ?3)",
        params![
            factor.financial_index.as_str(),
            factor.date,
            factor.factor.to_string(),
        ],
    )?;

    Ok(())
}

/// Insert FGTS statement line
pub fn insert_fgts_event(conn: &Connection, event: &FgtsEvent) -> Result<i64> {
    conn.execute(
        "INSERT INTO fgts_operations (date, company, operation, value, balance)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            event.date,
            event.company,
            event.operation,
            event.value.to_string(),
            event.balance.to_string(),
        ],
    )?;

    Ok(conn.last_insert_rowid())
}

// ---------------------------------------------------------------------------
// Input readers
// ---------------------------------------------------------------------------

/// Read every input table in ingestion order
pub fn load_inputs(conn: &Connection) -> Result<PortfolioInputs> {
    Ok(PortfolioInputs {
        operations: load_equity_operations(conn)?,
        deposits: load_fixed_income_deposits(conn)?,
        quotes: load_price_quotes(conn)?,
        index_factors: load_index_factors(conn)?,
        fgts_events: load_fgts_events(conn)?,
    })
}

pub fn load_equity_operations(conn: &Connection) -> Result<Vec<EquityOperation>> {
    let mut stmt = conn.prepare(
        "SELECT ticker, operation_type, operation_date, amount, price, currency
         FROM variable_income_operations
         ORDER BY id",
    )?;

    let rows = stmt.query_map([], |row| {
        Ok(EquityOperation {
            ticker: row.get(0)?,
            operation_type: get_enum_value(row, 1)?,
            operation_date: row.get(2)?,
            amount: get_decimal_value(row, 3)?,
            price: get_decimal_value(row, 4)?,
            currency: get_enum_value(row, 5)?,
        })
    })?;

    rows.collect::<Result<Vec<_>, _>>()
        .context("Failed to read variable_income_operations")
}

pub fn load_fixed_income_deposits(conn: &Connection) -> Result<Vec<FixedIncomeDeposit>> {
    let mut stmt = conn.prepare(
        "SELECT asset, operation_type, quotas, purchase_date, due_date, financial_index,
                value, pre_rate, post_rate, tax_rate, is_pgbl
         FROM fixed_income_operations
         ORDER BY id",
    )?;

    let rows = stmt.query_map([], |row| {
        Ok(FixedIncomeDeposit {
            asset: row.get(0)?,
            operation_type: get_enum_value(row, 1)?,
            quotas: get_optional_decimal_value(row, 2)?.unwrap_or(Decimal::ZERO),
            purchase_date: row.get(3)?,
            due_date: row.get(4)?,
            financial_index: get_enum_value(row, 5)?,
            value: get_decimal_value(row, 6)?,
            pre_rate: get_optional_decimal_value(row, 7)?.unwrap_or(Decimal::ZERO),
            post_rate: get_optional_decimal_value(row, 8)?.unwrap_or(Decimal::ZERO),
            tax_rate: get_optional_decimal_value(row, 9)?.unwrap_or(Decimal::ZERO),
            is_pgbl: row.get(10)?,
        })
    })?;

    rows.collect::<Result<Vec<_>, _>>()
        .context("Failed to read fixed_income_operations")
}

pub fn load_price_quotes(conn: &Connection) -> Result<Vec<PriceQuote>> {
    let mut stmt = conn.prepare(
        "SELECT ticker, date, open_price, close_price
         FROM asset_price
         ORDER BY ticker, date",
    )?;

    let rows = stmt.query_map([], |row| {
        Ok(PriceQuote {
            ticker: row.get(0)?,
            quote_date: row.get(1)?,
            open_price: get_decimal_value(row, 2)?,
            close_price: get_decimal_value(row, 3)?,
        })
    })?;

    rows.collect::<Result<Vec<_>, _>>()
        .context("Failed to read asset_price")
}

pub fn load_index_factors(conn: &Connection) -> Result<Vec<IndexFactor>> {
    let mut stmt = conn.prepare(
        "SELECT financial_index, date, factor
         FROM index_series
         ORDER BY financial_index, date",
    )?;

    let rows = stmt.query_map([], |row| {
        Ok(IndexFactor {
            financial_index: get_enum_value(row, 0)?,
            date: row.get(1)?,
            factor: get_decimal_value(row, 2)?,
        })
    })?;

    rows.collect::<Result<Vec<_>, _>>()
        .context("Failed to read index_series")
}

pub fn load_fgts_events(conn: &Connection) -> Result<Vec<FgtsEvent>> {
    let mut stmt = conn.prepare(
        "SELECT date, company, operation, value, balance
         FROM fgts_operations
         ORDER BY date, id",
    )?;

    let rows = stmt.query_map([], |row| {
        Ok(FgtsEvent {
            date: row.get(0)?,
            company: row.get(1)?,
            operation: row.get(2)?,
            value: get_optional_decimal_value(row, 3)?.unwrap_or(Decimal::ZERO),
            balance: get_decimal_value(row, 4)?,
        })
    })?;

    rows.collect::<Result<Vec<_>, _>>()
        .context("Failed to read fgts_operations")
}

// ---------------------------------------------------------------------------
// Derived tables
// ---------------------------------------------------------------------------

/// Replace every derived table with the snapshot in one transaction.
///
/// On any error the transaction is dropped and rolled back, so readers keep
/// seeing the previous rebuild.
pub fn replace_derived(conn: &mut Connection, snapshot: &DerivedSnapshot) -> Result<()> {
    let tx = conn.transaction()?;

    for table in DERIVED_TABLES {
        tx.execute(&format!("DELETE FROM {}", table), [])
            .with_context(|| format!("Failed to clear {}", table))?;
    }

    {
        let mut stmt = tx.prepare("INSERT INTO dates (date) VALUES (?1)")?;
        for date in &snapshot.dates {
            stmt.execute([date])?;
        }
    }

    {
        let mut stmt =
            tx.prepare("INSERT INTO daily_asset_price (ticker, date, price) VALUES (?1, ?2, ?3)")?;
        for p in &snapshot.daily_prices {
            stmt.execute(params![p.ticker, p.date, p.price.to_string()])?;
        }
    }

    {
        let mut stmt = tx.prepare(
            "INSERT INTO variable_income_daily_balance (
                ticker, date, price, fx_price, currency, amount_change, amount, value
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )?;
        for b in &snapshot.equity_balances {
            stmt.execute(params![
                b.ticker,
                b.date,
                b.price.to_string(),
                b.fx_price.as_ref().map(|d| d.to_string()),
                b.currency.as_str(),
                b.amount_change.as_ref().map(|d| d.to_string()),
                b.amount.to_string(),
                b.value.to_string(),
            ])?;
        }
    }

    {
        let mut stmt = tx.prepare(
            "INSERT INTO fixed_income_daily_balance (
                asset, due_date, date, tax_rate, deposit_value, gross_value, tax_value, net_value
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )?;
        for b in &snapshot.fixed_income_balances {
            stmt.execute(params![
                b.asset,
                b.due_date,
                b.date,
                b.tax_rate.to_string(),
                b.deposit_value.to_string(),
                b.gross_value.to_string(),
                b.tax_value.to_string(),
                b.net_value.to_string(),
            ])?;
        }
    }

    {
        let mut stmt =
            tx.prepare("INSERT INTO fgts_daily_balance (date, balance) VALUES (?1, ?2)")?;
        for b in &snapshot.fgts_balances {
            stmt.execute(params![b.date, b.balance.to_string()])?;
        }
    }

    {
        let mut stmt = tx.prepare(
            "INSERT INTO daily_balance (asset, date, value, class) VALUES (?1, ?2, ?3, ?4)",
        )?;
        for b in &snapshot.daily_balances {
            stmt.execute(params![b.asset, b.date, b.value.to_string(), b.class.as_str()])?;
        }
    }

    {
        let mut stmt = tx.prepare(
            "INSERT INTO operations (
                asset, operation_type, operation_date, value, currency, fx_price
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )?;
        for f in &snapshot.cash_flows {
            stmt.execute(params![
                f.asset,
                f.operation_type.as_str(),
                f.operation_date,
                f.value.to_string(),
                f.currency.as_str(),
                f.fx_price.as_ref().map(|d| d.to_string()),
            ])?;
        }
    }

    {
        let mut stmt = tx.prepare(
            "INSERT INTO financial_returns (
                asset, year, month, start_value, end_value, deposit,
                net_increase, profit, relative_return_pct
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        )?;
        for r in &snapshot.monthly_returns {
            stmt.execute(params![
                r.asset,
                r.year,
                r.month,
                r.start_value.to_string(),
                r.end_value.to_string(),
                r.deposit.to_string(),
                r.net_increase.to_string(),
                r.profit.to_string(),
                r.relative_return_pct.as_ref().map(|d| d.to_string()),
            ])?;
        }
    }

    {
        let mut stmt = tx.prepare(
            "INSERT INTO summary_returns (
                year, month, end_value, total_deposit, total_profit, total_return_pct,
                avg_deposit_3, avg_profit_3, avg_return_3,
                avg_deposit_6, avg_profit_6, avg_return_6,
                avg_deposit_9, avg_profit_9, avg_return_9,
                avg_deposit_12, avg_profit_12, avg_return_12
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)",
        )?;
        for s in &snapshot.summary_returns {
            let mut values: Vec<Option<String>> = vec![
                Some(s.end_value.to_string()),
                Some(s.total_deposit.to_string()),
                Some(s.total_profit.to_string()),
                s.total_return_pct.as_ref().map(|d| d.to_string()),
            ];
            for months in MOVING_AVERAGE_WINDOWS {
                let avg = s.moving_average(months).ok_or_else(|| {
                    PortfolioError::Validation(format!(
                        "summary {}-{:02} lacks its {}-month average",
                        s.year, s.month, months
                    ))
                })?;
                values.push(Some(avg.deposit.to_string()));
                values.push(Some(avg.profit.to_string()));
                values.push(avg.return_pct.as_ref().map(|d| d.to_string()));
            }

            let mut bound: Vec<&dyn rusqlite::ToSql> = vec![&s.year, &s.month];
            bound.extend(values.iter().map(|v| v as &dyn rusqlite::ToSql));
            stmt.execute(bound.as_slice())?;
        }
    }

    if let Some(as_of) = snapshot.as_of {
        set_metadata(&tx, "last_rebuild_as_of", &as_of.to_string())?;
    }
    set_metadata(&tx, "last_rebuild_at", &Utc::now().to_rfc3339())?;

    tx.commit().context("Failed to commit rebuild")?;
    info!(
        "Replaced derived tables: {} daily balances, {} monthly returns",
        snapshot.daily_balances.len(),
        snapshot.monthly_returns.len()
    );
    Ok(())
}

/// Monthly returns, oldest first, optionally narrowed to one asset or year
pub fn load_monthly_returns(
    conn: &Connection,
    asset: Option<&str>,
    year: Option<i32>,
) -> Result<Vec<MonthlyReturn>> {
    let mut stmt = conn.prepare(
        "SELECT asset, year, month, start_value, end_value, deposit,
                net_increase, profit, relative_return_pct
         FROM financial_returns
         WHERE (?1 IS NULL OR asset = ?1)
           AND (?2 IS NULL OR year = ?2)
         ORDER BY year, month, asset",
    )?;

    let rows = stmt.query_map(params![asset, year], |row| {
        Ok(MonthlyReturn {
            asset: row.get(0)?,
            year: row.get(1)?,
            month: row.get(2)?,
            start_value: get_decimal_value(row, 3)?,
            end_value: get_decimal_value(row, 4)?,
            deposit: get_decimal_value(row, 5)?,
            net_increase: get_decimal_value(row, 6)?,
            profit: get_decimal_value(row, 7)?,
            relative_return_pct: get_optional_decimal_value(row, 8)?,
        })
    })?;

    rows.collect::<Result<Vec<_>, _>>()
        .context("Failed to read financial_returns")
}

/// Portfolio summary, oldest first
pub fn load_summary_returns(conn: &Connection) -> Result<Vec<SummaryReturn>> {
    let mut stmt = conn.prepare(
        "SELECT year, month, end_value, total_deposit, total_profit, total_return_pct,
                avg_deposit_3, avg_profit_3, avg_return_3,
                avg_deposit_6, avg_profit_6, avg_return_6,
                avg_deposit_9, avg_profit_9, avg_return_9,
                avg_deposit_12, avg_profit_12, avg_return_12
         FROM summary_returns
         ORDER BY year, month",
    )?;

    let rows = stmt.query_map([], |row| {
        let mut moving_averages = Vec::with_capacity(MOVING_AVERAGE_WINDOWS.len());
        for (i, months) in MOVING_AVERAGE_WINDOWS.into_iter().enumerate() {
            let base = 6 + i * 3;
            moving_averages.push(MovingAverages {
                months,
                deposit: get_decimal_value(row, base)?,
                profit: get_decimal_value(row, base + 1)?,
                return_pct: get_optional_decimal_value(row, base + 2)?,
            });
        }

        Ok(SummaryReturn {
            year: row.get(0)?,
            month: row.get(1)?,
            end_value: get_decimal_value(row, 2)?,
            total_deposit: get_decimal_value(row, 3)?,
            total_profit: get_decimal_value(row, 4)?,
            total_return_pct: get_optional_decimal_value(row, 5)?,
            moving_averages,
        })
    })?;

    rows.collect::<Result<Vec<_>, _>>()
        .context("Failed to read summary_returns")
}

/// Number of rows in a table
pub fn count_rows(conn: &Connection, table: &str) -> Result<i64> {
    let count = conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
        row.get(0)
    })?;
    Ok(count)
}

pub fn get_metadata(conn: &Connection, key: &str) -> Result<Option<String>> {
    let value = conn
        .query_row(
            "SELECT value FROM metadata WHERE key = ?1",
            [key],
            |row| row.get(0),
        )
        .optional()?;
    Ok(value)
}

pub fn set_metadata(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
        params![key, value],
    )?;
    Ok(())
}

/// Last as-of date a rebuild committed, if any
pub fn last_rebuild_as_of(conn: &Connection) -> Result<Option<NaiveDate>> {
    let Some(raw) = get_metadata(conn, "last_rebuild_as_of")? else {
        return Ok(None);
    };
    let date = NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|e| {
        PortfolioError::Parse(format!("bad last_rebuild_as_of '{}': {}", raw, e))
    })?;
    Ok(Some(date))
}

/// Helper to read Decimal from SQLite (handles both INTEGER, REAL and TEXT)
pub fn get_decimal_value(row: &rusqlite::Row, idx: usize) -> Result<Decimal, rusqlite::Error> {
    use rusqlite::types::ValueRef;

    match row.get_ref(idx)? {
        ValueRef::Text(bytes) => {
            let s = std::str::from_utf8(bytes)
                .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
            parse_decimal_text(s)
                .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
        }
        ValueRef::Integer(i) => Ok(Decimal::from(i)),
        ValueRef::Real(f) => {
            Decimal::try_from(f).map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
        }
        _ => Err(rusqlite::Error::InvalidColumnType(
            idx,
            "decimal".to_string(),
            rusqlite::types::Type::Null,
        )),
    }
}

/// Helper to read optional Decimal from SQLite
pub fn get_optional_decimal_value(
    row: &rusqlite::Row,
    idx: usize,
) -> Result<Option<Decimal>, rusqlite::Error> {
    use rusqlite::types::ValueRef;

    match row.get_ref(idx)? {
        ValueRef::Null => Ok(None),
        _ => get_decimal_value(row, idx).map(Some),
    }
}

/// Plain or scientific notation; SQLite's REAL-to-TEXT casts produce the latter
fn parse_decimal_text(s: &str) -> Result<Decimal, rust_decimal::Error> {
    let s = s.trim();
    Decimal::from_str(s).or_else(|_| Decimal::from_scientific(s))
}

/// Helper to parse an enum column through its `FromStr`
fn get_enum_value<T>(row: &rusqlite::Row, idx: usize) -> Result<T, rusqlite::Error>
where
    T: FromStr<Err = PortfolioError>,
{
    let raw: String = row.get(idx)?;
    raw.parse::<T>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}
