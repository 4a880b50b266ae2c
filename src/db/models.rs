use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::PortfolioError;

/// Operation type (buy or sell), shared by equity operations and fixed-income lots
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum OperationType {
    Buy,
    Sell,
}

impl OperationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationType::Buy => "buy",
            OperationType::Sell => "sell",
        }
    }

    /// +1 for buys, -1 for sells
    pub fn sign(&self) -> Decimal {
        match self {
            OperationType::Buy => Decimal::ONE,
            OperationType::Sell => Decimal::NEGATIVE_ONE,
        }
    }
}

impl FromStr for OperationType {
    type Err = PortfolioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "buy" | "compra" | "c" => Ok(OperationType::Buy),
            "sell" | "venda" | "v" => Ok(OperationType::Sell),
            other => Err(PortfolioError::Parse(format!(
                "unknown operation type '{}'",
                other
            ))),
        }
    }
}

/// Settlement currency of an equity ticker
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Currency {
    Real,
    Dolar,
}

impl Currency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::Real => "real",
            Currency::Dolar => "dolar",
        }
    }

    /// Foreign currencies are converted to BRL through the FX quote series
    pub fn is_foreign(&self) -> bool {
        matches!(self, Currency::Dolar)
    }
}

impl FromStr for Currency {
    type Err = PortfolioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "real" | "brl" | "r$" => Ok(Currency::Real),
            "dolar" | "dollar" | "usd" | "us$" => Ok(Currency::Dolar),
            other => Err(PortfolioError::Parse(format!("unknown currency '{}'", other))),
        }
    }
}

/// Rate index a fixed-income lot is linked to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FinancialIndex {
    Cdi,
    Ipca,
    Pre,
    Post,
    None,
}

impl FinancialIndex {
    pub fn as_str(&self) -> &'static str {
        match self {
            FinancialIndex::Cdi => "cdi",
            FinancialIndex::Ipca => "ipca",
            FinancialIndex::Pre => "pre",
            FinancialIndex::Post => "post",
            FinancialIndex::None => "none",
        }
    }
}

impl FromStr for FinancialIndex {
    type Err = PortfolioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cdi" | "di" => Ok(FinancialIndex::Cdi),
            "ipca" => Ok(FinancialIndex::Ipca),
            "pre" | "prefixado" => Ok(FinancialIndex::Pre),
            "post" | "pos" => Ok(FinancialIndex::Post),
            "" | "none" => Ok(FinancialIndex::None),
            other => Err(PortfolioError::Parse(format!(
                "unknown financial index '{}'",
                other
            ))),
        }
    }
}

/// Instrument class tag on the unified daily balance
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BalanceClass {
    Equity,
    FixedIncome,
}

impl BalanceClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            BalanceClass::Equity => "equity",
            BalanceClass::FixedIncome => "fixed_income",
        }
    }
}

impl fmt::Display for BalanceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BalanceClass {
    type Err = PortfolioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "equity" => Ok(BalanceClass::Equity),
            "fixed_income" => Ok(BalanceClass::FixedIncome),
            other => Err(PortfolioError::Parse(format!(
                "unknown balance class '{}'",
                other
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// Observed quote for a ticker (sparse: trading days or manual entries)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub ticker: String,
    pub quote_date: NaiveDate,
    pub open_price: Decimal,
    pub close_price: Decimal,
}

/// Equity buy/sell event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityOperation {
    pub ticker: String,
    pub operation_type: OperationType,
    pub operation_date: NaiveDate,
    pub amount: Decimal,
    pub price: Decimal,
    pub currency: Currency,
}

impl EquityOperation {
    /// Quantity with buy/sell sign applied
    pub fn signed_amount(&self) -> Decimal {
        self.amount * self.operation_type.sign()
    }
}

/// Purchase or redemption lot of a fixed-income asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixedIncomeDeposit {
    pub asset: String,
    pub operation_type: OperationType,
    pub quotas: Decimal,
    pub purchase_date: NaiveDate,
    pub due_date: NaiveDate,
    pub financial_index: FinancialIndex,
    pub value: Decimal,
    pub pre_rate: Decimal,
    pub post_rate: Decimal,
    pub tax_rate: Decimal,
    pub is_pgbl: bool,
}

impl FixedIncomeDeposit {
    pub fn signed_value(&self) -> Decimal {
        self.value * self.operation_type.sign()
    }

    pub fn signed_quotas(&self) -> Decimal {
        self.quotas * self.operation_type.sign()
    }
}

/// Published factor of a rate index (daily for CDI, monthly percentage for IPCA)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexFactor {
    pub financial_index: FinancialIndex,
    pub date: NaiveDate,
    pub factor: Decimal,
}

/// Monthly FGTS statement line for one employer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FgtsEvent {
    pub date: NaiveDate,
    pub company: String,
    pub operation: String,
    pub value: Decimal,
    pub balance: Decimal,
}

/// Everything a rebuild reads, taken from one consistent snapshot
#[derive(Debug, Clone, Default)]
pub struct PortfolioInputs {
    pub operations: Vec<EquityOperation>,
    pub deposits: Vec<FixedIncomeDeposit>,
    pub quotes: Vec<PriceQuote>,
    pub index_factors: Vec<IndexFactor>,
    pub fgts_events: Vec<FgtsEvent>,
}

impl PortfolioInputs {
    /// Earliest equity operation or fixed-income purchase date
    pub fn earliest_operation_date(&self) -> Option<NaiveDate> {
        let equity = self.operations.iter().map(|o| o.operation_date);
        let fixed = self.deposits.iter().map(|d| d.purchase_date);
        equity.chain(fixed).min()
    }
}

// ---------------------------------------------------------------------------
// Derived rows
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyPrice {
    pub ticker: String,
    pub date: NaiveDate,
    pub price: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityDailyBalance {
    pub ticker: String,
    pub date: NaiveDate,
    pub price: Decimal,
    pub fx_price: Option<Decimal>,
    pub currency: Currency,
    pub amount_change: Option<Decimal>,
    pub amount: Decimal,
    pub value: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixedIncomeDailyBalance {
    pub asset: String,
    pub due_date: NaiveDate,
    pub date: NaiveDate,
    pub tax_rate: Decimal,
    pub deposit_value: Decimal,
    pub gross_value: Decimal,
    pub tax_value: Decimal,
    pub net_value: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FgtsDailyBalance {
    pub date: NaiveDate,
    pub balance: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyBalance {
    pub asset: String,
    pub date: NaiveDate,
    pub value: Decimal,
    pub class: BalanceClass,
}

/// Signed, BRL-converted money movement into (positive) or out of (negative) an asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashFlow {
    pub asset: String,
    pub operation_type: OperationType,
    pub operation_date: NaiveDate,
    pub value: Decimal,
    pub currency: Currency,
    pub fx_price: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyReturn {
    pub asset: String,
    pub year: i32,
    pub month: u32,
    pub start_value: Decimal,
    pub end_value: Decimal,
    pub deposit: Decimal,
    pub net_increase: Decimal,
    pub profit: Decimal,
    /// None when the month started from a zero balance
    pub relative_return_pct: Option<Decimal>,
}

/// Trailing simple averages of the portfolio totals over `months` summary rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovingAverages {
    pub months: usize,
    pub deposit: Decimal,
    pub profit: Decimal,
    pub return_pct: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryReturn {
    pub year: i32,
    pub month: u32,
    pub end_value: Decimal,
    pub total_deposit: Decimal,
    pub total_profit: Decimal,
    pub total_return_pct: Option<Decimal>,
    pub moving_averages: Vec<MovingAverages>,
}

impl SummaryReturn {
    pub fn moving_average(&self, months: usize) -> Option<&MovingAverages> {
        self.moving_averages.iter().find(|m| m.months == months)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_operation_type_parsing_accepts_portuguese() {
        assert_eq!("compra".parse::<OperationType>().unwrap(), OperationType::Buy);
        assert_eq!("SELL".parse::<OperationType>().unwrap(), OperationType::Sell);
        assert!("hold".parse::<OperationType>().is_err());
    }

    #[test]
    fn test_currency_defaults_blank_to_real() {
        assert_eq!("".parse::<Currency>().unwrap(), Currency::Real);
        assert!("dolar".parse::<Currency>().unwrap().is_foreign());
    }

    #[test]
    fn test_financial_index_round_trips_storage_names() {
        for index in [
            FinancialIndex::Cdi,
            FinancialIndex::Ipca,
            FinancialIndex::Pre,
            FinancialIndex::Post,
            FinancialIndex::None,
        ] {
            assert_eq!(index.as_str().parse::<FinancialIndex>().unwrap(), index);
        }
    }

    #[test]
    fn test_signed_values() {
        let redemption = FixedIncomeDeposit {
            asset: "CDB XP".to_string(),
            operation_type: OperationType::Sell,
            quotas: dec!(10),
            purchase_date: NaiveDate::from_ymd_opt(2023, 1, 2).unwrap(),
            due_date: NaiveDate::from_ymd_opt(2025, 1, 2).unwrap(),
            financial_index: FinancialIndex::Cdi,
            value: dec!(1500),
            pre_rate: dec!(0),
            post_rate: dec!(1.1),
            tax_rate: dec!(0.15),
            is_pgbl: false,
        };
        assert_eq!(redemption.signed_value(), dec!(-1500));
        assert_eq!(redemption.signed_quotas(), dec!(-10));
    }
}
