// Reports module - cash-flow ledger, monthly returns and portfolio summary

pub mod cashflow;
pub mod returns;
pub mod summary;

pub use cashflow::build_cash_flows;
pub use returns::calculate_monthly_returns;
pub use summary::{summarize_returns, MOVING_AVERAGE_WINDOWS};
