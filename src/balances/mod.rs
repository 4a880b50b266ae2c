// Balances module - per-asset daily balance engines and their union

pub mod daily;
pub mod equity;
pub mod fgts;
pub mod fixed_income;
pub mod indexes;
pub mod tesouro_selic;

pub use daily::aggregate_daily_balances;
pub use equity::build_equity_balances;
pub use fgts::build_fgts_balances;
pub use fixed_income::build_fixed_income_balances;
pub use indexes::DailyIndexes;
pub use tesouro_selic::{build_quota_balances, replay_quota_events, QuotaSnapshot};
