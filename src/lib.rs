//! Group expense settlement: per-member balances from a shared ledger and the
//! payments that square everyone up, served over HTTP.

pub mod balance;
pub mod config;
pub mod error;
pub mod money;
pub mod routes;
pub mod schemas;
pub mod settlement;
pub mod store;
pub mod summary;

pub use balance::{compute_balances, Balances};
pub use error::{ExpenseViolation, SettlementError};
pub use settlement::{resolve_settlements, Settlement, SettlementResolver};
pub use summary::{settle_group, GroupSummary};
