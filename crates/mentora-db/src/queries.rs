//! Query functions grouped by table.

pub mod earnings;
pub mod impressions;
pub mod refs;
pub mod splits;
pub mod wallets;
pub mod withdrawals;
