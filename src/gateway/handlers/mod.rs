//! HTTP handlers

pub mod account;
pub mod health;
pub mod helpers;
pub mod transfer;

pub use account::{
    create_account, fund_account, get_account, get_account_by_id, get_balance, get_movements,
    list_person_accounts,
};
pub use health::{HealthResponse, health_check};
pub use transfer::create_transfer;
