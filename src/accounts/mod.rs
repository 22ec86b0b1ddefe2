//! Affiliate Accounts

pub mod models;
mod repository;

pub use models::{Account, AccountId, AccountStatus, ReferringCode};
pub use repository::{AccountLookupError, AccountRepository, MockAccountRepository};
