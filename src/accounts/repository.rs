//! Affiliate Account Repository

use std::error::Error as StdError;

use mockall::automock;
use thiserror::Error;

use crate::accounts::models::{Account, ReferringCode};

/// Account lookup failure.
#[derive(Debug, Error)]
pub enum AccountLookupError {
    /// No account uses the referring code.
    #[error("no affiliate account with referring code {0}")]
    NotFound(ReferringCode),

    /// The backing store could not be queried.
    #[error("affiliate account lookup failed")]
    Unavailable(#[source] Box<dyn StdError + Send + Sync>),
}

/// Loads affiliate accounts.
#[automock]
pub trait AccountRepository {
    /// Find the account that owns `code`.
    ///
    /// # Errors
    ///
    /// Returns [`AccountLookupError::NotFound`] if no account uses the code, or
    /// [`AccountLookupError::Unavailable`] if the store cannot be queried.
    fn get_by_referring_code(&self, code: &ReferringCode) -> Result<Account, AccountLookupError>;
}

impl<T: AccountRepository + ?Sized> AccountRepository for &T {
    fn get_by_referring_code(&self, code: &ReferringCode) -> Result<Account, AccountLookupError> {
        (**self).get_by_referring_code(code)
    }
}
