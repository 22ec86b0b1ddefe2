//! Affiliate Account Models

use std::fmt::{Display, Formatter, Result as FmtResult};

/// Affiliate account identifier.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct AccountId(u64);

impl AccountId {
    /// Create an account identifier.
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

}

impl Display for AccountId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        Display::fmt(&self.0, f)
    }
}

/// Code an affiliate shares with customers; stored in the affiliate cookie.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ReferringCode(String);

impl ReferringCode {
    /// Create a referring code from its stored value, rejecting the empty string.
    ///
    /// The value is kept verbatim; surrounding whitespace is part of the code.
    pub fn new(code: &str) -> Option<Self> {
        if code.is_empty() {
            return None;
        }

        Some(Self(code.to_string()))
    }

    /// The code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ReferringCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.0)
    }
}

/// Whether an account may currently earn attributions.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum AccountStatus {
    /// Active account
    Enabled,

    /// Suspended or not yet approved account
    Disabled,
}

/// Affiliate account, as owned by the affiliate subsystem.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Account {
    /// Account identifier
    pub id: AccountId,

    /// Referring code
    pub referring_code: ReferringCode,

    /// Account status
    pub status: AccountStatus,
}

impl Account {
    /// Whether the account may be attributed.
    pub fn is_enabled(&self) -> bool {
        self.status == AccountStatus::Enabled
    }
}
