//! Affiliate Resolution Fallback
//!
//! The affiliate extension gives up on attribution when the customer applies a coupon
//! it does not recognise: the coupon lookup fails before the affiliate cookie is ever
//! consulted. [`CookieFallbackResolver`] wraps the extension's resolver and, when it
//! comes back empty on the storefront, resolves the account from the cookie instead.

use mockall::automock;
use tracing::{Span, debug, warn};

use crate::{
    accounts::{Account, AccountLookupError, AccountRepository, ReferringCode},
    area::{AppArea, AreaProbe},
    config::FallbackConfig,
    cookies::CookieReader,
};

/// Resolves the affiliate account to attribute the current quote to.
#[automock]
pub trait AffiliateAccountResolver {
    /// The attributed account, if any.
    fn resolve_affiliate_account(&self) -> Option<Account>;
}

impl<T: AffiliateAccountResolver + ?Sized> AffiliateAccountResolver for &T {
    fn resolve_affiliate_account(&self) -> Option<Account> {
        (**self).resolve_affiliate_account()
    }
}

/// Why no account was attributed.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AbsenceReason {
    /// Request is served by the admin area, where the cookie is meaningless.
    AdminArea,

    /// No affiliate cookie, or an empty one.
    MissingCookie,

    /// The cookie references a code no account uses.
    AccountNotFound,

    /// The account store could not be queried.
    LookupFailed,

    /// The account exists but is not enabled.
    AccountDisabled,
}

/// Detailed result of [`CookieFallbackResolver::resolve_with_outcome`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FallbackOutcome {
    /// The wrapped resolver found an account; the cookie was not consulted.
    Upstream(Account),

    /// The account was resolved from the affiliate cookie.
    Cookie(Account),

    /// No account is attributed.
    Absent(AbsenceReason),
}

impl FallbackOutcome {
    /// The attributed account, if any.
    pub fn into_account(self) -> Option<Account> {
        match self {
            Self::Upstream(account) | Self::Cookie(account) => Some(account),
            Self::Absent(_) => None,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            Self::Upstream(_) => "upstream",
            Self::Cookie(_) => "cookie",
            Self::Absent(AbsenceReason::AdminArea) => "absent_admin_area",
            Self::Absent(AbsenceReason::MissingCookie) => "absent_missing_cookie",
            Self::Absent(AbsenceReason::AccountNotFound) => "absent_account_not_found",
            Self::Absent(AbsenceReason::LookupFailed) => "absent_lookup_failed",
            Self::Absent(AbsenceReason::AccountDisabled) => "absent_account_disabled",
        }
    }
}

/// Falls back to the affiliate cookie when the wrapped resolver finds no account.
#[derive(Debug)]
pub struct CookieFallbackResolver<U, C, R, P> {
    upstream: U,
    cookies: C,
    accounts: R,
    area: P,
    config: FallbackConfig,
}

impl<U, C, R, P> CookieFallbackResolver<U, C, R, P>
where
    U: AffiliateAccountResolver,
    C: CookieReader,
    R: AccountRepository,
    P: AreaProbe,
{
    /// Wrap `upstream`.
    pub fn new(upstream: U, cookies: C, accounts: R, area: P, config: FallbackConfig) -> Self {
        Self {
            upstream,
            cookies,
            accounts,
            area,
            config,
        }
    }

    /// Resolve the account and report where it came from, or why there is none.
    #[tracing::instrument(
        name = "attribution.fallback.resolve",
        skip_all,
        fields(outcome = tracing::field::Empty)
    )]
    pub fn resolve_with_outcome(&self) -> FallbackOutcome {
        let outcome = self.resolve();

        Span::current().record("outcome", outcome.as_str());

        outcome
    }

    fn resolve(&self) -> FallbackOutcome {
        if let Some(account) = self.upstream.resolve_affiliate_account() {
            return FallbackOutcome::Upstream(account);
        }

        if self.area.area() == AppArea::Admin {
            return FallbackOutcome::Absent(AbsenceReason::AdminArea);
        }

        let Some(code) = self
            .cookies
            .get_cookie(&self.config.cookie_name)
            .as_deref()
            .and_then(ReferringCode::new)
        else {
            return FallbackOutcome::Absent(AbsenceReason::MissingCookie);
        };

        match self.accounts.get_by_referring_code(&code) {
            Ok(account) if account.is_enabled() => FallbackOutcome::Cookie(account),
            Ok(_) => FallbackOutcome::Absent(AbsenceReason::AccountDisabled),
            Err(AccountLookupError::NotFound(_)) => {
                debug!(
                    referring_code = %code,
                    "affiliate cookie references non-existent account code"
                );

                FallbackOutcome::Absent(AbsenceReason::AccountNotFound)
            }
            Err(error @ AccountLookupError::Unavailable(_)) => {
                warn!(
                    referring_code = %code,
                    %error,
                    "could not load affiliate account from cookie"
                );

                FallbackOutcome::Absent(AbsenceReason::LookupFailed)
            }
        }
    }
}

impl<U, C, R, P> AffiliateAccountResolver for CookieFallbackResolver<U, C, R, P>
where
    U: AffiliateAccountResolver,
    C: CookieReader,
    R: AccountRepository,
    P: AreaProbe,
{
    fn resolve_affiliate_account(&self) -> Option<Account> {
        self.resolve_with_outcome().into_account()
    }
}
