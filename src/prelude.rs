//! Affiliate attribution prelude.
//!
//! Convenience exports for common library consumers.

pub use crate::{
    accounts::{
        Account, AccountId, AccountLookupError, AccountRepository, AccountStatus, ReferringCode,
    },
    area::{AppArea, AreaProbe},
    cart::{CartItem, Quote, RuleDiscount, ShippingAssignment, Totals},
    config::{ConfigError, FallbackConfig, LogFormat, LoggingConfig, PatchConfig},
    cookies::CookieReader,
    observability::{ObservabilityError, init_logging},
    reconciliation::{
        DiscountCollector, ReconciliationOutcome, ReconciliationReport, Reconciler,
        RequestScope, SkipReason, StackingGuard,
    },
    resolution::{AbsenceReason, AffiliateAccountResolver, CookieFallbackResolver, FallbackOutcome},
    rules::{
        AffiliateRuleResolver, CouponType, RuleId, RuleIdSet, RuleMetadataSource, RuleQueryError,
        RuleRecord,
    },
};
