//! Sales Rules
//!
//! Read-only view of the discount rules that produced an item's discounts, and the
//! collaborator traits used to look them up.

use std::error::Error as StdError;

use mockall::automock;
use thiserror::Error;

pub mod ids;

pub use ids::{RuleId, RuleIdSet};

/// How a rule is triggered at checkout.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum CouponType {
    /// Applied automatically, no coupon code required.
    NoCoupon,

    /// Requires a specific coupon code.
    SpecificCoupon,

    /// Requires one of a set of auto-generated coupon codes.
    Auto,
}

impl CouponType {
    /// Whether a coupon code is needed for the rule to apply.
    pub const fn requires_coupon(self) -> bool {
        !matches!(self, Self::NoCoupon)
    }
}

/// Unknown numeric coupon type code.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown coupon type code: {0}")]
pub struct UnknownCouponType(pub u8);

impl TryFrom<u8> for CouponType {
    type Error = UnknownCouponType;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(Self::NoCoupon),
            2 => Ok(Self::SpecificCoupon),
            3 => Ok(Self::Auto),
            other => Err(UnknownCouponType(other)),
        }
    }
}

/// Rule metadata relevant to stacking decisions.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RuleRecord {
    /// Rule identifier
    pub id: RuleId,

    /// Coupon type classification
    pub coupon_type: CouponType,
}

impl RuleRecord {
    /// Create a rule record.
    pub fn new(id: impl Into<RuleId>, coupon_type: CouponType) -> Self {
        Self {
            id: id.into(),
            coupon_type,
        }
    }
}

/// Rule metadata lookup failure.
#[derive(Debug, Error)]
pub enum RuleQueryError {
    /// The backing store could not be queried.
    #[error("rule metadata query failed")]
    Unavailable(#[source] Box<dyn StdError + Send + Sync>),
}

/// Looks up rule metadata by identifier.
#[automock]
pub trait RuleMetadataSource {
    /// Returns the records for the given rules. Unknown identifiers are omitted.
    ///
    /// # Errors
    ///
    /// Returns a [`RuleQueryError`] if the backing store cannot be queried.
    fn rules_by_ids(&self, ids: &RuleIdSet) -> Result<Vec<RuleRecord>, RuleQueryError>;
}

impl<T: RuleMetadataSource + ?Sized> RuleMetadataSource for &T {
    fn rules_by_ids(&self, ids: &RuleIdSet) -> Result<Vec<RuleRecord>, RuleQueryError> {
        (**self).rules_by_ids(ids)
    }
}

/// Reports the affiliate rules active for the current request.
#[automock]
pub trait AffiliateRuleResolver {
    /// Identifiers of the rules attributed to the resolved affiliate, if any.
    fn resolve_rule_ids(&self) -> RuleIdSet;
}

impl<T: AffiliateRuleResolver + ?Sized> AffiliateRuleResolver for &T {
    fn resolve_rule_ids(&self) -> RuleIdSet {
        (**self).resolve_rule_ids()
    }
}
