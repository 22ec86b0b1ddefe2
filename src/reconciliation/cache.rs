//! Request-scoped state

use crate::rules::RuleIdSet;

/// Memoized coupon-rule classification.
///
/// Filled at most once; lives exactly as long as the [`RequestScope`] that owns it.
#[derive(Clone, Debug, Default)]
pub struct CouponRuleCache {
    coupon_rules: Option<RuleIdSet>,
}

impl CouponRuleCache {
    /// The cached classification, if one was stored.
    pub fn get(&self) -> Option<&RuleIdSet> {
        self.coupon_rules.as_ref()
    }

    /// Return the cached classification, computing and storing it with `classify`
    /// on first use. Nothing is stored when `classify` fails.
    ///
    /// # Errors
    ///
    /// Propagates the error returned by `classify`.
    pub fn get_or_try_insert_with<E>(
        &mut self,
        classify: impl FnOnce() -> Result<RuleIdSet, E>,
    ) -> Result<&RuleIdSet, E> {
        if self.coupon_rules.is_none() {
            self.coupon_rules = Some(classify()?);
        }

        Ok(self.coupon_rules.get_or_insert_with(RuleIdSet::new))
    }
}

/// State owned by a single totals collection. Create one per request and drop it
/// afterwards; never share it between requests.
#[derive(Clone, Debug, Default)]
pub struct RequestScope {
    coupon_rules: CouponRuleCache,
}

impl RequestScope {
    /// Start a fresh scope with empty caches.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Coupon-rule classification cache
    pub fn coupon_rules(&self) -> &CouponRuleCache {
        &self.coupon_rules
    }

    /// Mutable coupon-rule classification cache
    pub fn coupon_rules_mut(&mut self) -> &mut CouponRuleCache {
        &mut self.coupon_rules
    }
}
