//! Discount collection decorator

use crate::{
    cart::{Quote, ShippingAssignment, Totals},
    reconciliation::{Reconciler, RequestScope},
    rules::{AffiliateRuleResolver, RuleMetadataSource},
};

/// The discount step of address totals collection.
pub trait DiscountCollector<'a> {
    /// Error raised by the collector itself.
    type Error;

    /// Apply discounts to the assigned items and write the address discount totals.
    ///
    /// # Errors
    ///
    /// Implementation defined.
    fn collect(
        &self,
        scope: &mut RequestScope,
        quote: &Quote,
        assignment: &mut ShippingAssignment<'a>,
        totals: &mut Totals<'a>,
    ) -> Result<(), Self::Error>;
}

/// Wraps a [`DiscountCollector`] so affiliate and coupon discounts never stack on an
/// item.
///
/// The wrapped collector runs first. If it succeeds, the result is reconciled in
/// place; if it fails, its error is returned untouched and nothing is reconciled.
#[derive(Debug)]
pub struct StackingGuard<D, A, R> {
    inner: D,
    reconciler: Reconciler<A, R>,
}

impl<D, A, R> StackingGuard<D, A, R>
where
    A: AffiliateRuleResolver,
    R: RuleMetadataSource,
{
    /// Wrap `inner`.
    pub fn new(inner: D, affiliate_rules: A, rules: R) -> Self {
        Self {
            inner,
            reconciler: Reconciler::new(affiliate_rules, rules),
        }
    }
}

impl<'a, D, A, R> DiscountCollector<'a> for StackingGuard<D, A, R>
where
    D: DiscountCollector<'a>,
    A: AffiliateRuleResolver,
    R: RuleMetadataSource,
{
    type Error = D::Error;

    fn collect(
        &self,
        scope: &mut RequestScope,
        quote: &Quote,
        assignment: &mut ShippingAssignment<'a>,
        totals: &mut Totals<'a>,
    ) -> Result<(), Self::Error> {
        self.inner.collect(scope, quote, assignment, totals)?;

        self.reconciler.reconcile(scope, quote, assignment, totals);

        Ok(())
    }
}
