//! Discount Reconciliation
//!
//! Stops an affiliate discount and a coupon discount from stacking on the same item.
//! After the regular discount collector has run, every item that received both keeps
//! only the larger of the two; the dropped amount is handed back to the address totals.
//!
//! Automatic (no-coupon) rules never compete and are left untouched.

use rusty_money::{Money, iso::Currency};
use tracing::{Span, debug, warn};

use crate::{
    cart::{CartItem, Quote, ShippingAssignment, Totals},
    rules::{AffiliateRuleResolver, RuleIdSet, RuleMetadataSource, RuleQueryError},
};

mod cache;
mod collector;
mod plan;

pub use cache::{CouponRuleCache, RequestScope};
pub use collector::{DiscountCollector, StackingGuard};
pub use plan::{ItemPlan, RuleCategory};

/// Why reconciliation did nothing.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// No affiliate rules are active for the request.
    NoAffiliateRules,

    /// The quote has no coupon code.
    NoCouponCode,

    /// The address has no items.
    NoItems,

    /// None of the applied non-affiliate rules require a coupon.
    NoCouponRules,

    /// Rule metadata could not be loaded.
    RuleQueryFailed,
}

/// Result of a reconciliation pass.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ReconciliationOutcome {
    /// A precondition failed; nothing was inspected.
    Skipped(SkipReason),

    /// Items were inspected but none had stacked discounts.
    Unchanged,

    /// At least one item had a discount removed.
    Reconciled,
}

impl ReconciliationOutcome {
    /// Stable name used in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Skipped(SkipReason::NoAffiliateRules) => "skipped_no_affiliate_rules",
            Self::Skipped(SkipReason::NoCouponCode) => "skipped_no_coupon_code",
            Self::Skipped(SkipReason::NoItems) => "skipped_no_items",
            Self::Skipped(SkipReason::NoCouponRules) => "skipped_no_coupon_rules",
            Self::Skipped(SkipReason::RuleQueryFailed) => "skipped_rule_query_failed",
            Self::Unchanged => "unchanged",
            Self::Reconciled => "reconciled",
        }
    }
}

/// Summary of what a reconciliation pass changed.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ReconciliationReport<'a> {
    /// What happened
    pub outcome: ReconciliationOutcome,

    /// Discount released back to the totals, quote currency
    pub adjustment: Money<'a, Currency>,

    /// Discount released back to the totals, base currency
    pub base_adjustment: Money<'a, Currency>,

    /// Number of items that had a discount removed
    pub items_adjusted: usize,
}

impl<'a> ReconciliationReport<'a> {
    fn untouched(outcome: ReconciliationOutcome, totals: &Totals<'a>) -> Self {
        Self {
            outcome,
            adjustment: Money::from_minor(0, totals.currency()),
            base_adjustment: Money::from_minor(0, totals.base_currency()),
            items_adjusted: 0,
        }
    }

    /// Whether anything was changed.
    pub fn is_reconciled(&self) -> bool {
        self.outcome == ReconciliationOutcome::Reconciled
    }
}

/// Resolves affiliate/coupon stacking after discount collection.
#[derive(Debug)]
pub struct Reconciler<A, R> {
    affiliate_rules: A,
    rules: R,
}

impl<A, R> Reconciler<A, R>
where
    A: AffiliateRuleResolver,
    R: RuleMetadataSource,
{
    /// Create a reconciler over the given affiliate rule resolver and rule metadata source.
    pub fn new(affiliate_rules: A, rules: R) -> Self {
        Self {
            affiliate_rules,
            rules,
        }
    }

    /// Remove the smaller of each item's affiliate and coupon discounts and release
    /// the removed amount from `totals`.
    ///
    /// Never fails: anything unexpected degrades to leaving the affected item (or the
    /// whole address) as the discount collector produced it.
    #[tracing::instrument(
        name = "attribution.reconciliation.reconcile",
        skip_all,
        fields(
            outcome = tracing::field::Empty,
            adjustment = tracing::field::Empty,
            items_adjusted = tracing::field::Empty
        )
    )]
    pub fn reconcile<'a>(
        &self,
        scope: &mut RequestScope,
        quote: &Quote,
        assignment: &mut ShippingAssignment<'a>,
        totals: &mut Totals<'a>,
    ) -> ReconciliationReport<'a> {
        let report = self.run(scope, quote, assignment, totals);

        let span = Span::current();

        span.record("outcome", report.outcome.as_str());
        span.record("adjustment", tracing::field::display(report.adjustment));
        span.record("items_adjusted", report.items_adjusted);

        report
    }

    fn run<'a>(
        &self,
        scope: &mut RequestScope,
        quote: &Quote,
        assignment: &mut ShippingAssignment<'a>,
        totals: &mut Totals<'a>,
    ) -> ReconciliationReport<'a> {
        let skipped = |reason| {
            ReconciliationReport::untouched(ReconciliationOutcome::Skipped(reason), totals)
        };

        let affiliate_rules = self.affiliate_rules.resolve_rule_ids();

        if affiliate_rules.is_empty() {
            return skipped(SkipReason::NoAffiliateRules);
        }

        if !quote.has_coupon_code() {
            return skipped(SkipReason::NoCouponCode);
        }

        if assignment.is_empty() {
            return skipped(SkipReason::NoItems);
        }

        let applied_rules = applied_rule_ids(assignment);

        let coupon_rules = match scope
            .coupon_rules_mut()
            .get_or_try_insert_with(|| self.classify_coupon_rules(&applied_rules, &affiliate_rules))
        {
            Ok(coupon_rules) => coupon_rules.clone(),
            Err(error) => {
                warn!(%error, "could not load rule metadata; leaving discounts as collected");

                return skipped(SkipReason::RuleQueryFailed);
            }
        };

        if coupon_rules.is_empty() {
            return skipped(SkipReason::NoCouponRules);
        }

        let mut adjustment = Money::from_minor(0, totals.currency());
        let mut base_adjustment = Money::from_minor(0, totals.base_currency());
        let mut plans = Vec::with_capacity(assignment.items().len());

        for item in assignment.calculated_items() {
            let plan = match ItemPlan::for_item(item, &affiliate_rules, &coupon_rules) {
                Ok(plan) => plan,
                Err(error) => {
                    warn!(
                        sku = item.sku(),
                        %error,
                        "skipping item with inconsistent discount data"
                    );
                    None
                }
            };

            let plan = plan.and_then(|plan| {
                match (
                    adjustment.add(plan.adjustment),
                    base_adjustment.add(plan.base_adjustment),
                ) {
                    (Ok(total), Ok(base_total)) => {
                        adjustment = total;
                        base_adjustment = base_total;

                        Some(plan)
                    }
                    (Err(error), _) | (_, Err(error)) => {
                        warn!(
                            sku = item.sku(),
                            %error,
                            "skipping item priced in a different currency"
                        );
                        None
                    }
                }
            });

            plans.push(plan);
        }

        let items_adjusted = plans.iter().flatten().count();

        if items_adjusted == 0 {
            return ReconciliationReport::untouched(ReconciliationOutcome::Unchanged, totals);
        }

        if adjustment.to_minor_units() > 0
            && let Err(error) = totals.release_discount(adjustment, base_adjustment)
        {
            warn!(%error, "could not release discount from totals; leaving discounts as collected");

            return ReconciliationReport::untouched(ReconciliationOutcome::Unchanged, totals);
        }

        for (item, plan) in assignment.calculated_items_mut().into_iter().zip(plans) {
            if let Some(plan) = plan {
                debug!(
                    sku = item.sku(),
                    adjustment = %plan.adjustment,
                    losing = ?plan.losing,
                    "removed stacked discount"
                );

                plan.apply(item, &affiliate_rules, &coupon_rules);
            }
        }

        ReconciliationReport {
            outcome: ReconciliationOutcome::Reconciled,
            adjustment,
            base_adjustment,
            items_adjusted,
        }
    }

    /// Applied rules that are neither affiliate rules nor automatic.
    fn classify_coupon_rules(
        &self,
        applied_rules: &RuleIdSet,
        affiliate_rules: &RuleIdSet,
    ) -> Result<RuleIdSet, RuleQueryError> {
        let candidates = applied_rules.difference(affiliate_rules);

        if candidates.is_empty() {
            return Ok(RuleIdSet::new());
        }

        Ok(self
            .rules
            .rules_by_ids(&candidates)?
            .into_iter()
            .filter(|rule| rule.coupon_type.requires_coupon())
            .map(|rule| rule.id)
            .collect())
    }
}

/// Every rule that contributed a discount to an item or to its calculated children.
fn applied_rule_ids(assignment: &ShippingAssignment<'_>) -> RuleIdSet {
    let mut ids = RuleIdSet::new();

    let mut extract = |item: &CartItem<'_>| {
        ids.extend(item.discounts().iter().map(|discount| discount.rule_id));
    };

    for item in assignment.items() {
        extract(item);

        if item.has_calculated_children() {
            item.children().iter().for_each(&mut extract);
        }
    }

    ids
}

#[cfg(test)]
mod tests {
    use rusty_money::iso::{GBP, USD};
    use testresult::TestResult;

    use crate::{
        cart::RuleDiscount,
        rules::{CouponType, MockAffiliateRuleResolver, MockRuleMetadataSource, RuleRecord},
    };

    use super::*;

    const AFFILIATE: u32 = 10;
    const COUPON: u32 = 20;
    const AUTOMATIC: u32 = 30;

    fn gbp(minor: i64) -> Money<'static, Currency> {
        Money::from_minor(minor, GBP)
    }

    fn affiliate_rules(ids: RuleIdSet) -> MockAffiliateRuleResolver {
        let mut resolver = MockAffiliateRuleResolver::new();
        resolver.expect_resolve_rule_ids().return_const(ids);
        resolver
    }

    fn rule_source(records: Vec<RuleRecord>) -> MockRuleMetadataSource {
        let mut source = MockRuleMetadataSource::new();
        source
            .expect_rules_by_ids()
            .returning(move |_| Ok(records.clone()));
        source
    }

    fn stacked_item(sku: &str, affiliate: i64, coupon: i64) -> CartItem<'static> {
        CartItem::new(sku, gbp(affiliate + coupon), gbp(affiliate + coupon))
            .with_applied_rule_ids(RuleIdSet::from([AFFILIATE, COUPON]))
            .with_discounts([
                RuleDiscount::new(AFFILIATE, gbp(affiliate), gbp(affiliate)),
                RuleDiscount::new(COUPON, gbp(coupon), gbp(coupon)),
            ])
    }

    fn totals(discount: i64) -> Result<Totals<'static>, rusty_money::MoneyError> {
        Totals::new(gbp(10_000), gbp(10_000), gbp(-discount), gbp(-discount))
    }

    #[test]
    fn skips_without_affiliate_rules_and_never_queries_rules() -> TestResult {
        let mut rules = MockRuleMetadataSource::new();
        rules.expect_rules_by_ids().never();

        let reconciler = Reconciler::new(affiliate_rules(RuleIdSet::new()), rules);
        let mut assignment = ShippingAssignment::new(vec![stacked_item("SKU", 1_000, 700)]);
        let mut totals = totals(1_700)?;
        let before = (assignment.clone(), totals);

        let report = reconciler.reconcile(
            &mut RequestScope::new(),
            &Quote::with_coupon("COUPON10"),
            &mut assignment,
            &mut totals,
        );

        assert_eq!(
            report.outcome,
            ReconciliationOutcome::Skipped(SkipReason::NoAffiliateRules)
        );
        assert_eq!((assignment, totals), before);

        Ok(())
    }

    #[test]
    fn skips_without_coupon_code() -> TestResult {
        let mut rules = MockRuleMetadataSource::new();
        rules.expect_rules_by_ids().never();

        let reconciler = Reconciler::new(affiliate_rules(RuleIdSet::from([AFFILIATE])), rules);
        let mut assignment = ShippingAssignment::new(vec![stacked_item("SKU", 1_000, 700)]);
        let mut totals = totals(1_700)?;

        for quote in [Quote::default(), Quote::with_coupon("")] {
            let report = reconciler.reconcile(
                &mut RequestScope::new(),
                &quote,
                &mut assignment,
                &mut totals,
            );

            assert_eq!(
                report.outcome,
                ReconciliationOutcome::Skipped(SkipReason::NoCouponCode)
            );
        }

        assert_eq!(totals, self::totals(1_700)?);

        Ok(())
    }

    #[test]
    fn skips_without_items() -> TestResult {
        let reconciler = Reconciler::new(
            affiliate_rules(RuleIdSet::from([AFFILIATE])),
            MockRuleMetadataSource::new(),
        );
        let mut totals = totals(0)?;

        let report = reconciler.reconcile(
            &mut RequestScope::new(),
            &Quote::with_coupon("COUPON10"),
            &mut ShippingAssignment::default(),
            &mut totals,
        );

        assert_eq!(report.outcome, ReconciliationOutcome::Skipped(SkipReason::NoItems));

        Ok(())
    }

    #[test]
    fn affiliate_only_discount_needs_no_rule_query() -> TestResult {
        let mut rules = MockRuleMetadataSource::new();
        rules.expect_rules_by_ids().never();

        let reconciler = Reconciler::new(affiliate_rules(RuleIdSet::from([AFFILIATE])), rules);
        let mut assignment = ShippingAssignment::new(vec![
            CartItem::new("SKU", gbp(800), gbp(800))
                .with_discounts([RuleDiscount::new(AFFILIATE, gbp(800), gbp(800))]),
        ]);
        let mut totals = totals(800)?;
        let mut scope = RequestScope::new();

        let report = reconciler.reconcile(
            &mut scope,
            &Quote::with_coupon("COUPON10"),
            &mut assignment,
            &mut totals,
        );

        assert_eq!(
            report.outcome,
            ReconciliationOutcome::Skipped(SkipReason::NoCouponRules)
        );
        assert_eq!(scope.coupon_rules().get(), Some(&RuleIdSet::new()));
        assert_eq!(totals.discount, gbp(-800));

        Ok(())
    }

    #[test]
    fn automatic_rules_never_compete() -> TestResult {
        let reconciler = Reconciler::new(
            affiliate_rules(RuleIdSet::from([AFFILIATE])),
            rule_source(vec![RuleRecord::new(AUTOMATIC, CouponType::NoCoupon)]),
        );
        let mut assignment = ShippingAssignment::new(vec![
            CartItem::new("SKU", gbp(1_500), gbp(1_500)).with_discounts([
                RuleDiscount::new(AFFILIATE, gbp(1_000), gbp(1_000)),
                RuleDiscount::new(AUTOMATIC, gbp(500), gbp(500)),
            ]),
        ]);
        let mut totals = totals(1_500)?;

        let report = reconciler.reconcile(
            &mut RequestScope::new(),
            &Quote::with_coupon("COUPON10"),
            &mut assignment,
            &mut totals,
        );

        assert_eq!(
            report.outcome,
            ReconciliationOutcome::Skipped(SkipReason::NoCouponRules)
        );
        assert_eq!(report.adjustment, gbp(0));
        assert_eq!(totals.discount, gbp(-1_500));

        Ok(())
    }

    #[test]
    fn keeps_larger_discount_and_releases_smaller() -> TestResult {
        // (affiliate, coupon, expected adjustment, expected surviving rule)
        let cases = [
            (1_000, 700, 700, AFFILIATE),
            (500, 800, 500, COUPON),
            (600, 600, 600, AFFILIATE),
        ];

        for (affiliate, coupon, expected, survivor) in cases {
            let reconciler = Reconciler::new(
                affiliate_rules(RuleIdSet::from([AFFILIATE])),
                rule_source(vec![RuleRecord::new(COUPON, CouponType::SpecificCoupon)]),
            );
            let mut assignment =
                ShippingAssignment::new(vec![stacked_item("SKU", affiliate, coupon)]);
            let mut totals = totals(affiliate + coupon)?;

            let report = reconciler.reconcile(
                &mut RequestScope::new(),
                &Quote::with_coupon("COUPON10"),
                &mut assignment,
                &mut totals,
            );

            let item = assignment.items().first().ok_or("expected an item")?;
            let kept = affiliate.max(coupon);

            assert!(report.is_reconciled(), "{affiliate} vs {coupon} should reconcile");
            assert_eq!(report.adjustment, gbp(expected));
            assert_eq!(report.base_adjustment, gbp(expected));
            assert_eq!(report.items_adjusted, 1);
            assert_eq!(item.discount_amount(), gbp(kept));
            assert_eq!(item.base_discount_amount(), gbp(kept));
            assert_eq!(item.applied_rule_ids(), &RuleIdSet::from([survivor]));
            assert_eq!(totals.discount, gbp(-kept));
            assert_eq!(totals.base_discount, gbp(-kept));
            assert_eq!(totals.subtotal_with_discount, gbp(10_000 - kept));
            assert_eq!(totals.base_subtotal_with_discount, gbp(10_000 - kept));
        }

        Ok(())
    }

    #[test]
    fn classification_is_cached_for_the_request() -> TestResult {
        let mut rules = MockRuleMetadataSource::new();
        rules
            .expect_rules_by_ids()
            .times(1)
            .returning(|_| Ok(vec![RuleRecord::new(COUPON, CouponType::SpecificCoupon)]));

        let reconciler = Reconciler::new(affiliate_rules(RuleIdSet::from([AFFILIATE])), rules);
        let quote = Quote::with_coupon("COUPON10");
        let mut scope = RequestScope::new();

        for _ in 0..2 {
            let mut assignment = ShippingAssignment::new(vec![stacked_item("SKU", 1_000, 700)]);
            let mut totals = totals(1_700)?;

            let report = reconciler.reconcile(&mut scope, &quote, &mut assignment, &mut totals);

            assert!(report.is_reconciled(), "both passes should reconcile");
        }

        assert_eq!(scope.coupon_rules().get(), Some(&RuleIdSet::from([COUPON])));

        Ok(())
    }

    #[test]
    fn rule_query_failure_leaves_everything_untouched() -> TestResult {
        let mut rules = MockRuleMetadataSource::new();
        rules
            .expect_rules_by_ids()
            .returning(|_| Err(RuleQueryError::Unavailable("connection refused".into())));

        let reconciler = Reconciler::new(affiliate_rules(RuleIdSet::from([AFFILIATE])), rules);
        let mut assignment = ShippingAssignment::new(vec![stacked_item("SKU", 1_000, 700)]);
        let mut totals = totals(1_700)?;
        let before = (assignment.clone(), totals);
        let mut scope = RequestScope::new();

        let report = reconciler.reconcile(
            &mut scope,
            &Quote::with_coupon("COUPON10"),
            &mut assignment,
            &mut totals,
        );

        assert_eq!(
            report.outcome,
            ReconciliationOutcome::Skipped(SkipReason::RuleQueryFailed)
        );
        assert_eq!((assignment, totals), before);
        assert!(scope.coupon_rules().get().is_none());

        Ok(())
    }

    #[test]
    fn reconciles_calculated_children_not_their_parent() -> TestResult {
        let reconciler = Reconciler::new(
            affiliate_rules(RuleIdSet::from([AFFILIATE])),
            rule_source(vec![RuleRecord::new(COUPON, CouponType::SpecificCoupon)]),
        );
        let parent = CartItem::new("BUNDLE", gbp(0), gbp(0)).with_children(
            vec![
                stacked_item("BUNDLE-A", 1_000, 700),
                stacked_item("BUNDLE-B", 200, 300),
            ],
            true,
        );
        let mut assignment = ShippingAssignment::new(vec![parent]);
        let mut totals = totals(2_200)?;

        let report = reconciler.reconcile(
            &mut RequestScope::new(),
            &Quote::with_coupon("COUPON10"),
            &mut assignment,
            &mut totals,
        );

        assert_eq!(report.items_adjusted, 2);
        assert_eq!(report.adjustment, gbp(900));
        assert_eq!(totals.discount, gbp(-1_300));

        let parent = assignment.items().first().ok_or("expected parent")?;
        let discounts: Vec<_> = parent
            .children()
            .iter()
            .map(CartItem::discount_amount)
            .collect();

        assert_eq!(parent.discount_amount(), gbp(0));
        assert_eq!(discounts, [gbp(1_000), gbp(300)]);

        Ok(())
    }

    #[test]
    fn uncalculated_children_are_ignored() -> TestResult {
        let reconciler = Reconciler::new(
            affiliate_rules(RuleIdSet::from([AFFILIATE])),
            rule_source(vec![RuleRecord::new(COUPON, CouponType::SpecificCoupon)]),
        );
        let parent = stacked_item("CONFIGURABLE", 1_000, 700)
            .with_children(vec![stacked_item("CONFIGURABLE-RED", 1_000, 700)], false);
        let mut assignment = ShippingAssignment::new(vec![parent]);
        let mut totals = totals(1_700)?;

        let report = reconciler.reconcile(
            &mut RequestScope::new(),
            &Quote::with_coupon("COUPON10"),
            &mut assignment,
            &mut totals,
        );

        let parent = assignment.items().first().ok_or("expected parent")?;
        let child = parent.children().first().ok_or("expected child")?;

        assert_eq!(report.items_adjusted, 1);
        assert_eq!(parent.discount_amount(), gbp(1_000));
        assert_eq!(child.discount_amount(), gbp(1_700));

        Ok(())
    }

    #[test]
    fn inconsistent_item_is_skipped_others_still_reconcile() -> TestResult {
        let reconciler = Reconciler::new(
            affiliate_rules(RuleIdSet::from([AFFILIATE])),
            rule_source(vec![RuleRecord::new(COUPON, CouponType::SpecificCoupon)]),
        );
        let broken = CartItem::new("BROKEN", gbp(1_700), gbp(1_700)).with_discounts([
            RuleDiscount::new(AFFILIATE, gbp(1_000), gbp(1_000)),
            RuleDiscount::new(COUPON, Money::from_minor(700, USD), gbp(700)),
        ]);
        let mut assignment =
            ShippingAssignment::new(vec![broken.clone(), stacked_item("SKU", 1_000, 700)]);
        let mut totals = totals(3_400)?;

        let report = reconciler.reconcile(
            &mut RequestScope::new(),
            &Quote::with_coupon("COUPON10"),
            &mut assignment,
            &mut totals,
        );

        assert_eq!(report.items_adjusted, 1);
        assert_eq!(report.adjustment, gbp(700));
        assert_eq!(assignment.items().first(), Some(&broken));
        assert_eq!(totals.discount, gbp(-2_700));

        Ok(())
    }

    #[test]
    fn items_without_overlap_are_unchanged() -> TestResult {
        let reconciler = Reconciler::new(
            affiliate_rules(RuleIdSet::from([AFFILIATE])),
            rule_source(vec![RuleRecord::new(COUPON, CouponType::SpecificCoupon)]),
        );
        let mut assignment = ShippingAssignment::new(vec![
            CartItem::new("AFFILIATE-ONLY", gbp(500), gbp(500))
                .with_discounts([RuleDiscount::new(AFFILIATE, gbp(500), gbp(500))]),
            CartItem::new("COUPON-ONLY", gbp(300), gbp(300))
                .with_discounts([RuleDiscount::new(COUPON, gbp(300), gbp(300))]),
        ]);
        let mut totals = totals(800)?;

        let report = reconciler.reconcile(
            &mut RequestScope::new(),
            &Quote::with_coupon("COUPON10"),
            &mut assignment,
            &mut totals,
        );

        assert_eq!(report.outcome, ReconciliationOutcome::Unchanged);
        assert_eq!(totals.discount, gbp(-800));

        Ok(())
    }
}
