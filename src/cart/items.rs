//! Cart Items

use rusty_money::{Money, iso::Currency};
use smallvec::SmallVec;

use crate::rules::{RuleId, RuleIdSet};

/// The discount a single rule contributed to one item.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RuleDiscount<'a> {
    /// Rule that produced the discount
    pub rule_id: RuleId,

    /// Discount in the quote currency
    pub amount: Money<'a, Currency>,

    /// Discount in the store base currency
    pub base_amount: Money<'a, Currency>,
}

impl<'a> RuleDiscount<'a> {
    /// Create a per-rule discount record.
    pub fn new(
        rule_id: impl Into<RuleId>,
        amount: Money<'a, Currency>,
        base_amount: Money<'a, Currency>,
    ) -> Self {
        Self {
            rule_id: rule_id.into(),
            amount,
            base_amount,
        }
    }
}

/// Per-rule discount records attached to an item.
pub type RuleDiscounts<'a> = SmallVec<[RuleDiscount<'a>; 4]>;

/// A checkout line item, possibly the parent of bundled or configurable children.
#[derive(Clone, Debug, PartialEq)]
pub struct CartItem<'a> {
    sku: String,
    discount_amount: Money<'a, Currency>,
    base_discount_amount: Money<'a, Currency>,
    applied_rule_ids: RuleIdSet,
    discounts: RuleDiscounts<'a>,
    children: Vec<CartItem<'a>>,
    children_calculated: bool,
}

impl<'a> CartItem<'a> {
    /// Create an item carrying the given discount totals and no rule breakdown.
    pub fn new(
        sku: impl Into<String>,
        discount_amount: Money<'a, Currency>,
        base_discount_amount: Money<'a, Currency>,
    ) -> Self {
        Self {
            sku: sku.into(),
            discount_amount,
            base_discount_amount,
            applied_rule_ids: RuleIdSet::new(),
            discounts: SmallVec::new(),
            children: Vec::new(),
            children_calculated: false,
        }
    }

    /// Set the per-rule discount breakdown.
    #[must_use]
    pub fn with_discounts(mut self, discounts: impl IntoIterator<Item = RuleDiscount<'a>>) -> Self {
        self.discounts = discounts.into_iter().collect();
        self
    }

    /// Set the applied rule identifiers.
    #[must_use]
    pub fn with_applied_rule_ids(mut self, ids: RuleIdSet) -> Self {
        self.applied_rule_ids = ids;
        self
    }

    /// Attach child items. `calculated` marks whether discounts were computed
    /// per child rather than on the parent.
    #[must_use]
    pub fn with_children(mut self, children: Vec<CartItem<'a>>, calculated: bool) -> Self {
        self.children = children;
        self.children_calculated = calculated;
        self
    }

    /// Item SKU
    pub fn sku(&self) -> &str {
        &self.sku
    }

    /// Total discount in the quote currency
    pub fn discount_amount(&self) -> Money<'a, Currency> {
        self.discount_amount
    }

    /// Total discount in the base currency
    pub fn base_discount_amount(&self) -> Money<'a, Currency> {
        self.base_discount_amount
    }

    /// Rules applied to the item
    pub fn applied_rule_ids(&self) -> &RuleIdSet {
        &self.applied_rule_ids
    }

    /// Per-rule discount breakdown
    pub fn discounts(&self) -> &[RuleDiscount<'a>] {
        &self.discounts
    }

    /// Child items
    pub fn children(&self) -> &[CartItem<'a>] {
        &self.children
    }

    /// Whether discounts live on this item's children instead of the item itself.
    pub fn has_calculated_children(&self) -> bool {
        !self.children.is_empty() && self.children_calculated
    }

    /// Overwrite both discount totals.
    pub fn set_discount_amounts(
        &mut self,
        amount: Money<'a, Currency>,
        base_amount: Money<'a, Currency>,
    ) {
        self.discount_amount = amount;
        self.base_discount_amount = base_amount;
    }

    /// Replace the per-rule discount breakdown.
    pub fn set_discounts(&mut self, discounts: impl IntoIterator<Item = RuleDiscount<'a>>) {
        self.discounts = discounts.into_iter().collect();
    }

    /// Drop every discount record and applied rule belonging to `rules`.
    pub fn remove_rules(&mut self, rules: &RuleIdSet) {
        self.discounts
            .retain(|discount| !rules.contains(discount.rule_id));

        self.applied_rule_ids.remove_all(rules);
    }

    /// Mutable access to child items.
    pub fn children_mut(&mut self) -> &mut [CartItem<'a>] {
        &mut self.children
    }
}
