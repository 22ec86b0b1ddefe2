//! Per-item stacking resolution

use rusty_money::{Money, MoneyError, iso::Currency};

use crate::{
    cart::{CartItem, RuleDiscount},
    rules::RuleIdSet,
};

/// Which side of a stacked discount a rule belongs to.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RuleCategory {
    /// Rules attributed to the resolved affiliate
    Affiliate,

    /// Rules that require a coupon code
    Coupon,
}

/// Running sum of one category's discounts on an item.
#[derive(Copy, Clone, Debug)]
struct DiscountBucket<'a> {
    amount: Money<'a, Currency>,
    base_amount: Money<'a, Currency>,
}

impl<'a> DiscountBucket<'a> {
    fn empty(item: &CartItem<'a>) -> Self {
        Self {
            amount: Money::from_minor(0, item.discount_amount().currency()),
            base_amount: Money::from_minor(0, item.base_discount_amount().currency()),
        }
    }

    fn add(&mut self, discount: &RuleDiscount<'a>) -> Result<(), MoneyError> {
        self.amount = self.amount.add(discount.amount)?;
        self.base_amount = self.base_amount.add(discount.base_amount)?;

        Ok(())
    }

    fn is_positive(&self) -> bool {
        self.amount.to_minor_units() > 0
    }
}

/// The change to apply to one item so only the larger of its affiliate and coupon
/// discounts survives.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ItemPlan<'a> {
    /// Discount to remove in the quote currency
    pub adjustment: Money<'a, Currency>,

    /// Discount to remove in the base currency
    pub base_adjustment: Money<'a, Currency>,

    /// Category whose records are dropped
    pub losing: RuleCategory,

    discount_amount: Money<'a, Currency>,
    base_discount_amount: Money<'a, Currency>,
}

impl<'a> ItemPlan<'a> {
    /// Work out how to resolve stacking on `item`.
    ///
    /// Returns `Ok(None)` when the item has no breakdown, or when either category
    /// contributed nothing. Ties keep the affiliate discount.
    ///
    /// # Errors
    ///
    /// Returns a [`MoneyError`] if the item's amounts mix currencies.
    pub fn for_item(
        item: &CartItem<'a>,
        affiliate_rules: &RuleIdSet,
        coupon_rules: &RuleIdSet,
    ) -> Result<Option<Self>, MoneyError> {
        if item.discounts().is_empty() {
            return Ok(None);
        }

        let mut affiliate = DiscountBucket::empty(item);
        let mut coupon = DiscountBucket::empty(item);

        for discount in item.discounts() {
            if affiliate_rules.contains(discount.rule_id) {
                affiliate.add(discount)?;
            } else if coupon_rules.contains(discount.rule_id) {
                coupon.add(discount)?;
            }
        }

        if !affiliate.is_positive() || !coupon.is_positive() {
            return Ok(None);
        }

        let adjustment = smaller(affiliate.amount, coupon.amount);
        let base_adjustment = smaller(affiliate.base_amount, coupon.base_amount);

        let losing = if affiliate.amount.to_minor_units() >= coupon.amount.to_minor_units() {
            RuleCategory::Coupon
        } else {
            RuleCategory::Affiliate
        };

        Ok(Some(Self {
            adjustment,
            base_adjustment,
            losing,
            discount_amount: item.discount_amount().sub(adjustment)?,
            base_discount_amount: item.base_discount_amount().sub(base_adjustment)?,
        }))
    }

    /// Write the plan back to the item it was computed for.
    pub fn apply(
        &self,
        item: &mut CartItem<'a>,
        affiliate_rules: &RuleIdSet,
        coupon_rules: &RuleIdSet,
    ) {
        item.set_discount_amounts(self.discount_amount, self.base_discount_amount);

        let losing_rules = match self.losing {
            RuleCategory::Affiliate => affiliate_rules,
            RuleCategory::Coupon => coupon_rules,
        };

        item.remove_rules(losing_rules);
    }
}

fn smaller<'a>(left: Money<'a, Currency>, right: Money<'a, Currency>) -> Money<'a, Currency> {
    if left.to_minor_units() <= right.to_minor_units() {
        left
    } else {
        right
    }
}
