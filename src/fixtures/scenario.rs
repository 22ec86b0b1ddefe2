//! Checkout Scenario Fixtures

use rustc_hash::FxHashMap;
use serde::Deserialize;

use crate::{
    cart::{CartItem, RuleDiscount},
    fixtures::{FixtureError, prices::parse_price},
    rules::{CouponType, RuleIdSet},
};

/// A checkout scenario as written in YAML.
#[derive(Debug, Deserialize)]
pub struct ScenarioFixture {
    /// Coupon code on the quote
    #[serde(default)]
    pub coupon_code: Option<String>,

    /// Active affiliate rule identifiers
    #[serde(default)]
    pub affiliate_rules: Vec<u32>,

    /// Rule identifier -> coupon type for every non-affiliate rule
    #[serde(default)]
    pub rules: FxHashMap<u32, CouponTypeFixture>,

    /// Address totals before reconciliation
    pub totals: TotalsFixture,

    /// Items assigned to the address
    #[serde(default)]
    pub items: Vec<ItemFixture>,

    /// Expected state after reconciliation
    pub expected: ExpectedFixture,
}

/// Coupon type names
#[derive(Copy, Clone, Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CouponTypeFixture {
    /// Automatic rule
    NoCoupon,

    /// Specific coupon code
    SpecificCoupon,

    /// Auto-generated coupon codes
    Auto,
}

impl From<CouponTypeFixture> for CouponType {
    fn from(fixture: CouponTypeFixture) -> Self {
        match fixture {
            CouponTypeFixture::NoCoupon => Self::NoCoupon,
            CouponTypeFixture::SpecificCoupon => Self::SpecificCoupon,
            CouponTypeFixture::Auto => Self::Auto,
        }
    }
}

/// Address totals (prices such as `"-17.00 GBP"`)
#[derive(Debug, Deserialize)]
pub struct TotalsFixture {
    /// Subtotal
    pub subtotal: String,

    /// Base subtotal
    pub base_subtotal: String,

    /// Discount total (negative)
    pub discount: String,

    /// Base discount total (negative)
    pub base_discount: String,
}

/// Per-rule discount record
#[derive(Debug, Deserialize)]
pub struct RuleDiscountFixture {
    /// Rule identifier
    pub rule: u32,

    /// Amount
    pub amount: String,

    /// Base amount
    pub base_amount: String,
}

/// Cart item
#[derive(Debug, Deserialize)]
pub struct ItemFixture {
    /// Item SKU
    pub sku: String,

    /// Item discount
    pub discount: String,

    /// Item base discount
    pub base_discount: String,

    /// Comma-separated applied rule identifiers
    #[serde(default)]
    pub applied_rule_ids: String,

    /// Per-rule discount breakdown
    #[serde(default)]
    pub discounts: Vec<RuleDiscountFixture>,

    /// Whether child discounts were calculated individually
    #[serde(default)]
    pub children_calculated: bool,

    /// Child items
    #[serde(default)]
    pub children: Vec<ItemFixture>,
}

impl TryFrom<ItemFixture> for CartItem<'static> {
    type Error = FixtureError;

    fn try_from(fixture: ItemFixture) -> Result<Self, Self::Error> {
        let discounts = fixture
            .discounts
            .iter()
            .map(|discount| {
                Ok::<_, FixtureError>(RuleDiscount::new(
                    discount.rule,
                    parse_price(&discount.amount)?,
                    parse_price(&discount.base_amount)?,
                ))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let children = fixture
            .children
            .into_iter()
            .map(CartItem::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        let applied_rule_ids = fixture
            .applied_rule_ids
            .parse::<RuleIdSet>()
            .unwrap_or_default();

        Ok(CartItem::new(
            fixture.sku,
            parse_price(&fixture.discount)?,
            parse_price(&fixture.base_discount)?,
        )
        .with_applied_rule_ids(applied_rule_ids)
        .with_discounts(discounts)
        .with_children(children, fixture.children_calculated))
    }
}

/// Expected outcome of reconciling a scenario
#[derive(Debug, Deserialize)]
pub struct ExpectedFixture {
    /// Outcome name: `reconciled`, `unchanged`, or `skipped_<reason>`
    pub outcome: String,

    /// Released discount
    pub adjustment: String,

    /// Released base discount
    pub base_adjustment: String,

    /// Address totals afterwards
    pub totals: ExpectedTotalsFixture,

    /// SKU -> item state afterwards
    #[serde(default)]
    pub items: FxHashMap<String, ExpectedItemFixture>,
}

/// Expected address totals
#[derive(Debug, Deserialize)]
pub struct ExpectedTotalsFixture {
    /// Discount total
    pub discount: String,

    /// Base discount total
    pub base_discount: String,

    /// Subtotal after discount
    pub subtotal_with_discount: String,

    /// Base subtotal after discount
    pub base_subtotal_with_discount: String,
}

/// Expected item state
#[derive(Debug, Deserialize)]
pub struct ExpectedItemFixture {
    /// Item discount
    pub discount: String,

    /// Item base discount
    pub base_discount: String,

    /// Comma-separated applied rule identifiers
    pub applied_rule_ids: String,
}
