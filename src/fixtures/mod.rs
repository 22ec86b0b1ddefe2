//! Fixtures
//!
//! YAML checkout scenarios used to drive the reconciliation pass end to end.

use std::{cell::Cell, fs, path::PathBuf};

use rustc_hash::FxHashMap;
use rusty_money::{Money, MoneyError, iso::Currency};
use thiserror::Error;

use crate::{
    cart::{CartItem, Quote, ShippingAssignment, Totals},
    fixtures::{
        prices::parse_price,
        scenario::{ExpectedFixture, ScenarioFixture},
    },
    rules::{
        AffiliateRuleResolver, RuleId, RuleIdSet, RuleMetadataSource, RuleQueryError, RuleRecord,
    },
};

pub mod prices;
pub mod scenario;

/// Fixture Parsing Errors
#[derive(Debug, Error)]
pub enum FixtureError {
    /// IO error reading fixture files
    #[error("Failed to read fixture file: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_norway::Error),

    /// Invalid price format
    #[error("Invalid price format: {0}")]
    InvalidPrice(String),

    /// Unknown currency code
    #[error("Unknown currency code: {0}")]
    UnknownCurrency(String),

    /// Totals mix currencies
    #[error("Invalid totals: {0}")]
    Money(#[from] MoneyError),
}

/// Scenario loader rooted at a fixture directory.
#[derive(Debug, Clone)]
pub struct Fixture {
    base_path: PathBuf,
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new()
    }
}

impl Fixture {
    /// Create a loader with the default base path
    pub fn new() -> Self {
        Self::with_base_path("./fixtures")
    }

    /// Create a loader with a custom base path
    pub fn with_base_path(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Load `scenarios/{name}.yml`
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if any price in it
    /// is malformed.
    pub fn load_scenario(&self, name: &str) -> Result<Scenario, FixtureError> {
        let file_path = self.base_path.join("scenarios").join(format!("{name}.yml"));

        Scenario::from_yaml(&fs::read_to_string(file_path)?)
    }
}

/// In-memory rule collaborators backed by a scenario's rule table.
#[derive(Debug, Default)]
pub struct ScenarioRules {
    affiliate: RuleIdSet,
    records: Vec<RuleRecord>,
    queries: Cell<usize>,
}

impl ScenarioRules {
    /// Create rule collaborators from the active affiliate rules and known rule records.
    pub fn new(affiliate: RuleIdSet, records: Vec<RuleRecord>) -> Self {
        Self {
            affiliate,
            records,
            queries: Cell::new(0),
        }
    }

    /// Number of metadata queries served so far.
    pub fn queries(&self) -> usize {
        self.queries.get()
    }
}

impl AffiliateRuleResolver for ScenarioRules {
    fn resolve_rule_ids(&self) -> RuleIdSet {
        self.affiliate.clone()
    }
}

impl RuleMetadataSource for ScenarioRules {
    fn rules_by_ids(&self, ids: &RuleIdSet) -> Result<Vec<RuleRecord>, RuleQueryError> {
        self.queries.set(self.queries.get() + 1);

        Ok(self
            .records
            .iter()
            .filter(|record| ids.contains(record.id))
            .copied()
            .collect())
    }
}

/// Expected totals after reconciliation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExpectedTotals {
    /// Discount total
    pub discount: Money<'static, Currency>,

    /// Base discount total
    pub base_discount: Money<'static, Currency>,

    /// Subtotal after discount
    pub subtotal_with_discount: Money<'static, Currency>,

    /// Base subtotal after discount
    pub base_subtotal_with_discount: Money<'static, Currency>,
}

/// Expected state of one item after reconciliation.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpectedItem {
    /// Item discount
    pub discount: Money<'static, Currency>,

    /// Item base discount
    pub base_discount: Money<'static, Currency>,

    /// Applied rule identifiers
    pub applied_rule_ids: RuleIdSet,
}

/// Everything a scenario expects reconciliation to produce.
#[derive(Debug, Clone)]
pub struct Expectation {
    /// Outcome name as reported by [`crate::reconciliation::ReconciliationOutcome::as_str`]
    pub outcome: String,

    /// Released discount
    pub adjustment: Money<'static, Currency>,

    /// Released base discount
    pub base_adjustment: Money<'static, Currency>,

    /// Address totals
    pub totals: ExpectedTotals,

    /// Item state by SKU
    pub items: FxHashMap<String, ExpectedItem>,
}

impl TryFrom<ExpectedFixture> for Expectation {
    type Error = FixtureError;

    fn try_from(fixture: ExpectedFixture) -> Result<Self, Self::Error> {
        let items = fixture
            .items
            .into_iter()
            .map(|(sku, item)| {
                let expected = ExpectedItem {
                    discount: parse_price(&item.discount)?,
                    base_discount: parse_price(&item.base_discount)?,
                    applied_rule_ids: item.applied_rule_ids.parse().unwrap_or_default(),
                };

                Ok::<_, FixtureError>((sku, expected))
            })
            .collect::<Result<FxHashMap<_, _>, _>>()?;

        Ok(Self {
            outcome: fixture.outcome,
            adjustment: parse_price(&fixture.adjustment)?,
            base_adjustment: parse_price(&fixture.base_adjustment)?,
            totals: ExpectedTotals {
                discount: parse_price(&fixture.totals.discount)?,
                base_discount: parse_price(&fixture.totals.base_discount)?,
                subtotal_with_discount: parse_price(&fixture.totals.subtotal_with_discount)?,
                base_subtotal_with_discount: parse_price(
                    &fixture.totals.base_subtotal_with_discount,
                )?,
            },
            items,
        })
    }
}

/// A checkout ready to be reconciled, plus what should come out of it.
#[derive(Debug)]
pub struct Scenario {
    /// Quote
    pub quote: Quote,

    /// Address items
    pub assignment: ShippingAssignment<'static>,

    /// Address totals
    pub totals: Totals<'static>,

    /// Rule collaborators
    pub rules: ScenarioRules,

    /// Expected result
    pub expected: Expectation,
}

impl Scenario {
    /// Build a scenario from YAML source.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is malformed, a price cannot be parsed, or the
    /// totals mix currencies.
    pub fn from_yaml(source: &str) -> Result<Self, FixtureError> {
        let fixture: ScenarioFixture = serde_norway::from_str(source)?;

        let totals = Totals::new(
            parse_price(&fixture.totals.subtotal)?,
            parse_price(&fixture.totals.base_subtotal)?,
            parse_price(&fixture.totals.discount)?,
            parse_price(&fixture.totals.base_discount)?,
        )?;

        let items = fixture
            .items
            .into_iter()
            .map(CartItem::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        let records = fixture
            .rules
            .into_iter()
            .map(|(id, coupon_type)| RuleRecord::new(id, coupon_type.into()))
            .collect();

        Ok(Self {
            quote: Quote {
                coupon_code: fixture.coupon_code,
            },
            assignment: ShippingAssignment::new(items),
            totals,
            rules: ScenarioRules::new(
                fixture.affiliate_rules.into_iter().map(RuleId::from).collect(),
                records,
            ),
            expected: Expectation::try_from(fixture.expected)?,
        })
    }
}

/// Find an item by SKU, searching children as well.
pub fn find_item<'s, 'a>(items: &'s [CartItem<'a>], sku: &str) -> Option<&'s CartItem<'a>> {
    items.iter().find_map(|item| {
        if item.sku() == sku {
            Some(item)
        } else {
            find_item(item.children(), sku)
        }
    })
}
