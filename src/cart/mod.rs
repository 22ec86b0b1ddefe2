//! Cart
//!
//! The slice of the checkout object model the patches read and mutate: the quote's
//! coupon code, the items assigned to an address, and the address totals.

pub mod items;
pub mod totals;

pub use items::{CartItem, RuleDiscount, RuleDiscounts};
pub use totals::Totals;

/// Quote-level state consulted during totals collection.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Quote {
    /// Coupon code entered by the customer
    pub coupon_code: Option<String>,
}

impl Quote {
    /// Create a quote with the given coupon code.
    pub fn with_coupon(code: impl Into<String>) -> Self {
        Self {
            coupon_code: Some(code.into()),
        }
    }

    /// Whether a non-empty coupon code is applied.
    pub fn has_coupon_code(&self) -> bool {
        self.coupon_code
            .as_deref()
            .is_some_and(|code| !code.is_empty())
    }
}

/// Items assigned to a single shipping address.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ShippingAssignment<'a> {
    items: Vec<CartItem<'a>>,
}

impl<'a> ShippingAssignment<'a> {
    /// Create an assignment over the given items.
    pub fn new(items: Vec<CartItem<'a>>) -> Self {
        Self { items }
    }

    /// Top-level items
    pub fn items(&self) -> &[CartItem<'a>] {
        &self.items
    }

    /// Whether there are no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Items that carry their own discounts: children of parents whose children were
    /// calculated individually, and every other top-level item.
    pub fn calculated_items(&self) -> Vec<&CartItem<'a>> {
        let mut calculated = Vec::with_capacity(self.items.len());

        for item in &self.items {
            if item.has_calculated_children() {
                calculated.extend(item.children());
            } else {
                calculated.push(item);
            }
        }

        calculated
    }

    /// Mutable counterpart of [`Self::calculated_items`], yielding items in the same order.
    pub fn calculated_items_mut(&mut self) -> Vec<&mut CartItem<'a>> {
        let mut calculated = Vec::with_capacity(self.items.len());

        for item in &mut self.items {
            if item.has_calculated_children() {
                calculated.extend(item.children_mut().iter_mut());
            } else {
                calculated.push(item);
            }
        }

        calculated
    }
}
