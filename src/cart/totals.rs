//! Cart Totals

use rusty_money::{Money, MoneyError, iso::Currency};

/// Address-level totals written by the discount collector.
///
/// Discount totals are negative, matching how the checkout pipeline stores them, so
/// `subtotal_with_discount == subtotal + discount`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Totals<'a> {
    /// Subtotal in the quote currency
    pub subtotal: Money<'a, Currency>,

    /// Subtotal in the base currency
    pub base_subtotal: Money<'a, Currency>,

    /// Discount total in the quote currency (zero or negative)
    pub discount: Money<'a, Currency>,

    /// Discount total in the base currency (zero or negative)
    pub base_discount: Money<'a, Currency>,

    /// Subtotal after discount in the quote currency
    pub subtotal_with_discount: Money<'a, Currency>,

    /// Subtotal after discount in the base currency
    pub base_subtotal_with_discount: Money<'a, Currency>,
}

impl<'a> Totals<'a> {
    /// Build totals from subtotals and (negative) discount totals, deriving the
    /// subtotal-with-discount fields.
    ///
    /// # Errors
    ///
    /// Returns a [`MoneyError`] if a subtotal and its discount use different currencies.
    pub fn new(
        subtotal: Money<'a, Currency>,
        base_subtotal: Money<'a, Currency>,
        discount: Money<'a, Currency>,
        base_discount: Money<'a, Currency>,
    ) -> Result<Self, MoneyError> {
        Ok(Self {
            subtotal,
            base_subtotal,
            discount,
            base_discount,
            subtotal_with_discount: subtotal.add(discount)?,
            base_subtotal_with_discount: base_subtotal.add(base_discount)?,
        })
    }

    /// Quote currency
    pub fn currency(&self) -> &'a Currency {
        self.discount.currency()
    }

    /// Base currency
    pub fn base_currency(&self) -> &'a Currency {
        self.base_discount.currency()
    }

    /// Give back `adjustment` (and `base_adjustment`) of previously collected
    /// discount, then recompute the subtotal-with-discount fields.
    ///
    /// Either every field is updated or none is.
    ///
    /// # Errors
    ///
    /// Returns a [`MoneyError`] if an adjustment is in the wrong currency.
    pub fn release_discount(
        &mut self,
        adjustment: Money<'a, Currency>,
        base_adjustment: Money<'a, Currency>,
    ) -> Result<(), MoneyError> {
        let discount = self.discount.add(adjustment)?;
        let base_discount = self.base_discount.add(base_adjustment)?;

        let subtotal_with_discount = self.subtotal.add(discount)?;
        let base_subtotal_with_discount = self.base_subtotal.add(base_discount)?;

        self.discount = discount;
        self.base_discount = base_discount;
        self.subtotal_with_discount = subtotal_with_discount;
        self.base_subtotal_with_discount = base_subtotal_with_discount;

        Ok(())
    }
}
