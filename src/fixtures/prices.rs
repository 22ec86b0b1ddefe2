//! Price Fixtures

use rust_decimal::{Decimal, prelude::ToPrimitive};
use rusty_money::{
    Money,
    iso::{Currency, EUR, GBP, USD},
};

use crate::fixtures::FixtureError;

/// Parse a price string (e.g. `"7.00 GBP"` or `"-17.00 GBP"`) into money.
///
/// # Errors
///
/// Returns an error if the string is not in the format "AMOUNT CURRENCY", if the
/// amount is not a decimal number, or if the currency code is not recognised.
pub fn parse_price(s: &str) -> Result<Money<'static, Currency>, FixtureError> {
    let mut parts = s.split_whitespace();

    let (Some(amount), Some(currency_code), None) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(FixtureError::InvalidPrice(format!(
            "Expected format 'AMOUNT CURRENCY', got: {s}"
        )));
    };

    let minor_units = amount
        .parse::<Decimal>()
        .map_err(|_err| FixtureError::InvalidPrice(s.to_string()))?
        .checked_mul(Decimal::new(100, 0))
        .and_then(|value| value.round_dp(0).to_i64())
        .ok_or_else(|| FixtureError::InvalidPrice(s.to_string()))?;

    Ok(Money::from_minor(minor_units, parse_currency(currency_code)?))
}

/// Look up a supported ISO currency by code.
///
/// # Errors
///
/// Returns [`FixtureError::UnknownCurrency`] for unsupported codes.
pub fn parse_currency(code: &str) -> Result<&'static Currency, FixtureError> {
    match code {
        "GBP" => Ok(GBP),
        "USD" => Ok(USD),
        "EUR" => Ok(EUR),
        other => Err(FixtureError::UnknownCurrency(other.to_string())),
    }
}
