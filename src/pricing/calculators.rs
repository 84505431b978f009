//! Core pricing calculation functions.
//!
//! Pure functions for pricing math - no database access.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::*;
use rust_decimal::Decimal;

use crate::schedule::{DiscountEvaluator, DiscountPhase, DiscountWindow};

use super::models::{PriceFields, PriceQuote};

/// Round to specified decimal places using banker's rounding (ROUND_HALF_EVEN).
///
/// Banker's rounding rounds to the nearest even number when the value is exactly
/// halfway between two possibilities. This reduces cumulative rounding bias.
///
/// # Examples
/// ```
/// use rust_decimal_macros::dec;
/// use surplus_web::pricing::round_money;
///
/// assert_eq!(round_money(dec!(2.5), 0), dec!(2));   // rounds to even
/// assert_eq!(round_money(dec!(3.5), 0), dec!(4));   // rounds to even
/// assert_eq!(round_money(dec!(1.234), 2), dec!(1.23));
/// ```
pub fn round_money(amount: Decimal, places: u32) -> Decimal {
    amount.round_dp_with_strategy(places, RoundingStrategy::MidpointNearestEven)
}

/// Round a percentage to a whole number, halves away from zero
pub fn round_percent(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

/// The discount price if it is a real reduction of the regular price.
///
/// Missing, negative, or not-lower discount prices mean "no discount".
pub fn effective_discount(regular: Decimal, discount: Option<Decimal>) -> Option<Decimal> {
    discount.filter(|d| *d >= Decimal::ZERO && *d < regular)
}

/// Discount badge percentage: `round(100 * (1 - discount / regular))`.
///
/// Zero when there is no real discount or the regular price is zero.
pub fn discount_percentage(regular: Decimal, discount: Option<Decimal>) -> u32 {
    if regular <= Decimal::ZERO {
        return 0;
    }
    let Some(discount) = effective_discount(regular, discount) else {
        return 0;
    };

    let percent = round_percent(Decimal::ONE_HUNDRED * (Decimal::ONE - discount / regular));
    percent.to_u32().unwrap_or(0)
}

/// Combines the discount window decision with the product's prices
#[derive(Debug, Clone, Copy, Default)]
pub struct PricingResolver {
    evaluator: DiscountEvaluator,
}

impl PricingResolver {
    pub fn new(evaluator: DiscountEvaluator) -> Self {
        Self { evaluator }
    }

    /// Quote the price charged at `now`.
    ///
    /// `window` of `None` means the discount is not time-restricted.
    pub fn quote(
        &self,
        fields: &PriceFields,
        window: Option<&DiscountWindow>,
        now: DateTime<Utc>,
    ) -> PriceQuote {
        let phase = if effective_discount(fields.regular_price, fields.discount_price).is_some() {
            self.evaluator.phase(window, now)
        } else {
            DiscountPhase::Inactive
        };
        build_quote(fields, phase)
    }

    /// Quote at regular price, for items whose window could not be decoded
    pub fn quote_without_discount(&self, fields: &PriceFields) -> PriceQuote {
        build_quote(fields, DiscountPhase::Inactive)
    }
}

fn build_quote(fields: &PriceFields, phase: DiscountPhase) -> PriceQuote {
    PriceQuote {
        regular_price: round_money(fields.regular_price, 2),
        discount_price: fields.discount_price.map(|d| round_money(d, 2)),
        is_discount_active: phase.is_active(),
        discount_phase: phase,
        unit: fields.unit.clone(),
    }
}
