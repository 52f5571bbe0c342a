//! Rounding policy for monetary amounts.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::{EngineError, EngineResult};

/// Default number of decimal places kept on every amount.
pub const DEFAULT_AMOUNT_SCALE: u32 = 2;

/// Rounds an amount to `scale` decimal places, halves away from zero.
///
/// # Example
///
/// ```
/// use payroll_engine::calculation::round_amount;
/// use rust_decimal::Decimal;
/// use std::str::FromStr;
///
/// assert_eq!(round_amount(Decimal::from_str("107.025").unwrap(), 2), Decimal::from_str("107.03").unwrap());
/// assert_eq!(round_amount(Decimal::from_str("-0.005").unwrap(), 2), Decimal::from_str("-0.01").unwrap());
/// ```
pub fn round_amount(value: Decimal, scale: u32) -> Decimal {
    value.round_dp_with_strategy(scale, RoundingStrategy::MidpointAwayFromZero)
}

fn out_of_range(what: &str) -> EngineError {
    EngineError::invalid_input(format!("{} is out of range", what))
}

/// `lhs * rhs`, or `InvalidInput` naming `what` on overflow.
pub(crate) fn checked_mul(lhs: Decimal, rhs: Decimal, what: &str) -> EngineResult<Decimal> {
    lhs.checked_mul(rhs).ok_or_else(|| out_of_range(what))
}

/// `lhs / rhs`, or `InvalidInput` naming `what` on overflow or a zero divisor.
pub(crate) fn checked_div(lhs: Decimal, rhs: Decimal, what: &str) -> EngineResult<Decimal> {
    lhs.checked_div(rhs).ok_or_else(|| out_of_range(what))
}

/// Sums `values`, or `InvalidInput` naming `what` on overflow.
pub(crate) fn checked_sum(
    values: impl IntoIterator<Item = Decimal>,
    what: &str,
) -> EngineResult<Decimal> {
    values.into_iter().try_fold(Decimal::ZERO, |total, value| {
        total.checked_add(value).ok_or_else(|| out_of_range(what))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_rounds_half_away_from_zero() {
        assert_eq!(round_amount(dec("324.6425"), 2), dec("324.64"));
        assert_eq!(round_amount(dec("324.645"), 2), dec("324.65"));
        assert_eq!(round_amount(dec("-324.645"), 2), dec("-324.65"));
    }

    #[test]
    fn test_keeps_short_values_unchanged() {
        assert_eq!(round_amount(dec("290"), 2), dec("290"));
        assert_eq!(round_amount(dec("0.1"), 2), dec("0.1"));
    }

    #[test]
    fn test_checked_helpers_report_overflow() {
        let err = checked_mul(Decimal::MAX, dec("2"), "overtime pay").unwrap_err();
        assert_eq!(err.code(), "INVALID_INPUT");
        assert!(err.to_string().contains("overtime pay is out of range"));

        assert!(checked_div(dec("1"), Decimal::ZERO, "ratio").is_err());
        assert!(checked_sum([Decimal::MAX, Decimal::ONE], "taxable income").is_err());
        assert_eq!(checked_sum([dec("1.5"), dec("-0.5")], "sum").unwrap(), dec("1"));
        assert_eq!(checked_mul(dec("8"), dec("1.5"), "pay").unwrap(), dec("12"));
    }
}
