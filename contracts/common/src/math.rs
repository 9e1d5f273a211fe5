//! Fixed-Point Math for the CDP Strategy
//!
//! All ratios, prices and percentages are 1e18-scaled (`WAD` = 100%).
//! Every product is computed in 256 bits and every quotient truncates toward
//! zero; the debt-floor and minimum-collateral checks depend on that
//! rounding direction, so nothing here rounds up.

use primitive_types::U256;

use crate::constants::scale::{BPS, NO_DEBT_RATIO, WAD};
use crate::errors::{StrategyError, StrategyResult};

/// Compute `a * b / denominator` with a 256-bit intermediate.
///
/// Truncates toward zero. Fails with `DivisionByZero` when the denominator
/// is zero and `Overflow` when the quotient does not fit in `u128`.
pub fn mul_div(a: u128, b: u128, denominator: u128) -> StrategyResult<u128> {
    if denominator == 0 {
        return Err(StrategyError::DivisionByZero);
    }

    let product = U256::from(a)
        .checked_mul(U256::from(b))
        .ok_or(StrategyError::Overflow)?;
    let quotient = product / U256::from(denominator);

    if quotient > U256::from(u128::MAX) {
        return Err(StrategyError::Overflow);
    }
    Ok(quotient.low_u128())
}

/// Multiply two 1e18-scaled values
pub fn wad_mul(a: u128, b: u128) -> StrategyResult<u128> {
    mul_div(a, b, WAD)
}

/// Reject a zero price before it reaches any ratio arithmetic
pub fn require_price(price: u128) -> StrategyResult<u128> {
    if price == 0 {
        return Err(StrategyError::InvalidPrice { price });
    }
    Ok(price)
}

/// Convert a base-asset amount into investment-asset units
///
/// `base_amount * price / 1e18`, where `price` is investment units per one
/// base unit.
pub fn to_investment(base_amount: u128, price: u128) -> StrategyResult<u128> {
    mul_div(base_amount, require_price(price)?, WAD)
}

/// Convert an investment-asset amount into base-asset units
///
/// `investment_amount * 1e18 / price`
pub fn to_base(investment_amount: u128, price: u128) -> StrategyResult<u128> {
    mul_div(investment_amount, WAD, require_price(price)?)
}

/// Calculate the collateralization ratio of a position
///
/// `to_investment(collateral, price) * 1e18 / debt`. Returns
/// `NO_DEBT_RATIO` when there is no debt.
pub fn collateral_ratio(collateral: u128, debt: u128, price: u128) -> StrategyResult<u128> {
    if debt == 0 {
        return Ok(NO_DEBT_RATIO);
    }
    let collateral_value = to_investment(collateral, price)?;
    mul_div(collateral_value, WAD, debt)
}

/// Debt level that puts `collateral` exactly at `ratio`
///
/// `to_investment(collateral, price) * 1e18 / ratio`
pub fn debt_at_ratio(collateral: u128, price: u128, ratio: u128) -> StrategyResult<u128> {
    let collateral_value = to_investment(collateral, price)?;
    mul_div(collateral_value, WAD, ratio)
}

/// Minimum collateral that keeps `debt` at `ratio`
///
/// `ratio * debt / 1e18 * 1e18 / price`, truncating at each step.
pub fn collateral_for_ratio(debt: u128, price: u128, ratio: u128) -> StrategyResult<u128> {
    let required_value = wad_mul(ratio, debt)?;
    to_base(required_value, price)
}

/// Reduce an amount by a basis-point loss tolerance
///
/// `amount * (10_000 - max_loss_bps) / 10_000`; tolerances above 100% clamp
/// to zero.
pub fn apply_max_loss(amount: u128, max_loss_bps: u64) -> StrategyResult<u128> {
    let kept = BPS.saturating_sub(max_loss_bps as u128);
    mul_div(amount, kept, BPS)
}

/// Safe addition with overflow check
pub fn safe_add(a: u128, b: u128) -> StrategyResult<u128> {
    a.checked_add(b).ok_or(StrategyError::Overflow)
}

/// Safe subtraction with underflow check
pub fn safe_sub(a: u128, b: u128) -> StrategyResult<u128> {
    a.checked_sub(b).ok_or(StrategyError::Underflow)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ONE: u128 = WAD;
    const PRICE_2000: u128 = 2_000 * WAD;

    #[test]
    fn test_unit_conversion() {
        // 10 base at 2000 = 20,000 investment
        assert_eq!(to_investment(10 * ONE, PRICE_2000).unwrap(), 20_000 * ONE);
        // 20,000 investment at 2000 = 10 base
        assert_eq!(to_base(20_000 * ONE, PRICE_2000).unwrap(), 10 * ONE);
    }

    #[test]
    fn test_conversion_truncates() {
        // 1 wei of investment is worth less than 1 wei of base at price 2000
        assert_eq!(to_base(1, PRICE_2000).unwrap(), 0);
        assert_eq!(to_base(1_999, PRICE_2000).unwrap(), 0);
        assert_eq!(to_base(2_000, PRICE_2000).unwrap(), 1);
    }

    #[test]
    fn test_zero_price_rejected() {
        assert_eq!(to_base(ONE, 0), Err(StrategyError::InvalidPrice { price: 0 }));
        assert_eq!(to_investment(ONE, 0), Err(StrategyError::InvalidPrice { price: 0 }));
        assert!(collateral_ratio(ONE, ONE, 0).is_err());
    }

    #[test]
    fn test_large_amounts_do_not_overflow() {
        // 1e30 base at a 1e24 price: the product is 1e54, far above u128
        let amount = 1_000_000_000_000 * ONE;
        let price = 1_000_000 * ONE;
        let value = to_investment(amount, price).unwrap();
        assert_eq!(value, 1_000_000_000_000_000_000 * ONE);
        assert_eq!(to_base(value, price).unwrap(), amount);
    }

    #[test]
    fn test_quotient_overflow_reported() {
        assert_eq!(mul_div(u128::MAX, 2, 1), Err(StrategyError::Overflow));
        assert_eq!(mul_div(1, 1, 0), Err(StrategyError::DivisionByZero));
    }

    #[test]
    fn test_collateral_ratio() {
        // 10 base at 2000 backing 8000 debt = 250%
        let ratio = collateral_ratio(10 * ONE, 8_000 * ONE, PRICE_2000).unwrap();
        assert_eq!(ratio, ONE * 250 / 100);

        // 12,000 debt = 166.66..%, truncated
        let ratio = collateral_ratio(10 * ONE, 12_000 * ONE, PRICE_2000).unwrap();
        assert_eq!(ratio, 1_666_666_666_666_666_666);
    }

    #[test]
    fn test_collateral_ratio_zero_debt() {
        assert_eq!(collateral_ratio(10 * ONE, 0, PRICE_2000).unwrap(), NO_DEBT_RATIO);
        assert_eq!(collateral_ratio(0, 0, PRICE_2000).unwrap(), NO_DEBT_RATIO);
    }

    #[test]
    fn test_collateral_ratio_matches_formula() {
        let cases = [
            (10 * ONE, 8_000 * ONE, PRICE_2000),
            (3 * ONE + 7, 1_234 * ONE + 99, 1_850 * ONE + 3),
            (1, 1, 1),
            (123_456_789 * ONE, 987_654 * ONE, 17 * ONE),
        ];
        for (collateral, debt, price) in cases {
            let wad = U256::from(ONE);
            let value = U256::from(collateral) * U256::from(price) / wad;
            let expected = (value * wad / U256::from(debt)).low_u128();
            assert_eq!(collateral_ratio(collateral, debt, price).unwrap(), expected);
        }
    }

    #[test]
    fn test_debt_at_ratio() {
        // 10 base at 2000 and a 200% target supports 10,000 debt
        assert_eq!(debt_at_ratio(10 * ONE, PRICE_2000, 2 * ONE).unwrap(), 10_000 * ONE);
    }

    #[test]
    fn test_collateral_for_ratio() {
        // 8,000 debt at 170% needs 13,600 of value = 6.8 base at 2000
        let needed = collateral_for_ratio(8_000 * ONE, PRICE_2000, ONE * 170 / 100).unwrap();
        assert_eq!(needed, 68 * ONE / 10);
    }

    #[test]
    fn test_apply_max_loss() {
        assert_eq!(apply_max_loss(10_000, 1).unwrap(), 9_999);
        assert_eq!(apply_max_loss(10_000, 0).unwrap(), 10_000);
        assert_eq!(apply_max_loss(10_000, 10_000).unwrap(), 0);
        assert_eq!(apply_max_loss(10_000, 20_000).unwrap(), 0);
    }

    #[test]
    fn test_safe_math() {
        assert_eq!(safe_add(1, 2).unwrap(), 3);
        assert_eq!(safe_add(u128::MAX, 1), Err(StrategyError::Overflow));
        assert_eq!(safe_sub(1, 2), Err(StrategyError::Underflow));
    }
}
