//! Unit tests for strategy arithmetic
//!
//! Tests cover:
//! - Band classification of collateral ratios
//! - Mint and repay sizing at the reference price
//! - Minimum collateral at the lower band edge

#[cfg(test)]
mod band_tests {
    use crate::constants::scale::{NO_DEBT_RATIO, WAD};
    use crate::math::collateral_ratio;
    use crate::params::StrategyParams;

    const PRICE: u128 = 2_000 * WAD;

    #[test]
    fn test_ratio_above_band() {
        let params = StrategyParams::default();
        let ratio = collateral_ratio(10 * WAD, 8_000 * WAD, PRICE).unwrap();
        assert!(ratio > params.upper_band(), "250% is above 230%");
    }

    #[test]
    fn test_ratio_below_band() {
        let params = StrategyParams::default();
        let ratio = collateral_ratio(10 * WAD, 12_000 * WAD, PRICE).unwrap();
        assert!(ratio < params.lower_band(), "166.7% is below 170%");
    }

    #[test]
    fn test_ratio_inside_band() {
        let params = StrategyParams::default();
        let ratio = collateral_ratio(10 * WAD, 10_000 * WAD, PRICE).unwrap();
        assert!(params.in_band(ratio));
    }

    #[test]
    fn test_no_debt_is_above_any_band() {
        let params = StrategyParams::default();
        assert!(NO_DEBT_RATIO > params.upper_band());
    }
}

#[cfg(test)]
mod sizing_tests {
    use crate::constants::scale::WAD;
    use crate::math::{collateral_for_ratio, collateral_ratio, debt_at_ratio, mul_div};

    const PRICE: u128 = 2_000 * WAD;
    const TARGET: u128 = 2 * WAD;

    #[test]
    fn test_mint_amount_at_250_percent() {
        let debt = 8_000 * WAD;
        let new_debt = debt_at_ratio(10 * WAD, PRICE, TARGET).unwrap();
        assert_eq!(new_debt, 10_000 * WAD);
        assert_eq!(new_debt - debt, 2_000 * WAD);
    }

    #[test]
    fn test_repay_amount_at_166_percent() {
        let debt = 12_000 * WAD;
        let ratio = collateral_ratio(10 * WAD, debt, PRICE).unwrap();
        let new_debt = mul_div(debt, ratio, TARGET).unwrap();
        let repay = debt - new_debt;

        // Truncation leaves new_debt a hair under 10,000
        assert!(new_debt <= 10_000 * WAD);
        assert!(10_000 * WAD - new_debt < WAD / 1_000_000);
        assert!(repay >= 2_000 * WAD);
        assert!(repay - 2_000 * WAD < WAD / 1_000_000);
    }

    #[test]
    fn test_min_collateral_at_lower_edge() {
        // 8,000 debt at 170% → 6.8 base locked minimum
        let min = collateral_for_ratio(8_000 * WAD, PRICE, WAD * 170 / 100).unwrap();
        assert_eq!(min, 68 * WAD / 10);
    }
}
