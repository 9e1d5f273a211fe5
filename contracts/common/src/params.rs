//! Strategy Parameters
//!
//! Operator configuration for the engine. A single owned struct, built from
//! defaults (or deserialized), checked by [`StrategyParams::validate`] and
//! changed afterwards only through the setters below. A setter that would
//! break an invariant returns `ConfigurationRejected` and leaves every field
//! as it was.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::check;
use crate::constants::{fees, gates, limits, ratios};
use crate::errors::{StrategyError, StrategyResult};
use crate::types::{Amount, Wad};

/// Operator-configured strategy parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
#[serde(default)]
pub struct StrategyParams {
    /// Desired collateralization ratio (1e18 = 100%)
    pub target_ratio: Wad,
    /// Symmetric drift band around the target
    pub tolerance: Wad,
    /// Floor the lower band edge must stay strictly above
    pub min_ratio: Wad,
    /// Slippage tolerated on reserve withdrawals and swaps
    pub max_loss_bps: u64,
    /// Base fee above which discretionary actions are vetoed
    pub max_acceptable_base_fee: u128,
    /// Borrowing rate above which minting more debt is vetoed
    pub max_borrowing_rate: Wad,
    /// Never sell collateral to close a debt shortfall
    pub leave_debt_behind: bool,
    /// Minimum non-zero debt the facility tolerates
    pub debt_floor: Amount,
}

impl Default for StrategyParams {
    fn default() -> Self {
        Self {
            target_ratio: ratios::DEFAULT_TARGET_RATIO,
            tolerance: ratios::DEFAULT_TOLERANCE,
            min_ratio: ratios::DEFAULT_MIN_RATIO,
            max_loss_bps: fees::DEFAULT_MAX_LOSS_BPS,
            max_acceptable_base_fee: gates::DEFAULT_MAX_BASE_FEE,
            max_borrowing_rate: gates::DEFAULT_MAX_BORROWING_RATE,
            leave_debt_behind: false,
            debt_floor: limits::DEFAULT_DEBT_FLOOR,
        }
    }
}

impl StrategyParams {
    /// Lower edge of the band
    pub fn lower_band(&self) -> Wad {
        self.target_ratio.saturating_sub(self.tolerance)
    }

    /// Upper edge of the band
    pub fn upper_band(&self) -> Wad {
        self.target_ratio.saturating_add(self.tolerance)
    }

    /// True if `ratio` is inside the inclusive band
    pub fn in_band(&self, ratio: Wad) -> bool {
        ratio >= self.lower_band() && ratio <= self.upper_band()
    }

    /// Check every invariant of a complete parameter set
    pub fn validate(&self) -> StrategyResult<()> {
        check_band(self.target_ratio, self.tolerance, self.min_ratio)?;
        check_max_loss(self.max_loss_bps)?;
        check_base_fee(self.max_acceptable_base_fee)?;
        Ok(())
    }

    /// Set the target ratio; the band must stay above `min_ratio`
    pub fn set_target_ratio(&mut self, target_ratio: Wad) -> StrategyResult<()> {
        check_band(target_ratio, self.tolerance, self.min_ratio)?;
        self.target_ratio = target_ratio;
        tracing::info!(target_ratio, "target ratio updated");
        Ok(())
    }

    /// Set the tolerance; the band must stay above `min_ratio`
    pub fn set_tolerance(&mut self, tolerance: Wad) -> StrategyResult<()> {
        check_band(self.target_ratio, tolerance, self.min_ratio)?;
        self.tolerance = tolerance;
        tracing::info!(tolerance, "rebalance tolerance updated");
        Ok(())
    }

    /// Set the slippage tolerance in basis points
    pub fn set_max_loss_bps(&mut self, max_loss_bps: u64) -> StrategyResult<()> {
        check_max_loss(max_loss_bps)?;
        self.max_loss_bps = max_loss_bps;
        tracing::info!(max_loss_bps, "max loss updated");
        Ok(())
    }

    /// Set the base fee gate
    pub fn set_max_acceptable_base_fee(&mut self, max_base_fee: u128) -> StrategyResult<()> {
        check_base_fee(max_base_fee)?;
        self.max_acceptable_base_fee = max_base_fee;
        tracing::info!(max_base_fee, "max acceptable base fee updated");
        Ok(())
    }

    /// Set the borrowing rate gate
    pub fn set_max_borrowing_rate(&mut self, max_borrowing_rate: Wad) -> StrategyResult<()> {
        self.max_borrowing_rate = max_borrowing_rate;
        tracing::info!(max_borrowing_rate, "max borrowing rate updated");
        Ok(())
    }

    /// Set whether liquidation may leave debt behind instead of selling collateral
    pub fn set_leave_debt_behind(&mut self, leave_debt_behind: bool) -> StrategyResult<()> {
        self.leave_debt_behind = leave_debt_behind;
        tracing::info!(leave_debt_behind, "leave debt behind updated");
        Ok(())
    }
}

fn check_band(target_ratio: Wad, tolerance: Wad, min_ratio: Wad) -> StrategyResult<()> {
    check!(
        target_ratio <= ratios::MAX_TARGET_RATIO,
        StrategyError::ConfigurationRejected {
            param: "target_ratio",
            reason: "above maximum target ratio",
        }
    );
    check!(
        tolerance < target_ratio,
        StrategyError::ConfigurationRejected {
            param: "tolerance",
            reason: "tolerance must be below the target ratio",
        }
    );
    check!(
        target_ratio - tolerance > min_ratio,
        StrategyError::ConfigurationRejected {
            param: "target_ratio",
            reason: "lower band edge must stay above the minimum ratio",
        }
    );
    Ok(())
}

fn check_max_loss(max_loss_bps: u64) -> StrategyResult<()> {
    check!(
        max_loss_bps <= fees::BPS_DENOMINATOR,
        StrategyError::ConfigurationRejected {
            param: "max_loss_bps",
            reason: "above 10,000 basis points",
        }
    );
    Ok(())
}

fn check_base_fee(max_base_fee: u128) -> StrategyResult<()> {
    check!(
        max_base_fee < gates::FALLBACK_BASE_FEE,
        StrategyError::ConfigurationRejected {
            param: "max_acceptable_base_fee",
            reason: "must stay below the fallback base fee",
        }
    );
    Ok(())
}
