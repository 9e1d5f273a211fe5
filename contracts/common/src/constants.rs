//! Strategy Constants
//!
//! Magic numbers and default configuration values for the CDP strategy.
//! Ratio defaults follow the Liquity trove parameters the engine was tuned
//! against (150% critical ratio, 2,000 unit minimum net debt).

/// Fixed-point scales
pub mod scale {
    /// 1.0 in 18-decimal fixed point (1e18 = 100%)
    pub const WAD: u128 = 1_000_000_000_000_000_000;

    /// Basis points denominator
    pub const BPS: u128 = 10_000;

    /// Ratio reported when the position has no debt
    pub const NO_DEBT_RATIO: u128 = u128::MAX;
}

/// Collateralization ratios (1e18 = 100%)
pub mod ratios {
    use super::scale::WAD;

    /// Default target collateralization ratio (200%)
    pub const DEFAULT_TARGET_RATIO: u128 = 2 * WAD;

    /// Default symmetric drift band around the target (30%)
    pub const DEFAULT_TOLERANCE: u128 = WAD * 30 / 100;

    /// Hard floor the band may never reach (150%)
    pub const DEFAULT_MIN_RATIO: u128 = WAD * 150 / 100;

    /// Upper sanity bound on the target ratio (1000%)
    pub const MAX_TARGET_RATIO: u128 = 10 * WAD;
}

/// Debt limits imposed by the lending facility
pub mod limits {
    use super::scale::WAD;

    /// Minimum non-zero debt the facility tolerates (2,000 units)
    pub const DEFAULT_DEBT_FLOOR: u128 = 2_000 * WAD;

    /// Margin kept above the debt floor on a best-effort repay (0.001 units)
    pub const REPAY_EPSILON: u128 = 1_000_000_000_000_000;

    /// Maximum collateral sale rounds in a single close-out
    pub const MAX_CLOSE_OUT_ROUNDS: u8 = 16;
}

/// Discretionary action gates
pub mod gates {
    /// One gwei expressed in wei
    pub const GWEI: u128 = 1_000_000_000;

    /// Default maximum network base fee for discretionary actions (50 gwei)
    pub const DEFAULT_MAX_BASE_FEE: u128 = 50 * GWEI;

    /// Base fee assumed when the network read fails (1000 gwei).
    /// Every accepted `max_acceptable_base_fee` is strictly below it.
    pub const FALLBACK_BASE_FEE: u128 = 1_000 * GWEI;

    /// Default maximum borrowing rate for minting more debt (1%, 1e18 scale)
    pub const DEFAULT_MAX_BORROWING_RATE: u128 = super::scale::WAD / 100;
}

/// Fee and slippage configuration (basis points)
pub mod fees {
    /// Default slippage tolerated on reserve withdrawals and swaps (0.01%)
    pub const DEFAULT_MAX_LOSS_BPS: u64 = 1;

    /// Basis points denominator
    pub const BPS_DENOMINATOR: u64 = 10_000;
}
