//! Validation Helpers
//!
//! The `check!` macro used by guard clauses across both crates.
//!
//! ```rust,ignore
//! use cdp_strategy_common::check;
//!
//! check!(price > 0, StrategyError::InvalidPrice { price });
//! ```

/// Check a condition and return an error if it fails.
#[macro_export]
macro_rules! check {
    ($condition:expr, $error:expr) => {
        if !($condition) {
            return Err($error);
        }
    };
}
