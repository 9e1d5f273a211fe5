//! CDP Strategy Common Library
//!
//! Shared types, constants, and utilities for the collateralized debt
//! position strategy engine.
//!
//! ## What Lives Here
//!
//! - **Fixed-Point Math**: 1e18-scaled ratio arithmetic with 256-bit intermediates
//! - **Unit Converter**: Base asset ⇄ investment asset conversion at an oracle price
//! - **Position Types**: Ledger, market snapshot and position state
//! - **Strategy Parameters**: Operator configuration with validated setters
//! - **Events**: Structured, serializable record of every position change
//! - **Errors**: Typed error taxonomy with stable codes
//!
//! This crate is `no_std` compatible when built without the default `std`
//! feature. Everything that touches a collaborator lives in `cdp-strategy`.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

// Re-export collection types for submodules based on feature
#[cfg(not(feature = "std"))]
pub use alloc::{string::String, vec::Vec};
#[cfg(feature = "std")]
pub use std::{string::String, vec::Vec};

pub mod constants;
pub mod errors;
pub mod events;
pub mod math;
pub mod params;
pub mod types;
pub mod validation;

#[cfg(test)]
mod tests;

// Re-exports for convenience
pub use constants::*;
pub use errors::*;
pub use events::*;
pub use math::*;
pub use params::*;
pub use types::*;
