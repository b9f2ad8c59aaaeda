//! Monetary policy for Meridian.
//!
//! This crate holds the pure, deterministic half of the per-block minting
//! procedure. It never touches ledger state; the node crate loads state,
//! calls into here and applies the results.
//!
//! ## Model
//!
//! - **Inflation** moves every block by a proportional controller toward
//!   `inflation_max` (nothing is bonded on this ledger, so the controller
//!   always pushes upward) and is clamped to `[inflation_min, inflation_max]`.
//! - **Annual provisions** are `inflation × total_supply` of the mint denom.
//! - **Block provision** is annual provisions amortized over
//!   `blocks_per_year`, truncated to an integer amount.
//! - **Payouts** split a block provision across a fixed stakeholder list in
//!   parts of [`STAKEHOLDER_SCALE`]. Truncation remainders stay with the
//!   holder of the minted coins.
//!
//! ## Fixed-point arithmetic
//!
//! All rates are [`Dec`] values with 18 fractional digits. Products and
//! quotients go through 256-bit intermediates so results are exact up to the
//! final rounding step and identical on every replica.

mod coin;
mod dec;
mod minter;
mod stakeholders;

pub use coin::{validate_coins, validate_denom, Address, Coin, CoinError, DecCoin};
pub use dec::{Dec, DecError, DEC_PRECISION, DEC_SCALE};
pub use minter::{default_inflation, MintParams, MinterState, DEFAULT_BLOCKS_PER_YEAR};
pub use stakeholders::{
    calculate_payouts, payout_share, PayoutPair, StakeHolder, StakeholderParams,
    STAKEHOLDER_SCALE,
};

use thiserror::Error;

/// Validation failures for policy parameters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParamsError {
    #[error("stakeholder percentages sum to {total}, expected {STAKEHOLDER_SCALE}")]
    StakeholderSum { total: u128 },

    #[error("stakeholder address must not be empty")]
    EmptyStakeholderAddress,

    #[error("stakeholder {0} is listed more than once")]
    DuplicateStakeholder(Address),

    #[error("invalid mint params: {0}")]
    InvalidMintParams(String),
}
