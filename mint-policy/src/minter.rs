//! Minter state and mint parameters.

use crate::{
    coin::{validate_denom, Coin},
    dec::{Dec, DecError, DEC_SCALE},
    ParamsError,
};

/// Blocks per year at a 5 second block time (365.25 days).
pub const DEFAULT_BLOCKS_PER_YEAR: u64 = 60 * 60 * 8766 / 5;

/// Mutable monetary state, rewritten once per block.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MinterState {
    /// Current annual inflation rate.
    pub inflation: Dec,

    /// Expected provisions over the next year at the current rate.
    pub annual_provisions: Dec,
}

impl Default for MinterState {
    fn default() -> Self {
        Self::initial(Dec::from_raw(13 * DEC_SCALE / 100))
    }
}

impl MinterState {
    pub fn new(inflation: Dec, annual_provisions: Dec) -> Self {
        Self {
            inflation,
            annual_provisions,
        }
    }

    /// State at genesis: the given rate and no provisions yet.
    pub fn initial(inflation: Dec) -> Self {
        Self::new(inflation, Dec::ZERO)
    }

    /// Next inflation rate.
    ///
    /// The rate moves by `(1 - bonded_ratio / goal_bonded) × inflation_rate_change`
    /// per year, spread evenly over `blocks_per_year`, and is clamped to the
    /// configured bounds.
    pub fn next_inflation_rate(
        &self,
        params: &MintParams,
        bonded_ratio: Dec,
    ) -> Result<Dec, DecError> {
        let ratio = bonded_ratio.checked_quo(params.goal_bonded)?;
        let rising = ratio <= Dec::ONE;
        let factor = if rising {
            Dec::ONE.checked_sub(ratio)?
        } else {
            ratio.checked_sub(Dec::ONE)?
        };

        let change_per_year = factor.checked_mul(params.inflation_rate_change)?;
        let change = change_per_year.checked_quo(Dec::from_int(params.blocks_per_year))?;

        let inflation = if rising {
            self.inflation.checked_add(change)?
        } else {
            self.inflation.saturating_sub(change)
        };

        Ok(inflation.clamp_between(params.inflation_min, params.inflation_max))
    }

    /// `inflation × total_supply`.
    pub fn next_annual_provisions(&self, total_supply: u128) -> Result<Dec, DecError> {
        self.inflation.checked_mul_int(total_supply)
    }

    /// Annual provisions amortized over one block, truncated to an integer.
    pub fn block_provision(&self, params: &MintParams) -> Result<Coin, DecError> {
        let amount = self
            .annual_provisions
            .checked_quo_int(params.blocks_per_year as u128)?
            .truncate_int();
        Ok(Coin::new(params.mint_denom.clone(), amount))
    }
}

/// The inflation function used when none is configured.
pub fn default_inflation(
    minter: &MinterState,
    params: &MintParams,
    bonded_ratio: Dec,
) -> Result<Dec, DecError> {
    minter.next_inflation_rate(params, bonded_ratio)
}

/// Governance-controlled minting parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MintParams {
    /// Denomination that is minted.
    pub mint_denom: String,

    /// Maximum annual change of the inflation rate.
    pub inflation_rate_change: Dec,

    pub inflation_max: Dec,

    pub inflation_min: Dec,

    /// Target bonded ratio. Must be positive.
    pub goal_bonded: Dec,

    /// Expected number of blocks per year.
    pub blocks_per_year: u64,
}

impl Default for MintParams {
    fn default() -> Self {
        Self {
            mint_denom: "umrd".to_string(),
            inflation_rate_change: Dec::from_raw(13 * DEC_SCALE / 100),
            inflation_max: Dec::from_raw(20 * DEC_SCALE / 100),
            inflation_min: Dec::from_raw(7 * DEC_SCALE / 100),
            goal_bonded: Dec::from_raw(67 * DEC_SCALE / 100),
            blocks_per_year: DEFAULT_BLOCKS_PER_YEAR,
        }
    }
}

impl MintParams {
    pub fn validate(&self) -> Result<(), ParamsError> {
        let invalid = |msg: String| Err(ParamsError::InvalidMintParams(msg));

        if let Err(e) = validate_denom(&self.mint_denom) {
            return invalid(e.to_string());
        }
        if self.inflation_rate_change > Dec::ONE {
            return invalid(format!(
                "inflation rate change too large: {}",
                self.inflation_rate_change
            ));
        }
        if self.inflation_max > Dec::ONE {
            return invalid(format!("max inflation too large: {}", self.inflation_max));
        }
        if self.inflation_min > self.inflation_max {
            return invalid(format!(
                "max inflation ({}) must be greater than or equal to min inflation ({})",
                self.inflation_max, self.inflation_min
            ));
        }
        if self.goal_bonded.is_zero() || self.goal_bonded > Dec::ONE {
            return invalid(format!(
                "goal bonded must be in (0, 1]: {}",
                self.goal_bonded
            ));
        }
        if self.blocks_per_year == 0 {
            return invalid("blocks per year must be positive".to_string());
        }
        Ok(())
    }
}
