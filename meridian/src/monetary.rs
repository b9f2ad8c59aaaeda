// Copyright (c) 2024 Botho Foundation

//! Per-block monetary policy.
//!
//! Once per block, before any transaction, the engine:
//!
//! 1. loads the minter state, mint params and total supply of the mint denom,
//! 2. computes the next inflation rate (nothing is bonded on this ledger, so
//!    the bonded ratio is always zero) and annual provisions, and stores them,
//! 3. mints one block's provision into the mint holding account,
//! 4. pays every stakeholder its share out of the holding account,
//! 5. credits the full minted amount to the fee collector.
//!
//! Steps 4 and 5 are independent: the fee collector is credited with the
//! whole provision even though stakeholders were already paid from it.
//! Truncation remainders stay in the holding account until burned with
//! [`MonetaryPolicyEngine::burn_holding_remainder`].
//!
//! Any failure is a [`PolicyError`]. The node treats it as fatal and stops
//! producing blocks.

use mrd_mint_policy::{
    calculate_payouts, default_inflation, Address, Coin, Dec, DecError, MintParams, MinterState,
};
use std::{collections::BTreeMap, fmt, sync::Arc};
use thiserror::Error;
use tracing::{debug, info};

use crate::{
    context::{Context, Event},
    ledger::LedgerError,
    metrics::NodeMetrics,
};

/// Computes the next inflation rate from the current minter state, the mint
/// params and the bonded ratio.
pub type InflationFn =
    Arc<dyn Fn(&MinterState, &MintParams, Dec) -> Result<Dec, DecError> + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    #[error("failed to load {what}: {source}")]
    Load {
        what: &'static str,
        source: LedgerError,
    },

    #[error("failed to persist minter state: {0}")]
    Persist(LedgerError),

    #[error("monetary arithmetic failed: {0}")]
    Math(#[from] DecError),

    #[error("failed to mint {coin}: {source}")]
    Mint { coin: Coin, source: LedgerError },

    #[error("failed to pay {coin} to stakeholder {address}: {source}")]
    Payout {
        address: Address,
        coin: Coin,
        source: LedgerError,
    },

    #[error("failed to credit collected fees: {0}")]
    CollectFees(LedgerError),
}

/// What one block's minting did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintOutcome {
    pub bonded_ratio: Dec,
    pub inflation: Dec,
    pub annual_provisions: Dec,
    pub minted: Coin,
    pub payouts: BTreeMap<Address, Coin>,
}

#[derive(Clone)]
pub struct MonetaryPolicyEngine {
    holding_account: Address,
    inflation_fn: InflationFn,
    metrics: Option<Arc<NodeMetrics>>,
}

impl fmt::Debug for MonetaryPolicyEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MonetaryPolicyEngine")
            .field("holding_account", &self.holding_account)
            .finish_non_exhaustive()
    }
}

impl MonetaryPolicyEngine {
    /// An engine minting into `holding_account` with the default inflation
    /// function.
    pub fn new(holding_account: Address) -> Self {
        Self {
            holding_account,
            inflation_fn: Arc::new(default_inflation),
            metrics: None,
        }
    }

    pub fn with_inflation_fn(mut self, inflation_fn: InflationFn) -> Self {
        self.inflation_fn = inflation_fn;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<NodeMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn holding_account(&self) -> &Address {
        &self.holding_account
    }

    /// Run the per-block minting procedure against `ctx.store`.
    pub fn begin_block(&self, ctx: &mut Context<'_>) -> Result<MintOutcome, PolicyError> {
        let bonded_ratio = Dec::ZERO;

        let minter = ctx
            .store
            .get_minter_state()
            .map_err(|source| PolicyError::Load {
                what: "minter state",
                source,
            })?;
        let params = ctx
            .store
            .get_mint_params()
            .map_err(|source| PolicyError::Load {
                what: "mint params",
                source,
            })?;
        let stakeholders = ctx
            .store
            .get_stakeholder_params()
            .map_err(|source| PolicyError::Load {
                what: "stakeholder params",
                source,
            })?;
        let total_supply = ctx.store.get_supply(&params.mint_denom);

        let inflation = (self.inflation_fn)(&minter, &params, bonded_ratio)?;
        let mut next = MinterState::new(inflation, minter.annual_provisions);
        next.annual_provisions = next.next_annual_provisions(total_supply)?;
        ctx.store
            .set_minter_state(next.clone())
            .map_err(PolicyError::Persist)?;

        let minted = next.block_provision(&params)?;
        let mut payouts = BTreeMap::new();
        if !minted.is_zero() {
            ctx.store
                .mint_coins(&self.holding_account, &minted)
                .map_err(|source| PolicyError::Mint {
                    coin: minted.clone(),
                    source,
                })?;

            payouts = calculate_payouts(&minted, &stakeholders);
            for (address, coin) in &payouts {
                ctx.store
                    .transfer(&self.holding_account, address, coin)
                    .map_err(|source| PolicyError::Payout {
                        address: address.clone(),
                        coin: coin.clone(),
                        source,
                    })?;
                debug!(stakeholder = %address, amount = %coin, "stakeholder paid");
            }

            ctx.store
                .add_collected_fees(std::slice::from_ref(&minted))
                .map_err(PolicyError::CollectFees)?;
        }

        info!(
            height = ctx.height(),
            bonded_ratio = %bonded_ratio,
            inflation = %next.inflation,
            annual_provisions = %next.annual_provisions,
            amount = %minted,
            "minted block provision"
        );
        ctx.emit(
            Event::new("mint")
                .attr("bonded_ratio", bonded_ratio)
                .attr("inflation", next.inflation)
                .attr("annual_provisions", next.annual_provisions)
                .attr("amount", minted.amount),
        );
        if let Some(metrics) = &self.metrics {
            metrics.record_mint(next.inflation, next.annual_provisions, minted.amount);
        }

        Ok(MintOutcome {
            bonded_ratio,
            inflation: next.inflation,
            annual_provisions: next.annual_provisions,
            minted,
            payouts,
        })
    }

    /// Burn `coin` from the holding account.
    pub fn burn_holding_remainder(
        &self,
        ctx: &mut Context<'_>,
        coin: &Coin,
    ) -> Result<(), LedgerError> {
        ctx.store.burn_coins(&self.holding_account, coin)?;
        info!(amount = %coin, holding = %self.holding_account, "burned holding remainder");
        ctx.emit(Event::new("burn").attr("amount", coin));
        Ok(())
    }
}
