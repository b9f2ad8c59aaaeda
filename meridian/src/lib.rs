// Copyright (c) 2024 Botho Foundation

//! Meridian node library - a permissioned ledger with per-block minting.
//!
//! This library provides the transaction admission chain, the monetary
//! policy engine that mints and distributes each block's provision, and the
//! node that ties both to ledger state.

#![deny(clippy::print_stdout)]

pub mod admission;
pub mod config;
pub mod context;
pub mod ledger;
pub mod metrics;
pub mod monetary;
pub mod node;
pub mod router;
pub mod telemetry;
pub mod types;

pub use mrd_mint_policy::{
    Address, Coin, Dec, DecCoin, MintParams, MinterState, StakeHolder, StakeholderParams,
};
pub use node::{Node, NodeError};
