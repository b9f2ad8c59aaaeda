// Copyright (c) 2024 Botho Foundation

//! Interfaces to ledger state.
//!
//! Balances, parameters, accounts and relay bookkeeping are owned by the
//! surrounding runtime. The node only reaches them through these traits;
//! [`MemLedger`] is the in-process implementation used by [`crate::node::Node`].

mod mem;

pub use mem::MemLedger;

use mrd_mint_policy::{Address, Coin, MintParams, MinterState, ParamsError, StakeholderParams};
use thiserror::Error;

use crate::types::PubKey;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("insufficient funds: {address} has {available}{denom}, needs {needed}{denom}")]
    InsufficientFunds {
        address: Address,
        denom: String,
        available: u128,
        needed: u128,
    },

    #[error("invalid coin: {0}")]
    InvalidCoin(String),

    #[error("supply overflow for {0}")]
    Overflow(String),

    #[error("account {0} does not exist")]
    UnknownAccount(Address),

    #[error("{0} is not set")]
    MissingParam(&'static str),

    #[error(transparent)]
    InvalidParams(#[from] ParamsError),
}

pub trait BalanceLedger {
    /// Create `coin` in `module`'s account, increasing supply.
    fn mint_coins(&mut self, module: &Address, coin: &Coin) -> Result<(), LedgerError>;

    /// Destroy `coin` from `module`'s account, decreasing supply.
    fn burn_coins(&mut self, module: &Address, coin: &Coin) -> Result<(), LedgerError>;

    fn get_supply(&self, denom: &str) -> u128;

    fn get_balance(&self, address: &Address, denom: &str) -> u128;

    fn transfer(&mut self, from: &Address, to: &Address, coin: &Coin) -> Result<(), LedgerError>;

    /// Credit coins to the fee collector.
    fn add_collected_fees(&mut self, coins: &[Coin]) -> Result<(), LedgerError>;
}

pub trait ParameterStore {
    fn get_minter_state(&self) -> Result<MinterState, LedgerError>;

    fn set_minter_state(&mut self, minter: MinterState) -> Result<(), LedgerError>;

    fn get_mint_params(&self) -> Result<MintParams, LedgerError>;

    /// Rejects invalid params and keeps the prior value.
    fn set_mint_params(&mut self, params: MintParams) -> Result<(), LedgerError>;

    fn get_stakeholder_params(&self) -> Result<StakeholderParams, LedgerError>;

    /// Rejects invalid params and keeps the prior value.
    fn set_stakeholder_params(&mut self, params: StakeholderParams) -> Result<(), LedgerError>;

    /// Circuit breaker state.
    fn is_kind_disabled(&self, kind: &str) -> bool;

    fn set_kind_disabled(&mut self, kind: &str, disabled: bool);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub address: Address,
    pub number: u64,
    pub sequence: u64,
    pub pub_key: Option<PubKey>,
}

pub trait AccountStore {
    fn get_account(&self, address: &Address) -> Option<Account>;

    fn set_account(&mut self, account: Account);

    /// Create and store an account with the next account number.
    fn new_account(&mut self, address: &Address) -> Account;

    /// Whether `granter` allows `grantee` to execute messages of `kind`.
    fn has_grant(&self, granter: &Address, grantee: &Address, kind: &str) -> bool;

    fn grant(&mut self, granter: &Address, grantee: &Address, kind: &str);
}

/// Packet bookkeeping used to recognize already relayed packets.
pub trait RelayStore {
    fn has_packet_receipt(&self, channel: &str, sequence: u64) -> bool;

    fn set_packet_receipt(&mut self, channel: &str, sequence: u64);

    fn has_packet_commitment(&self, channel: &str, sequence: u64) -> bool;

    fn set_packet_commitment(&mut self, channel: &str, sequence: u64);

    fn delete_packet_commitment(&mut self, channel: &str, sequence: u64);
}

/// Everything a transaction or block context can touch.
pub trait LedgerStore: BalanceLedger + ParameterStore + AccountStore + RelayStore {}

impl<T: BalanceLedger + ParameterStore + AccountStore + RelayStore> LedgerStore for T {}
