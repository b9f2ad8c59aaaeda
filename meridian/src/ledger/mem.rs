// Copyright (c) 2024 Botho Foundation

//! In-memory ledger state.

use mrd_mint_policy::{Address, Coin, MintParams, MinterState, StakeholderParams};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

use super::{
    Account, AccountStore, BalanceLedger, LedgerError, ParameterStore, RelayStore,
};

/// Ledger state held in ordered maps.
///
/// Cloning is cheap enough for per-transaction snapshots: check and simulate
/// run against a clone that is dropped afterwards, and delivery commits a
/// clone back only on success.
#[derive(Debug, Clone, Default)]
pub struct MemLedger {
    fee_collector: Address,
    balances: BTreeMap<(Address, String), u128>,
    supply: BTreeMap<String, u128>,

    /// Unset until genesis.
    minter: Option<MinterState>,
    mint_params: Option<MintParams>,
    stakeholders: StakeholderParams,
    disabled_kinds: BTreeSet<String>,

    accounts: BTreeMap<Address, Account>,
    next_account_number: u64,
    /// (granter, grantee, kind)
    grants: BTreeSet<(Address, Address, String)>,

    receipts: BTreeSet<(String, u64)>,
    commitments: BTreeSet<(String, u64)>,
}

impl MemLedger {
    pub fn new(fee_collector: Address) -> Self {
        Self {
            fee_collector,
            ..Default::default()
        }
    }

    pub fn fee_collector(&self) -> &Address {
        &self.fee_collector
    }

    /// All accounts, ordered by address.
    pub fn accounts(&self) -> impl Iterator<Item = &Account> + '_ {
        self.accounts.values()
    }

    fn credit(&mut self, address: &Address, coin: &Coin) -> Result<(), LedgerError> {
        if self.accounts.get(address).is_none() {
            self.new_account(address);
        }
        let balance = self
            .balances
            .entry((address.clone(), coin.denom.clone()))
            .or_default();
        *balance = balance
            .checked_add(coin.amount)
            .ok_or_else(|| LedgerError::Overflow(coin.denom.clone()))?;
        Ok(())
    }

    fn debit(&mut self, address: &Address, coin: &Coin) -> Result<(), LedgerError> {
        let key = (address.clone(), coin.denom.clone());
        let available = self.balances.get(&key).copied().unwrap_or(0);
        let remaining =
            available
                .checked_sub(coin.amount)
                .ok_or_else(|| LedgerError::InsufficientFunds {
                    address: address.clone(),
                    denom: coin.denom.clone(),
                    available,
                    needed: coin.amount,
                })?;
        if remaining == 0 {
            self.balances.remove(&key);
        } else {
            self.balances.insert(key, remaining);
        }
        Ok(())
    }

    fn check_coin(coin: &Coin) -> Result<(), LedgerError> {
        coin.validate()
            .map_err(|e| LedgerError::InvalidCoin(e.to_string()))
    }
}

impl BalanceLedger for MemLedger {
    fn mint_coins(&mut self, module: &Address, coin: &Coin) -> Result<(), LedgerError> {
        Self::check_coin(coin)?;
        if coin.is_zero() {
            return Ok(());
        }
        let supply = self.supply.get(&coin.denom).copied().unwrap_or(0);
        let supply = supply
            .checked_add(coin.amount)
            .ok_or_else(|| LedgerError::Overflow(coin.denom.clone()))?;
        self.credit(module, coin)?;
        self.supply.insert(coin.denom.clone(), supply);
        debug!(module = %module, coin = %coin, "minted coins");
        Ok(())
    }

    fn burn_coins(&mut self, module: &Address, coin: &Coin) -> Result<(), LedgerError> {
        Self::check_coin(coin)?;
        if coin.is_zero() {
            return Ok(());
        }
        self.debit(module, coin)?;
        let supply = self.supply.entry(coin.denom.clone()).or_default();
        *supply = supply.saturating_sub(coin.amount);
        debug!(module = %module, coin = %coin, "burned coins");
        Ok(())
    }

    fn get_supply(&self, denom: &str) -> u128 {
        self.supply.get(denom).copied().unwrap_or(0)
    }

    fn get_balance(&self, address: &Address, denom: &str) -> u128 {
        self.balances
            .get(&(address.clone(), denom.to_string()))
            .copied()
            .unwrap_or(0)
    }

    fn transfer(&mut self, from: &Address, to: &Address, coin: &Coin) -> Result<(), LedgerError> {
        Self::check_coin(coin)?;
        if coin.is_zero() {
            return Ok(());
        }
        self.debit(from, coin)?;
        self.credit(to, coin)
    }

    fn add_collected_fees(&mut self, coins: &[Coin]) -> Result<(), LedgerError> {
        let collector = self.fee_collector.clone();
        for coin in coins {
            self.mint_coins(&collector, coin)?;
        }
        Ok(())
    }
}

impl ParameterStore for MemLedger {
    fn get_minter_state(&self) -> Result<MinterState, LedgerError> {
        self.minter
            .clone()
            .ok_or(LedgerError::MissingParam("minter state"))
    }

    fn set_minter_state(&mut self, minter: MinterState) -> Result<(), LedgerError> {
        self.minter = Some(minter);
        Ok(())
    }

    fn get_mint_params(&self) -> Result<MintParams, LedgerError> {
        self.mint_params
            .clone()
            .ok_or(LedgerError::MissingParam("mint params"))
    }

    fn set_mint_params(&mut self, params: MintParams) -> Result<(), LedgerError> {
        params.validate()?;
        self.mint_params = Some(params);
        Ok(())
    }

    fn get_stakeholder_params(&self) -> Result<StakeholderParams, LedgerError> {
        Ok(self.stakeholders.clone())
    }

    fn set_stakeholder_params(&mut self, params: StakeholderParams) -> Result<(), LedgerError> {
        if let Err(err) = params.validate() {
            warn!(error = %err, "rejected stakeholder update");
            return Err(err.into());
        }
        self.stakeholders = params;
        Ok(())
    }

    fn is_kind_disabled(&self, kind: &str) -> bool {
        self.disabled_kinds.contains(kind)
    }

    fn set_kind_disabled(&mut self, kind: &str, disabled: bool) {
        if disabled {
            self.disabled_kinds.insert(kind.to_string());
        } else {
            self.disabled_kinds.remove(kind);
        }
    }
}

impl AccountStore for MemLedger {
    fn get_account(&self, address: &Address) -> Option<Account> {
        self.accounts.get(address).cloned()
    }

    fn set_account(&mut self, account: Account) {
        self.accounts.insert(account.address.clone(), account);
    }

    fn new_account(&mut self, address: &Address) -> Account {
        let account = Account {
            address: address.clone(),
            number: self.next_account_number,
            sequence: 0,
            pub_key: None,
        };
        self.next_account_number += 1;
        self.accounts.insert(address.clone(), account.clone());
        account
    }

    fn has_grant(&self, granter: &Address, grantee: &Address, kind: &str) -> bool {
        self.grants
            .contains(&(granter.clone(), grantee.clone(), kind.to_string()))
    }

    fn grant(&mut self, granter: &Address, grantee: &Address, kind: &str) {
        self.grants
            .insert((granter.clone(), grantee.clone(), kind.to_string()));
    }
}

impl RelayStore for MemLedger {
    fn has_packet_receipt(&self, channel: &str, sequence: u64) -> bool {
        self.receipts.contains(&(channel.to_string(), sequence))
    }

    fn set_packet_receipt(&mut self, channel: &str, sequence: u64) {
        self.receipts.insert((channel.to_string(), sequence));
    }

    fn has_packet_commitment(&self, channel: &str, sequence: u64) -> bool {
        self.commitments.contains(&(channel.to_string(), sequence))
    }

    fn set_packet_commitment(&mut self, channel: &str, sequence: u64) {
        self.commitments.insert((channel.to_string(), sequence));
    }

    fn delete_packet_commitment(&mut self, channel: &str, sequence: u64) {
        self.commitments.remove(&(channel.to_string(), sequence));
    }
}
