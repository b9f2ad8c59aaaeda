// Copyright (c) 2024 Botho Foundation

//! Collaborators the admission chain is built from.

use ed25519_dalek::{Signature, VerifyingKey};
use mrd_mint_policy::{Address, Coin};
use std::collections::BTreeSet;

use super::{AdmissionError, AuthParams};
use crate::{
    context::Context,
    ledger::{Account, LedgerStore},
    types::{AnyMessage, PubKey, Tx},
};

/// Default name of the fee collector module account.
pub const FEE_COLLECTOR: &str = "fee_collector";

/// Account lookups and auth parameters for the account-related gatekeepers.
#[derive(Debug, Clone)]
pub struct AccountKeeper {
    params: AuthParams,
    fee_collector: Address,
}

impl AccountKeeper {
    pub fn new(params: AuthParams) -> Self {
        Self {
            params,
            fee_collector: Address::from(FEE_COLLECTOR),
        }
    }

    pub fn with_fee_collector(mut self, fee_collector: Address) -> Self {
        self.fee_collector = fee_collector;
        self
    }

    pub fn params(&self) -> &AuthParams {
        &self.params
    }

    pub fn fee_collector(&self) -> &Address {
        &self.fee_collector
    }

    /// The signer's account, which must already exist.
    pub fn signer_account(
        &self,
        store: &dyn LedgerStore,
        address: &Address,
    ) -> Result<Account, AdmissionError> {
        store
            .get_account(address)
            .ok_or_else(|| AdmissionError::UnknownAddress(address.clone()))
    }
}

pub trait SignatureVerifier: Send + Sync {
    fn verify(&self, pub_key: &PubKey, msg: &[u8], signature: &[u8]) -> bool;
}

/// Strict ed25519 verification.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ed25519Verifier;

impl SignatureVerifier for Ed25519Verifier {
    fn verify(&self, pub_key: &PubKey, msg: &[u8], signature: &[u8]) -> bool {
        let Ok(key) = VerifyingKey::from_bytes(&pub_key.0) else {
            return false;
        };
        let Ok(signature) = Signature::from_slice(signature) else {
            return false;
        };
        key.verify_strict(msg, &signature).is_ok()
    }
}

/// Decides the effective fee and priority of a transaction.
pub trait TxFeeChecker: Send + Sync {
    fn check(&self, ctx: &Context<'_>, tx: &Tx) -> Result<(Vec<Coin>, u64), AdmissionError>;
}

/// Enforces the node's local minimum gas prices in check mode.
///
/// The fee must cover `ceil(price × gas_limit)` in at least one of the
/// configured denoms. Priority is the lowest integer gas price across the
/// fee coins.
#[derive(Debug, Clone, Copy, Default)]
pub struct MinGasPriceChecker;

impl TxFeeChecker for MinGasPriceChecker {
    fn check(&self, ctx: &Context<'_>, tx: &Tx) -> Result<(Vec<Coin>, u64), AdmissionError> {
        let fee = &tx.auth_info.fee;
        let gas = fee.gas_limit;

        let prices: Vec<_> = ctx
            .min_gas_prices
            .iter()
            .filter(|p| !p.amount.is_zero())
            .collect();
        if ctx.mode.is_check() && !prices.is_empty() {
            let mut required = Vec::with_capacity(prices.len());
            for price in prices {
                let amount = price
                    .amount
                    .checked_mul_int(gas as u128)
                    .map_err(|e| AdmissionError::InsufficientFee(e.to_string()))?
                    .ceil_int();
                required.push(Coin::new(price.denom.clone(), amount));
            }
            if !is_any_gte(&fee.amount, &required) {
                return Err(AdmissionError::InsufficientFee(format!(
                    "insufficient fees; got: {} required: {}",
                    display_coins(&fee.amount),
                    display_coins(&required)
                )));
            }
        }

        Ok((fee.amount.clone(), tx_priority(&fee.amount, gas)))
    }
}

/// True if some coin in `fee` covers the required amount of its denom.
fn is_any_gte(fee: &[Coin], required: &[Coin]) -> bool {
    required.iter().any(|req| {
        let have = fee
            .iter()
            .find(|c| c.denom == req.denom)
            .map_or(0, |c| c.amount);
        have != 0 && have >= req.amount
    })
}

fn tx_priority(fee: &[Coin], gas: u64) -> u64 {
    if gas == 0 {
        return 0;
    }
    fee.iter()
        .map(|c| u64::try_from(c.amount / gas as u128).unwrap_or(u64::MAX))
        .min()
        .unwrap_or(0)
}

pub(crate) fn display_coins(coins: &[Coin]) -> String {
    coins
        .iter()
        .map(Coin::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

pub trait PrivilegedAdmin: Send + Sync {
    fn is_privileged_admin(&self, ctx: &Context<'_>, address: &Address) -> bool;
}

/// A fixed set of admin addresses.
#[derive(Debug, Clone, Default)]
pub struct StaticAdmins(BTreeSet<Address>);

impl StaticAdmins {
    pub fn new(admins: impl IntoIterator<Item = Address>) -> Self {
        Self(admins.into_iter().collect())
    }
}

impl PrivilegedAdmin for StaticAdmins {
    fn is_privileged_admin(&self, _ctx: &Context<'_>, address: &Address) -> bool {
        self.0.contains(address)
    }
}

pub trait ExtensionOptionChecker: Send + Sync {
    fn accepts(&self, option: &AnyMessage) -> bool;
}

/// Accepts no extension options.
#[derive(Debug, Clone, Copy, Default)]
pub struct RejectAllExtensions;

impl ExtensionOptionChecker for RejectAllExtensions {
    fn accepts(&self, _option: &AnyMessage) -> bool {
        false
    }
}
