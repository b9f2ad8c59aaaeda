// Copyright (c) 2024 Botho Foundation
//
//! Common test utilities for node integration tests.
//!
//! Builds a single node from a [`NodeConfig`] with a handful of funded,
//! key-backed accounts, and signs transactions the way a client would.
//!
//! # Example
//!
//! ```ignore
//! use common::*;
//!
//! let mut node = Node::from_config(&test_config(&[&alice()])).unwrap();
//! node.begin_block(1).unwrap();
//! let tx = signed_tx(&node, &alice(), vec![send(&alice(), &bob(), 10)]);
//! node.deliver_tx(&tx).unwrap();
//! ```

#![allow(dead_code)]

use ed25519_dalek::{Signer, SigningKey};
use meridian::{
    config::{GenesisBalance, NodeConfig},
    ledger::AccountStore,
    monetary::InflationFn,
    types::{AnyMessage, Fee, Message, PubKey, SignerInfo, Tx},
    Address, Coin, Dec, MintParams, MinterState, Node,
};
use std::sync::Arc;

pub const CHAIN_ID: &str = "meridian-it";
pub const DENOM: &str = "umrd";
pub const GAS_LIMIT: u64 = 200_000;
pub const INITIAL_BALANCE: u64 = 1_000_000_000;

pub fn alice() -> SigningKey {
    SigningKey::from_bytes(&[1; 32])
}

pub fn bob() -> SigningKey {
    SigningKey::from_bytes(&[2; 32])
}

pub fn admin() -> SigningKey {
    SigningKey::from_bytes(&[3; 32])
}

pub fn governance() -> SigningKey {
    SigningKey::from_bytes(&[4; 32])
}

pub fn pub_key(key: &SigningKey) -> PubKey {
    PubKey(key.verifying_key().to_bytes())
}

pub fn address(key: &SigningKey) -> Address {
    pub_key(key).address()
}

/// A config with `funded` holding [`INITIAL_BALANCE`] each, [`admin`] as
/// the only privileged admin and [`governance`] as the authority.
pub fn test_config(funded: &[&SigningKey]) -> NodeConfig {
    let mut config = NodeConfig::new(CHAIN_ID, address(&governance()));
    config.privileged_admins = vec![address(&admin())];
    config.genesis.balances = funded
        .iter()
        .map(|key| GenesisBalance {
            address: address(key),
            denom: DENOM.to_string(),
            amount: INITIAL_BALANCE,
        })
        .collect();
    config.genesis.mint_params = MintParams {
        blocks_per_year: 100,
        ..MintParams::default()
    };
    config
}

/// Inflation pinned to `rate` regardless of state.
pub fn fixed_inflation(rate: &'static str) -> InflationFn {
    Arc::new(move |_: &MinterState, _: &MintParams, _: Dec| rate.parse::<Dec>())
}

pub fn send(from: &SigningKey, to: &SigningKey, amount: u128) -> Message {
    Message::Send {
        from: address(from),
        to: address(to),
        amount: vec![Coin::new(DENOM, amount)],
    }
}

pub fn exec(grantee: &SigningKey, inner: Vec<Message>) -> Message {
    Message::Exec {
        grantee: address(grantee),
        msgs: pack(&inner),
    }
}

pub fn pack(msgs: &[Message]) -> Vec<AnyMessage> {
    msgs.iter().map(|m| AnyMessage::pack(m).unwrap()).collect()
}

/// An unsigned tx with a gas limit of [`GAS_LIMIT`] and no fee.
pub fn unsigned_tx(msgs: Vec<Message>) -> Tx {
    Tx::new(
        pack(&msgs),
        Fee {
            gas_limit: GAS_LIMIT,
            ..Fee::default()
        },
    )
}

/// Sign `tx` with `key` using the account's current number and sequence.
pub fn sign(node: &Node, key: &SigningKey, mut tx: Tx) -> Tx {
    let account = node
        .state()
        .get_account(&address(key))
        .expect("signer account exists");
    tx.auth_info.signer_infos = vec![SignerInfo {
        public_key: Some(pub_key(key)),
        sequence: account.sequence,
    }];
    let sign_bytes = tx.sign_bytes(CHAIN_ID, account.number).unwrap();
    tx.signatures = vec![key.sign(&sign_bytes).to_bytes().to_vec()];
    tx
}

pub fn signed_tx(node: &Node, key: &SigningKey, msgs: Vec<Message>) -> Tx {
    sign(node, key, unsigned_tx(msgs))
}

/// A node built from `config` that has already started block 1.
pub fn started(config: &NodeConfig, inflation: InflationFn) -> Node {
    let mut node = Node::from_config_with(config, inflation).unwrap();
    node.begin_block(1).unwrap();
    node
}
