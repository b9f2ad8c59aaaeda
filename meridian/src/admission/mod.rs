// Copyright (c) 2024 Botho Foundation

//! Transaction admission.
//!
//! Every transaction passes through an [`AdmissionChain`] before it can touch
//! ledger state. The chain is an ordered list of [`Gatekeeper`]s, each of
//! which checks one thing and then hands control to the rest of the chain
//! through [`Next`]. A gatekeeper that returns an error without calling
//! `next` stops evaluation: no later gatekeeper runs.
//!
//! The order built by [`AdmissionChainBuilder`] is fixed:
//!
//! 1. context and gas meter setup
//! 2. circuit breaker
//! 3. extension options
//! 4. stateless validation
//! 5. timeout height
//! 6. memo
//! 7. size gas
//! 8. fee deduction
//! 9. public key registration
//! 10. signature count
//! 11. signature gas
//! 12. signature verification
//! 13. sequence increment
//! 14. staking disabled
//! 15. commission limit
//! 16. manual mint gate
//! 17. message filter
//! 18. redundant relay
//!
//! Fees are taken before signatures are checked, so a signer pays for size
//! even when verification fails. Signatures are checked before sequences
//! move, so a bad signature never advances the nonce.

mod basic;
mod domain;
mod error;
mod fee;
mod keepers;
mod mint_gate;
mod msg_filter;
mod relay;
mod setup;
mod sigverify;
mod walk;

pub use basic::{
    CircuitBreaker, ConsumeTxSizeGas, RejectExtensionOptions, TxTimeoutHeight, ValidateBasic,
    ValidateMemo,
};
pub use domain::{CommissionLimit, StakingDisabled};
pub use error::{AdmissionError, ConfigurationError};
pub use fee::DeductFee;
pub use keepers::{
    AccountKeeper, Ed25519Verifier, ExtensionOptionChecker, MinGasPriceChecker, PrivilegedAdmin,
    RejectAllExtensions, SignatureVerifier, StaticAdmins, TxFeeChecker, FEE_COLLECTOR,
};
pub use mint_gate::ManualMintGate;
pub use msg_filter::MessageFilter;
pub use relay::RedundantRelay;
pub use setup::SetUpContext;
pub use sigverify::{IncrementSequence, SetPubKey, SigGasConsume, SigVerification, ValidateSigCount};

use mrd_mint_policy::{Dec, DEC_SCALE};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::{context::Context, types::Tx};

/// One admission check.
pub trait Gatekeeper: Send + Sync {
    fn name(&self) -> &'static str;

    /// Check `tx` and, if it passes, continue with `next`.
    fn evaluate(
        &self,
        ctx: &mut Context<'_>,
        tx: &Tx,
        simulate: bool,
        next: Next<'_>,
    ) -> Result<(), AdmissionError>;
}

/// The remainder of the chain after the current gatekeeper.
pub struct Next<'c> {
    rest: &'c [Box<dyn Gatekeeper>],
}

impl<'c> Next<'c> {
    pub fn run(self, ctx: &mut Context<'_>, tx: &Tx, simulate: bool) -> Result<(), AdmissionError> {
        let Some((head, tail)) = self.rest.split_first() else {
            return Ok(());
        };
        let result = head.evaluate(ctx, tx, simulate, Next { rest: tail });
        // Outer gatekeepers see the error after the one that raised it.
        if result.is_err() && ctx.rejected_by.is_none() {
            ctx.rejected_by = Some(head.name());
        }
        result
    }
}

/// Fixed, ordered composition of gatekeepers.
pub struct AdmissionChain {
    gatekeepers: Vec<Box<dyn Gatekeeper>>,
}

impl AdmissionChain {
    /// A chain with exactly these gatekeepers, in this order.
    pub fn from_gatekeepers(gatekeepers: Vec<Box<dyn Gatekeeper>>) -> Self {
        Self { gatekeepers }
    }

    pub fn builder() -> AdmissionChainBuilder {
        AdmissionChainBuilder::default()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.gatekeepers.iter().map(|g| g.name()).collect()
    }

    pub fn evaluate(
        &self,
        ctx: &mut Context<'_>,
        tx: &Tx,
        simulate: bool,
    ) -> Result<(), AdmissionError> {
        let result = Next {
            rest: &self.gatekeepers,
        }
        .run(ctx, tx, simulate);

        if let Err(err) = &result {
            debug!(
                gatekeeper = ctx.rejected_by.unwrap_or("unknown"),
                code = err.code(),
                height = ctx.height(),
                mode = ctx.mode.as_str(),
                "transaction rejected: {}",
                err
            );
        }
        result
    }
}

/// Parameters of the account-related gatekeepers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthParams {
    #[serde(default = "default_max_memo_characters")]
    pub max_memo_characters: usize,

    #[serde(default = "default_tx_sig_limit")]
    pub tx_sig_limit: u64,

    #[serde(default = "default_tx_size_cost_per_byte")]
    pub tx_size_cost_per_byte: u64,

    #[serde(default = "default_sig_verify_cost_ed25519")]
    pub sig_verify_cost_ed25519: u64,
}

fn default_max_memo_characters() -> usize {
    256
}

fn default_tx_sig_limit() -> u64 {
    7
}

fn default_tx_size_cost_per_byte() -> u64 {
    10
}

fn default_sig_verify_cost_ed25519() -> u64 {
    590
}

impl Default for AuthParams {
    fn default() -> Self {
        Self {
            max_memo_characters: default_max_memo_characters(),
            tx_sig_limit: default_tx_sig_limit(),
            tx_size_cost_per_byte: default_tx_size_cost_per_byte(),
            sig_verify_cost_ed25519: default_sig_verify_cost_ed25519(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmissionConfig {
    /// Message kinds rejected at any nesting depth. Exact match.
    #[serde(default)]
    pub blocked_message_kinds: Vec<String>,

    /// Deepest allowed nesting of execution wrappers. Top-level messages are
    /// at depth 0.
    #[serde(default = "default_max_nesting_depth")]
    pub max_nesting_depth: usize,

    #[serde(default = "default_min_commission_rate")]
    pub min_commission_rate: Dec,

    #[serde(default)]
    pub auth: AuthParams,
}

fn default_max_nesting_depth() -> usize {
    8
}

fn default_min_commission_rate() -> Dec {
    Dec::from_raw(5 * DEC_SCALE / 100)
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            blocked_message_kinds: Vec::new(),
            max_nesting_depth: default_max_nesting_depth(),
            min_commission_rate: default_min_commission_rate(),
            auth: AuthParams::default(),
        }
    }
}

/// Assembles the standard chain.
///
/// The account keeper, fee checker, signature verifier and privileged-admin
/// predicate have no defaults; [`build`](Self::build) fails without them.
#[derive(Default)]
pub struct AdmissionChainBuilder {
    config: AdmissionConfig,
    account_keeper: Option<AccountKeeper>,
    fee_checker: Option<Arc<dyn TxFeeChecker>>,
    sig_verifier: Option<Arc<dyn SignatureVerifier>>,
    privileged_admin: Option<Arc<dyn PrivilegedAdmin>>,
    extension_checker: Option<Arc<dyn ExtensionOptionChecker>>,
}

impl AdmissionChainBuilder {
    pub fn config(mut self, config: AdmissionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn account_keeper(mut self, keeper: AccountKeeper) -> Self {
        self.account_keeper = Some(keeper);
        self
    }

    pub fn fee_checker(mut self, checker: Arc<dyn TxFeeChecker>) -> Self {
        self.fee_checker = Some(checker);
        self
    }

    pub fn sig_verifier(mut self, verifier: Arc<dyn SignatureVerifier>) -> Self {
        self.sig_verifier = Some(verifier);
        self
    }

    pub fn privileged_admin(mut self, admin: Arc<dyn PrivilegedAdmin>) -> Self {
        self.privileged_admin = Some(admin);
        self
    }

    pub fn extension_checker(mut self, checker: Arc<dyn ExtensionOptionChecker>) -> Self {
        self.extension_checker = Some(checker);
        self
    }

    pub fn build(self) -> Result<AdmissionChain, ConfigurationError> {
        let keeper = Arc::new(
            self.account_keeper
                .ok_or(ConfigurationError::MissingCollaborator("account keeper"))?,
        );
        let fee_checker = self
            .fee_checker
            .ok_or(ConfigurationError::MissingCollaborator("fee checker"))?;
        let verifier = self
            .sig_verifier
            .ok_or(ConfigurationError::MissingCollaborator("signature verifier"))?;
        let admin = self
            .privileged_admin
            .ok_or(ConfigurationError::MissingCollaborator("privileged admin predicate"))?;
        let extensions = self
            .extension_checker
            .unwrap_or_else(|| Arc::new(RejectAllExtensions));

        let config = self.config;
        if config.min_commission_rate > Dec::ONE {
            return Err(ConfigurationError::Invalid(format!(
                "min commission rate {} exceeds 1",
                config.min_commission_rate
            )));
        }
        let depth = config.max_nesting_depth;

        let gatekeepers: Vec<Box<dyn Gatekeeper>> = vec![
            Box::new(SetUpContext),
            Box::new(CircuitBreaker),
            Box::new(RejectExtensionOptions::new(extensions)),
            Box::new(ValidateBasic::new(depth)),
            Box::new(TxTimeoutHeight),
            Box::new(ValidateMemo::new(keeper.clone())),
            Box::new(ConsumeTxSizeGas::new(keeper.clone())),
            Box::new(DeductFee::new(keeper.clone(), fee_checker)),
            Box::new(SetPubKey::new(keeper.clone())),
            Box::new(ValidateSigCount::new(keeper.clone())),
            Box::new(SigGasConsume::new(keeper.clone())),
            Box::new(SigVerification::new(keeper.clone(), verifier)),
            Box::new(IncrementSequence::new(keeper)),
            Box::new(StakingDisabled::new(depth)),
            Box::new(CommissionLimit::new(config.min_commission_rate, depth)),
            Box::new(ManualMintGate::new(admin)),
            Box::new(MessageFilter::new(config.blocked_message_kinds, depth)),
            Box::new(RedundantRelay),
        ];

        Ok(AdmissionChain::from_gatekeepers(gatekeepers))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Shared fixtures for gatekeeper unit tests.

    use mrd_mint_policy::{Address, Coin};

    use crate::{
        context::{BlockHeader, Context, ExecMode},
        ledger::MemLedger,
        types::{AnyMessage, Fee, Message, Tx},
    };

    pub fn ctx(store: &mut MemLedger, mode: ExecMode, height: u64) -> Context<'_> {
        Context::new(
            BlockHeader {
                chain_id: "meridian-test".to_string(),
                height,
            },
            mode,
            store,
        )
    }

    pub fn tx_of(msgs: Vec<Message>) -> Tx {
        let msgs = msgs
            .iter()
            .map(|m| AnyMessage::pack(m).unwrap())
            .collect();
        Tx::new(msgs, Fee::default())
    }

    pub fn send(from: &str, to: &str, amount: u128) -> Message {
        Message::Send {
            from: Address::from(from),
            to: Address::from(to),
            amount: vec![Coin::new("umrd", amount)],
        }
    }

    pub fn exec(grantee: &str, inner: Vec<Message>) -> Message {
        Message::Exec {
            grantee: Address::from(grantee),
            msgs: inner.iter().map(|m| AnyMessage::pack(m).unwrap()).collect(),
        }
    }
}
