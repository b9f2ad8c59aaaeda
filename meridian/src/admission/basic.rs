// Copyright (c) 2024 Botho Foundation

//! Structural checks that run before any fee is taken.

use mrd_mint_policy::validate_coins;
use std::sync::Arc;

use super::{
    walk::{walk_error, walk_messages},
    AccountKeeper, AdmissionError, ExtensionOptionChecker, Gatekeeper, Next,
};
use crate::{
    context::{Context, ExecMode},
    types::{AnyMessage, Message, Tx, MAX_GAS_WANTED},
};

/// Size of a placeholder ed25519 signature when simulating.
const SIMULATION_SIGNATURE_LEN: u64 = 64;
/// Size of a placeholder public key when simulating.
const SIMULATION_PUBKEY_LEN: u64 = 32;
/// Per-signature framing overhead.
const SIGNATURE_OVERHEAD: u64 = 6;

/// Rejects transactions carrying a message kind disabled in the circuit
/// breaker.
#[derive(Debug, Clone, Copy, Default)]
pub struct CircuitBreaker;

impl Gatekeeper for CircuitBreaker {
    fn name(&self) -> &'static str {
        "circuit_breaker"
    }

    fn evaluate(
        &self,
        ctx: &mut Context<'_>,
        tx: &Tx,
        simulate: bool,
        next: Next<'_>,
    ) -> Result<(), AdmissionError> {
        if tx
            .body
            .messages
            .iter()
            .any(|msg| ctx.store.is_kind_disabled(&msg.kind))
        {
            return Err(AdmissionError::TxTypeNotAllowed);
        }
        next.run(ctx, tx, simulate)
    }
}

pub struct RejectExtensionOptions {
    checker: Arc<dyn ExtensionOptionChecker>,
}

impl RejectExtensionOptions {
    pub fn new(checker: Arc<dyn ExtensionOptionChecker>) -> Self {
        Self { checker }
    }
}

impl Gatekeeper for RejectExtensionOptions {
    fn name(&self) -> &'static str {
        "reject_extension_options"
    }

    fn evaluate(
        &self,
        ctx: &mut Context<'_>,
        tx: &Tx,
        simulate: bool,
        next: Next<'_>,
    ) -> Result<(), AdmissionError> {
        if !tx
            .body
            .extension_options
            .iter()
            .all(|opt| self.checker.accepts(opt))
        {
            return Err(AdmissionError::UnknownExtensionOptions);
        }
        next.run(ctx, tx, simulate)
    }
}

/// Stateless validation of the transaction and its messages, including those
/// wrapped in an exec. Skipped on re-check.
#[derive(Debug, Clone, Copy)]
pub struct ValidateBasic {
    max_depth: usize,
}

impl ValidateBasic {
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    fn validate(&self, tx: &Tx, height: u64) -> Result<(), AdmissionError> {
        if tx.body.messages.is_empty() {
            return Err(AdmissionError::InvalidRequest(
                "must contain at least one message".to_string(),
            ));
        }

        let fee = &tx.auth_info.fee;
        if fee.gas_limit > MAX_GAS_WANTED {
            return Err(AdmissionError::InvalidRequest(format!(
                "invalid gas supplied; {} > {}",
                fee.gas_limit, MAX_GAS_WANTED
            )));
        }
        validate_coins(&fee.amount).map_err(|e| AdmissionError::InvalidCoins(e.to_string()))?;

        let mut visit =
            |_: &AnyMessage, msg: &Message| msg.validate_basic().map_err(AdmissionError::from);
        walk_messages(&tx.body.messages, self.max_depth, &mut visit)
            .map_err(|err| walk_error(err, self.max_depth, height))?;

        if tx.signatures.is_empty() {
            return Err(AdmissionError::NoSignatures);
        }
        let signers = tx.signers()?;
        if tx.signatures.len() != signers.len() {
            return Err(AdmissionError::Unauthorized(format!(
                "wrong number of signers; expected {}, got {}",
                signers.len(),
                tx.signatures.len()
            )));
        }
        Ok(())
    }
}

impl Gatekeeper for ValidateBasic {
    fn name(&self) -> &'static str {
        "validate_basic"
    }

    fn evaluate(
        &self,
        ctx: &mut Context<'_>,
        tx: &Tx,
        simulate: bool,
        next: Next<'_>,
    ) -> Result<(), AdmissionError> {
        if ctx.mode != ExecMode::ReCheck {
            self.validate(tx, ctx.height())?;
        }
        next.run(ctx, tx, simulate)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TxTimeoutHeight;

impl Gatekeeper for TxTimeoutHeight {
    fn name(&self) -> &'static str {
        "tx_timeout_height"
    }

    fn evaluate(
        &self,
        ctx: &mut Context<'_>,
        tx: &Tx,
        simulate: bool,
        next: Next<'_>,
    ) -> Result<(), AdmissionError> {
        let timeout = tx.body.timeout_height;
        if timeout > 0 && ctx.height() > timeout {
            return Err(AdmissionError::TxTimeoutHeight {
                timeout,
                height: ctx.height(),
            });
        }
        next.run(ctx, tx, simulate)
    }
}

pub struct ValidateMemo {
    keeper: Arc<AccountKeeper>,
}

impl ValidateMemo {
    pub fn new(keeper: Arc<AccountKeeper>) -> Self {
        Self { keeper }
    }
}

impl Gatekeeper for ValidateMemo {
    fn name(&self) -> &'static str {
        "validate_memo"
    }

    fn evaluate(
        &self,
        ctx: &mut Context<'_>,
        tx: &Tx,
        simulate: bool,
        next: Next<'_>,
    ) -> Result<(), AdmissionError> {
        let max = self.keeper.params().max_memo_characters;
        let got = tx.body.memo.chars().count();
        if got > max {
            return Err(AdmissionError::MemoTooLarge { max, got });
        }
        next.run(ctx, tx, simulate)
    }
}

/// Charges gas proportional to the encoded transaction size.
///
/// When simulating, signatures and keys are usually absent, so each signer
/// is also charged for a placeholder signature and public key.
pub struct ConsumeTxSizeGas {
    keeper: Arc<AccountKeeper>,
}

impl ConsumeTxSizeGas {
    pub fn new(keeper: Arc<AccountKeeper>) -> Self {
        Self { keeper }
    }
}

impl Gatekeeper for ConsumeTxSizeGas {
    fn name(&self) -> &'static str {
        "consume_tx_size_gas"
    }

    fn evaluate(
        &self,
        ctx: &mut Context<'_>,
        tx: &Tx,
        simulate: bool,
        next: Next<'_>,
    ) -> Result<(), AdmissionError> {
        let cost_per_byte = self.keeper.params().tx_size_cost_per_byte;
        let size = tx.encoded_len()?;
        ctx.consume_gas(cost_per_byte.saturating_mul(size), "txSize")?;

        if simulate {
            let placeholder =
                SIMULATION_SIGNATURE_LEN + SIMULATION_PUBKEY_LEN + SIGNATURE_OVERHEAD;
            for _signer in tx.signers()? {
                ctx.consume_gas(cost_per_byte.saturating_mul(placeholder), "txSize")?;
            }
        }

        next.run(ctx, tx, simulate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        admission::{
            testing::{ctx, exec, send, tx_of},
            AdmissionChain, AuthParams, RejectAllExtensions,
        },
        ledger::{MemLedger, ParameterStore},
        types::{AnyMessage, Input, Output, MSG_SEND},
    };
    use assert_matches::assert_matches;
    use mrd_mint_policy::{Address, Coin};

    fn chain_of(gatekeeper: impl Gatekeeper + 'static) -> AdmissionChain {
        AdmissionChain::from_gatekeepers(vec![Box::new(gatekeeper)])
    }

    fn keeper() -> Arc<AccountKeeper> {
        Arc::new(AccountKeeper::new(AuthParams::default()))
    }

    fn signed_send() -> Tx {
        let mut tx = tx_of(vec![send("alice", "bob", 1)]);
        tx.signatures.push(vec![0; 64]);
        tx
    }

    #[test]
    fn test_circuit_breaker() {
        let chain = chain_of(CircuitBreaker);
        let mut store = MemLedger::default();
        store.set_kind_disabled(MSG_SEND, true);

        let mut ctx = ctx(&mut store, ExecMode::Deliver, 1);
        assert_eq!(
            chain.evaluate(&mut ctx, &signed_send(), false),
            Err(AdmissionError::TxTypeNotAllowed)
        );
    }

    #[test]
    fn test_extension_options_rejected() {
        let chain = chain_of(RejectExtensionOptions::new(Arc::new(RejectAllExtensions)));
        let mut tx = signed_send();
        let mut store = MemLedger::default();
        let mut ctx = ctx(&mut store, ExecMode::Deliver, 1);
        assert!(chain.evaluate(&mut ctx, &tx, false).is_ok());

        tx.body
            .extension_options
            .push(AnyMessage::raw("/ext.v1.Option", vec![]));
        assert_eq!(
            chain.evaluate(&mut ctx, &tx, false),
            Err(AdmissionError::UnknownExtensionOptions)
        );
    }

    #[test]
    fn test_validate_basic() {
        let chain = chain_of(ValidateBasic::new(8));
        let mut store = MemLedger::default();
        let mut ctx = ctx(&mut store, ExecMode::Check, 1);

        assert!(chain.evaluate(&mut ctx, &signed_send(), false).is_ok());

        let unsigned = tx_of(vec![send("alice", "bob", 1)]);
        assert_eq!(
            chain.evaluate(&mut ctx, &unsigned, false),
            Err(AdmissionError::NoSignatures)
        );

        let mut two_signers = tx_of(vec![send("alice", "bob", 1), send("carol", "bob", 1)]);
        two_signers.signatures.push(vec![0; 64]);
        assert_matches!(
            chain.evaluate(&mut ctx, &two_signers, false),
            Err(AdmissionError::Unauthorized(_))
        );

        let mut empty = signed_send();
        empty.body.messages.clear();
        assert_matches!(
            chain.evaluate(&mut ctx, &empty, false),
            Err(AdmissionError::InvalidRequest(_))
        );

        let mut bad_fee = signed_send();
        bad_fee.auth_info.fee.amount = vec![Coin::new("umrd", 0)];
        assert_matches!(
            chain.evaluate(&mut ctx, &bad_fee, false),
            Err(AdmissionError::InvalidCoins(_))
        );

        let zero_send = {
            let mut tx = tx_of(vec![send("alice", "bob", 0)]);
            tx.signatures.push(vec![0; 64]);
            tx
        };
        assert_matches!(
            chain.evaluate(&mut ctx, &zero_send, false),
            Err(AdmissionError::InvalidRequest(_))
        );
    }

    #[test]
    fn test_validate_basic_descends_into_exec() {
        let chain = chain_of(ValidateBasic::new(1));
        let mut store = MemLedger::default();
        let mut ctx = ctx(&mut store, ExecMode::Check, 3);

        let signed = |msg: Message| {
            let mut tx = tx_of(vec![msg]);
            tx.signatures.push(vec![0; 64]);
            tx
        };

        let nested_ok = signed(exec("bob", vec![send("alice", "bob", 7)]));
        assert!(chain.evaluate(&mut ctx, &nested_ok, false).is_ok());

        let empty_recipient = signed(exec("bob", vec![send("alice", "", 7)]));
        assert_matches!(
            chain.evaluate(&mut ctx, &empty_recipient, false),
            Err(AdmissionError::InvalidRequest(_))
        );

        let unbalanced = signed(exec(
            "bob",
            vec![Message::MultiSend {
                inputs: vec![Input {
                    address: Address::from("alice"),
                    coins: vec![Coin::new("umrd", 1)],
                }],
                outputs: vec![Output {
                    address: Address::from("bob"),
                    coins: vec![Coin::new("umrd", 1_000)],
                }],
            }],
        ));
        assert_matches!(
            chain.evaluate(&mut ctx, &unbalanced, false),
            Err(AdmissionError::InvalidRequest(_))
        );

        let too_deep = signed(exec("bob", vec![exec("bob", vec![send("alice", "bob", 7)])]));
        assert_eq!(
            chain.evaluate(&mut ctx, &too_deep, false),
            Err(AdmissionError::NestingTooDeep {
                max_depth: 1,
                height: 3
            })
        );
    }

    #[test]
    fn test_validate_basic_skipped_on_recheck() {
        let chain = chain_of(ValidateBasic::new(8));
        let mut store = MemLedger::default();
        let mut ctx = ctx(&mut store, ExecMode::ReCheck, 1);
        let unsigned = tx_of(vec![send("alice", "bob", 1)]);
        assert!(chain.evaluate(&mut ctx, &unsigned, false).is_ok());
    }

    #[test]
    fn test_timeout_height() {
        let chain = chain_of(TxTimeoutHeight);
        let mut tx = signed_send();
        tx.body.timeout_height = 10;

        let mut store = MemLedger::default();
        let mut at_timeout = ctx(&mut store, ExecMode::Deliver, 10);
        assert!(chain.evaluate(&mut at_timeout, &tx, false).is_ok());

        let mut store = MemLedger::default();
        let mut past = ctx(&mut store, ExecMode::Deliver, 11);
        assert_eq!(
            chain.evaluate(&mut past, &tx, false),
            Err(AdmissionError::TxTimeoutHeight {
                timeout: 10,
                height: 11
            })
        );
    }

    #[test]
    fn test_memo_length() {
        let chain = chain_of(ValidateMemo::new(keeper()));
        let mut tx = signed_send();
        tx.body.memo = "é".repeat(256);

        let mut store = MemLedger::default();
        let mut ctx = ctx(&mut store, ExecMode::Deliver, 1);
        assert!(chain.evaluate(&mut ctx, &tx, false).is_ok());

        tx.body.memo.push('x');
        assert_eq!(
            chain.evaluate(&mut ctx, &tx, false),
            Err(AdmissionError::MemoTooLarge { max: 256, got: 257 })
        );
    }

    #[test]
    fn test_size_gas() {
        let chain = chain_of(ConsumeTxSizeGas::new(keeper()));
        let tx = signed_send();
        let size = tx.encoded_len().unwrap();

        let mut store = MemLedger::default();
        let mut deliver = ctx(&mut store, ExecMode::Deliver, 1);
        chain.evaluate(&mut deliver, &tx, false).unwrap();
        assert_eq!(deliver.gas_meter.consumed(), 10 * size);

        let mut store = MemLedger::default();
        let mut simulate = ctx(&mut store, ExecMode::Simulate, 1);
        chain.evaluate(&mut simulate, &tx, true).unwrap();
        assert_eq!(simulate.gas_meter.consumed(), 10 * size + 10 * 102);
    }

    #[test]
    fn test_size_gas_out_of_gas() {
        let chain = chain_of(ConsumeTxSizeGas::new(keeper()));
        let mut store = MemLedger::default();
        let mut ctx = ctx(&mut store, ExecMode::Deliver, 1);
        ctx.gas_meter = crate::context::GasMeter::new(10);

        assert_matches!(
            chain.evaluate(&mut ctx, &signed_send(), false),
            Err(AdmissionError::OutOfGas { gas_wanted: 10, .. })
        );
    }
}
