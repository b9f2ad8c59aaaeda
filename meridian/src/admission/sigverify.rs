// Copyright (c) 2024 Botho Foundation

//! Public keys, signatures and sequences.

use std::sync::Arc;

use super::{AccountKeeper, AdmissionError, Gatekeeper, Next, SignatureVerifier};
use crate::{
    context::{Context, Event, ExecMode},
    types::{PubKey, Tx},
};

/// Stands in for missing keys when simulating.
const SIMULATION_PUBKEY: PubKey = PubKey([0; 32]);

/// Records each signer's public key on its account the first time it is seen.
pub struct SetPubKey {
    keeper: Arc<AccountKeeper>,
}

impl SetPubKey {
    pub fn new(keeper: Arc<AccountKeeper>) -> Self {
        Self { keeper }
    }
}

impl Gatekeeper for SetPubKey {
    fn name(&self) -> &'static str {
        "set_pub_key"
    }

    fn evaluate(
        &self,
        ctx: &mut Context<'_>,
        tx: &Tx,
        simulate: bool,
        next: Next<'_>,
    ) -> Result<(), AdmissionError> {
        let signers = tx.signers()?;
        for (signer, info) in signers.iter().zip(&tx.auth_info.signer_infos) {
            let pub_key = match (info.public_key, simulate) {
                (Some(key), _) => key,
                (None, true) => SIMULATION_PUBKEY,
                (None, false) => continue,
            };
            if !simulate && pub_key.address() != *signer {
                return Err(AdmissionError::InvalidPubKey(format!(
                    "pubkey does not match signer address {signer}"
                )));
            }

            let mut account = self.keeper.signer_account(&*ctx.store, signer)?;
            if account.pub_key.is_none() {
                account.pub_key = Some(pub_key);
                ctx.store.set_account(account);
            }
        }

        for signer in &signers {
            let account = self.keeper.signer_account(&*ctx.store, signer)?;
            ctx.emit(Event::new("tx").attr("acc_seq", format!("{}/{}", signer, account.sequence)));
        }

        next.run(ctx, tx, simulate)
    }
}

/// Bounds the number of public keys a transaction may carry.
pub struct ValidateSigCount {
    keeper: Arc<AccountKeeper>,
}

impl ValidateSigCount {
    pub fn new(keeper: Arc<AccountKeeper>) -> Self {
        Self { keeper }
    }
}

impl Gatekeeper for ValidateSigCount {
    fn name(&self) -> &'static str {
        "validate_sig_count"
    }

    fn evaluate(
        &self,
        ctx: &mut Context<'_>,
        tx: &Tx,
        simulate: bool,
        next: Next<'_>,
    ) -> Result<(), AdmissionError> {
        let max = self.keeper.params().tx_sig_limit;
        let got = tx
            .auth_info
            .signer_infos
            .iter()
            .filter(|info| info.public_key.is_some())
            .count() as u64;
        if got > max {
            return Err(AdmissionError::TooManySignatures { max, got });
        }
        next.run(ctx, tx, simulate)
    }
}

/// Charges the verification cost of each signature.
pub struct SigGasConsume {
    keeper: Arc<AccountKeeper>,
}

impl SigGasConsume {
    pub fn new(keeper: Arc<AccountKeeper>) -> Self {
        Self { keeper }
    }
}

impl Gatekeeper for SigGasConsume {
    fn name(&self) -> &'static str {
        "sig_gas_consume"
    }

    fn evaluate(
        &self,
        ctx: &mut Context<'_>,
        tx: &Tx,
        simulate: bool,
        next: Next<'_>,
    ) -> Result<(), AdmissionError> {
        let cost = self.keeper.params().sig_verify_cost_ed25519;
        for signer in tx.signers()? {
            let account = self.keeper.signer_account(&*ctx.store, &signer)?;
            if account.pub_key.is_none() && !simulate {
                return Err(AdmissionError::InvalidPubKey(format!(
                    "pubkey on account {signer} is not set"
                )));
            }
            ctx.consume_gas(cost, "ante verify: ed25519")?;
        }
        next.run(ctx, tx, simulate)
    }
}

/// Checks sequences and verifies signatures over the sign bytes.
///
/// Signatures are not verified when simulating or re-checking. Sequences are
/// always compared but never moved here.
pub struct SigVerification {
    keeper: Arc<AccountKeeper>,
    verifier: Arc<dyn SignatureVerifier>,
}

impl SigVerification {
    pub fn new(keeper: Arc<AccountKeeper>, verifier: Arc<dyn SignatureVerifier>) -> Self {
        Self { keeper, verifier }
    }

    fn verify(&self, ctx: &Context<'_>, tx: &Tx, simulate: bool) -> Result<(), AdmissionError> {
        let signers = tx.signers()?;
        let infos = &tx.auth_info.signer_infos;
        if tx.signatures.len() != signers.len() || infos.len() != signers.len() {
            return Err(AdmissionError::Unauthorized(format!(
                "invalid number of signer; expected: {}, got {}",
                signers.len(),
                tx.signatures.len()
            )));
        }

        let skip_signatures = simulate || ctx.mode == ExecMode::ReCheck;
        for ((signer, info), signature) in signers.iter().zip(infos).zip(&tx.signatures) {
            let account = self.keeper.signer_account(&*ctx.store, signer)?;
            let pub_key = match account.pub_key {
                Some(key) => key,
                None if simulate => SIMULATION_PUBKEY,
                None => {
                    return Err(AdmissionError::InvalidPubKey(
                        "pubkey on account is not set".to_string(),
                    ))
                }
            };

            if info.sequence != account.sequence {
                return Err(AdmissionError::WrongSequence {
                    expected: account.sequence,
                    got: info.sequence,
                });
            }
            if skip_signatures {
                continue;
            }

            let account_number = if ctx.height() == 0 { 0 } else { account.number };
            let sign_bytes = tx.sign_bytes(ctx.chain_id(), account_number)?;
            if !self.verifier.verify(&pub_key, &sign_bytes, signature) {
                return Err(AdmissionError::Unauthorized(format!(
                    "signature verification failed; please verify account number ({}), sequence ({}) and chain-id ({})",
                    account_number,
                    account.sequence,
                    ctx.chain_id()
                )));
            }
        }
        Ok(())
    }
}

impl Gatekeeper for SigVerification {
    fn name(&self) -> &'static str {
        "sig_verification"
    }

    fn evaluate(
        &self,
        ctx: &mut Context<'_>,
        tx: &Tx,
        simulate: bool,
        next: Next<'_>,
    ) -> Result<(), AdmissionError> {
        self.verify(ctx, tx, simulate)?;
        next.run(ctx, tx, simulate)
    }
}

pub struct IncrementSequence {
    keeper: Arc<AccountKeeper>,
}

impl IncrementSequence {
    pub fn new(keeper: Arc<AccountKeeper>) -> Self {
        Self { keeper }
    }
}

impl Gatekeeper for IncrementSequence {
    fn name(&self) -> &'static str {
        "increment_sequence"
    }

    fn evaluate(
        &self,
        ctx: &mut Context<'_>,
        tx: &Tx,
        simulate: bool,
        next: Next<'_>,
    ) -> Result<(), AdmissionError> {
        for signer in tx.signers()? {
            let mut account = self.keeper.signer_account(&*ctx.store, &signer)?;
            account.sequence = account.sequence.saturating_add(1);
            ctx.store.set_account(account);
        }
        next.run(ctx, tx, simulate)
    }
}
