// Copyright (c) 2024 Botho Foundation

use std::sync::Arc;
use tracing::trace;

use super::{keepers::display_coins, AccountKeeper, AdmissionError, Gatekeeper, Next, TxFeeChecker};
use crate::{
    context::{Context, Event},
    ledger::LedgerError,
    types::Tx,
};

/// Moves the fee from the payer to the fee collector and sets priority.
pub struct DeductFee {
    keeper: Arc<AccountKeeper>,
    fee_checker: Arc<dyn TxFeeChecker>,
}

impl DeductFee {
    pub fn new(keeper: Arc<AccountKeeper>, fee_checker: Arc<dyn TxFeeChecker>) -> Self {
        Self {
            keeper,
            fee_checker,
        }
    }

    fn deduct(&self, ctx: &mut Context<'_>, tx: &Tx, simulate: bool) -> Result<(), AdmissionError> {
        let fee = &tx.auth_info.fee;
        if !simulate && ctx.height() > 0 && fee.gas_limit == 0 {
            return Err(AdmissionError::InvalidGasLimit(
                "must provide positive gas".to_string(),
            ));
        }

        let (amount, priority) = if simulate {
            (fee.amount.clone(), 0)
        } else {
            self.fee_checker.check(ctx, tx)?
        };

        if fee.granter.is_some() {
            return Err(AdmissionError::InvalidRequest(
                "fee grants are not enabled".to_string(),
            ));
        }

        let payer = tx.fee_payer()?;
        self.keeper.signer_account(&*ctx.store, &payer)?;

        let collector = self.keeper.fee_collector();
        for coin in amount.iter().filter(|c| !c.is_zero()) {
            ctx.store
                .transfer(&payer, collector, coin)
                .map_err(|err| match err {
                    LedgerError::InsufficientFunds { .. } => {
                        AdmissionError::InsufficientFunds(err.to_string())
                    }
                    other => AdmissionError::Ledger(other),
                })?;
        }
        trace!(payer = %payer, fee = %display_coins(&amount), priority, "fee deducted");

        ctx.priority = priority;
        ctx.emit(
            Event::new("tx")
                .attr("fee", display_coins(&amount))
                .attr("fee_payer", &payer),
        );
        Ok(())
    }
}

impl Gatekeeper for DeductFee {
    fn name(&self) -> &'static str {
        "deduct_fee"
    }

    fn evaluate(
        &self,
        ctx: &mut Context<'_>,
        tx: &Tx,
        simulate: bool,
        next: Next<'_>,
    ) -> Result<(), AdmissionError> {
        self.deduct(ctx, tx, simulate)?;
        next.run(ctx, tx, simulate)
    }
}
