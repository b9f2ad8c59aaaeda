// Copyright (c) 2024 Botho Foundation

use super::{AdmissionError, Gatekeeper, Next};
use crate::{
    context::{Context, GasMeter},
    types::Tx,
};

/// Installs the gas meter. Must be first in the chain.
///
/// The meter is infinite when simulating and at genesis; otherwise it is
/// bounded by the fee's gas limit.
#[derive(Debug, Clone, Copy, Default)]
pub struct SetUpContext;

impl Gatekeeper for SetUpContext {
    fn name(&self) -> &'static str {
        "set_up_context"
    }

    fn evaluate(
        &self,
        ctx: &mut Context<'_>,
        tx: &Tx,
        simulate: bool,
        next: Next<'_>,
    ) -> Result<(), AdmissionError> {
        let gas_limit = tx.auth_info.fee.gas_limit;
        ctx.gas_meter = if simulate || ctx.height() == 0 {
            GasMeter::infinite()
        } else {
            GasMeter::new(gas_limit)
        };

        if let Some(max_gas) = ctx.block_max_gas {
            if gas_limit > max_gas {
                return Err(AdmissionError::InvalidGasLimit(format!(
                    "tx gas limit {gas_limit} exceeds block max gas {max_gas}"
                )));
            }
        }

        next.run(ctx, tx, simulate)
    }
}
