// Copyright (c) 2024 Botho Foundation

//! Staking restrictions.

use mrd_mint_policy::Dec;

use super::{
    walk::{walk_error, walk_messages},
    AdmissionError, Gatekeeper, Next,
};
use crate::{
    context::Context,
    types::{AnyMessage, Message, Tx},
};

/// Rejects delegation messages at any nesting depth. Validator create and
/// edit are left to [`CommissionLimit`].
#[derive(Debug, Clone, Copy)]
pub struct StakingDisabled {
    max_depth: usize,
}

impl StakingDisabled {
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }
}

impl Gatekeeper for StakingDisabled {
    fn name(&self) -> &'static str {
        "staking_disabled"
    }

    fn evaluate(
        &self,
        ctx: &mut Context<'_>,
        tx: &Tx,
        simulate: bool,
        next: Next<'_>,
    ) -> Result<(), AdmissionError> {
        let mut visit = |any: &AnyMessage, msg: &Message| {
            if msg.is_delegation() {
                return Err(AdmissionError::StakingDisabled {
                    kind: any.kind.clone(),
                });
            }
            Ok(())
        };
        walk_messages(&tx.body.messages, self.max_depth, &mut visit)
            .map_err(|err| walk_error(err, self.max_depth, ctx.height()))?;

        next.run(ctx, tx, simulate)
    }
}

/// Enforces a minimum validator commission rate on create and edit.
#[derive(Debug, Clone, Copy)]
pub struct CommissionLimit {
    min_rate: Dec,
    max_depth: usize,
}

impl CommissionLimit {
    pub fn new(min_rate: Dec, max_depth: usize) -> Self {
        Self {
            min_rate,
            max_depth,
        }
    }
}

impl Gatekeeper for CommissionLimit {
    fn name(&self) -> &'static str {
        "commission_limit"
    }

    fn evaluate(
        &self,
        ctx: &mut Context<'_>,
        tx: &Tx,
        simulate: bool,
        next: Next<'_>,
    ) -> Result<(), AdmissionError> {
        let min = self.min_rate;
        let mut visit = |_: &AnyMessage, msg: &Message| {
            let rate = match msg {
                Message::CreateValidator {
                    commission_rate, ..
                } => Some(*commission_rate),
                Message::EditValidator {
                    commission_rate, ..
                } => *commission_rate,
                _ => None,
            };
            match rate {
                Some(rate) if rate < min => Err(AdmissionError::CommissionTooLow { rate, min }),
                _ => Ok(()),
            }
        };
        walk_messages(&tx.body.messages, self.max_depth, &mut visit)
            .map_err(|err| walk_error(err, self.max_depth, ctx.height()))?;

        next.run(ctx, tx, simulate)
    }
}
