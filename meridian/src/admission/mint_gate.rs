// Copyright (c) 2024 Botho Foundation

use std::sync::Arc;

use super::{AdmissionError, Gatekeeper, Next, PrivilegedAdmin};
use crate::{
    context::Context,
    types::{Message, Tx, MSG_MINT},
};

/// Blocks privileged manual minting while block inflation is non-zero.
///
/// Only the first top-level mint message is inspected. Mints from
/// non-privileged senders pass here and are refused when routed.
pub struct ManualMintGate {
    admin: Arc<dyn PrivilegedAdmin>,
}

impl ManualMintGate {
    pub fn new(admin: Arc<dyn PrivilegedAdmin>) -> Self {
        Self { admin }
    }
}

impl Gatekeeper for ManualMintGate {
    fn name(&self) -> &'static str {
        "manual_mint_gate"
    }

    fn evaluate(
        &self,
        ctx: &mut Context<'_>,
        tx: &Tx,
        simulate: bool,
        next: Next<'_>,
    ) -> Result<(), AdmissionError> {
        let Some(any) = tx.body.messages.iter().find(|m| m.kind == MSG_MINT) else {
            return next.run(ctx, tx, simulate);
        };
        let Message::Mint { sender, .. } = any.unpack()? else {
            return Err(AdmissionError::TxDecode(format!(
                "{} does not carry a mint message",
                any.kind
            )));
        };

        if self.admin.is_privileged_admin(&*ctx, &sender) {
            let inflation = ctx.store.get_minter_state()?.inflation;
            if !inflation.is_zero() {
                return Err(AdmissionError::ManualMintDisabled { inflation });
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
            testing::{ctx, send, tx_of},
            AdmissionChain, StaticAdmins,
        },
        context::ExecMode,
        ledger::{LedgerError, MemLedger, ParameterStore},
    };
    use mrd_mint_policy::{Address, Coin, Dec, MinterState};

    fn mint(sender: &str) -> Message {
        Message::Mint {
            sender: Address::from(sender),
            amount: Coin::new("umrd", 100),
        }
    }

    fn chain() -> AdmissionChain {
        AdmissionChain::from_gatekeepers(vec![Box::new(ManualMintGate::new(Arc::new(
            StaticAdmins::new([Address::from("admin")]),
        )))])
    }

    fn store_with_inflation(inflation: &str) -> MemLedger {
        let mut store = MemLedger::default();
        store
            .set_minter_state(MinterState::initial(inflation.parse().unwrap()))
            .unwrap();
        store
    }

    #[test]
    fn test_admin_mint_rejected_while_inflating() {
        let mut store = store_with_inflation("0.01");
        let mut ctx = ctx(&mut store, ExecMode::Check, 4);
        let err = chain()
            .evaluate(&mut ctx, &tx_of(vec![mint("admin")]), false)
            .unwrap_err();
        assert_eq!(
            err,
            AdmissionError::ManualMintDisabled {
                inflation: "0.01".parse::<Dec>().unwrap()
            }
        );
        assert!(err.to_string().contains("0.010000000000000000"));
    }

    #[test]
    fn test_admin_mint_allowed_at_zero_inflation() {
        let mut store = store_with_inflation("0");
        let mut ctx = ctx(&mut store, ExecMode::Check, 4);
        assert!(chain()
            .evaluate(&mut ctx, &tx_of(vec![mint("admin")]), false)
            .is_ok());
    }

    #[test]
    fn test_non_admin_mint_passes() {
        let mut store = store_with_inflation("0.01");
        let mut ctx = ctx(&mut store, ExecMode::Check, 4);
        assert!(chain()
            .evaluate(&mut ctx, &tx_of(vec![mint("user")]), false)
            .is_ok());
    }

    #[test]
    fn test_only_first_mint_inspected() {
        let mut store = store_with_inflation("0.01");
        let mut ctx = ctx(&mut store, ExecMode::Check, 4);
        let tx = tx_of(vec![send("user", "bob", 1), mint("user"), mint("admin")]);
        assert!(chain().evaluate(&mut ctx, &tx, false).is_ok());
    }

    #[test]
    fn test_missing_minter_state_is_an_error() {
        let mut store = MemLedger::default();
        let mut ctx = ctx(&mut store, ExecMode::Check, 4);
        assert_eq!(
            chain().evaluate(&mut ctx, &tx_of(vec![mint("admin")]), false),
            Err(AdmissionError::Ledger(LedgerError::MissingParam(
                "minter state"
            )))
        );
    }
}
