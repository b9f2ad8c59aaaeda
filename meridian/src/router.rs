// Copyright (c) 2024 Botho Foundation

//! Executes admitted messages.

use mrd_mint_policy::{Address, Coin};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::{
    admission::PrivilegedAdmin,
    context::{Context, Event},
    ledger::LedgerError,
    monetary::MonetaryPolicyEngine,
    types::{AnyMessage, Message, MessageError},
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouterError {
    #[error(transparent)]
    Decode(#[from] MessageError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("{0} is not a privileged admin")]
    NotPrivileged(Address),

    #[error("invalid authority; expected {expected}, got {got}")]
    InvalidAuthority { expected: Address, got: Address },

    #[error("{grantee} is not authorized to execute {kind} for {granter}")]
    NoAuthorization {
        granter: Address,
        grantee: Address,
        kind: String,
    },

    #[error("message nesting exceeds depth {0}")]
    TooDeep(usize),

    #[error("no handler for {0}")]
    Unroutable(String),
}

pub struct MessageRouter {
    authority: Address,
    admin: Arc<dyn PrivilegedAdmin>,
    engine: Arc<MonetaryPolicyEngine>,
    max_nesting_depth: usize,
}

impl MessageRouter {
    /// `authority` is the governance account allowed to update stakeholders
    /// and burn holding remainders.
    pub fn new(
        authority: Address,
        admin: Arc<dyn PrivilegedAdmin>,
        engine: Arc<MonetaryPolicyEngine>,
        max_nesting_depth: usize,
    ) -> Self {
        Self {
            authority,
            admin,
            engine,
            max_nesting_depth,
        }
    }

    pub fn authority(&self) -> &Address {
        &self.authority
    }

    /// Execute `msgs` in order, stopping at the first failure.
    pub fn dispatch(&self, ctx: &mut Context<'_>, msgs: &[AnyMessage]) -> Result<(), RouterError> {
        for any in msgs {
            self.handle(ctx, &any.unpack()?, 0)?;
        }
        Ok(())
    }

    fn handle(&self, ctx: &mut Context<'_>, msg: &Message, depth: usize) -> Result<(), RouterError> {
        if depth > self.max_nesting_depth {
            return Err(RouterError::TooDeep(self.max_nesting_depth));
        }

        match msg {
            Message::Send { from, to, amount } => {
                transfer_all(ctx, from, to, amount)?;
            }
            Message::MultiSend { inputs, outputs } => {
                // Validation guarantees a single input covering all outputs.
                let Some(input) = inputs.first() else {
                    return Err(MessageError::Invalid("multi-send has no input".to_string()).into());
                };
                for output in outputs {
                    transfer_all(ctx, &input.address, &output.address, &output.coins)?;
                }
            }
            Message::Mint { sender, amount } => {
                if !self.admin.is_privileged_admin(&*ctx, sender) {
                    return Err(RouterError::NotPrivileged(sender.clone()));
                }
                ctx.store.mint_coins(sender, amount)?;
            }
            Message::Exec { grantee, msgs } => {
                for any in msgs {
                    let inner = any.unpack()?;
                    inner.validate_basic()?;
                    if let Some(signer) = inner.signer() {
                        if signer != grantee && !ctx.store.has_grant(signer, grantee, &any.kind) {
                            return Err(RouterError::NoAuthorization {
                                granter: signer.clone(),
                                grantee: grantee.clone(),
                                kind: any.kind.clone(),
                            });
                        }
                    }
                    self.handle(ctx, &inner, depth + 1)?;
                }
            }
            Message::UpdateStakeholders { authority, params } => {
                self.check_authority(authority)?;
                ctx.store.set_stakeholder_params(params.clone())?;
            }
            Message::BurnHoldingRemainder { authority, amount } => {
                self.check_authority(authority)?;
                self.engine.burn_holding_remainder(ctx, amount)?;
            }
            Message::RecvPacket { packet, .. } => {
                ctx.store
                    .set_packet_receipt(&packet.destination_channel, packet.sequence);
            }
            Message::Acknowledgement { packet, .. } | Message::Timeout { packet, .. } => {
                ctx.store
                    .delete_packet_commitment(&packet.source_channel, packet.sequence);
            }
            Message::UpdateClient { .. } => {}
            Message::Delegate { .. }
            | Message::Undelegate { .. }
            | Message::CreateValidator { .. }
            | Message::EditValidator { .. }
            | Message::Generic { .. } => {
                return Err(RouterError::Unroutable(msg.kind().to_string()));
            }
        }

        debug!(kind = msg.kind(), depth, "message executed");
        let mut event = Event::new("message").attr("action", msg.kind());
        if let Some(signer) = msg.signer() {
            event = event.attr("sender", signer);
        }
        ctx.emit(event);
        Ok(())
    }

    fn check_authority(&self, got: &Address) -> Result<(), RouterError> {
        if *got != self.authority {
            return Err(RouterError::InvalidAuthority {
                expected: self.authority.clone(),
                got: got.clone(),
            });
        }
        Ok(())
    }
}

fn transfer_all(
    ctx: &mut Context<'_>,
    from: &Address,
    to: &Address,
    coins: &[Coin],
) -> Result<(), LedgerError> {
    for coin in coins {
        ctx.store.transfer(from, to, coin)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        admission::{
            testing::{ctx, exec, send},
            StaticAdmins,
        },
        context::ExecMode,
        ledger::{AccountStore, BalanceLedger, MemLedger, ParameterStore, RelayStore},
        types::{Input, Output, Packet, MSG_MULTI_SEND, MSG_SEND},
    };
    use assert_matches::assert_matches;
    use mrd_mint_policy::{StakeHolder, StakeholderParams};

    fn addr(s: &str) -> Address {
        Address::from(s)
    }

    fn router() -> MessageRouter {
        MessageRouter::new(
            addr("gov"),
            Arc::new(StaticAdmins::new([addr("admin")])),
            Arc::new(MonetaryPolicyEngine::new(addr("mint"))),
            8,
        )
    }

    fn funded() -> MemLedger {
        let mut store = MemLedger::default();
        store
            .mint_coins(&addr("alice"), &Coin::new("umrd", 100))
            .unwrap();
        store
    }

    fn dispatch(store: &mut MemLedger, msgs: Vec<Message>) -> Result<(), RouterError> {
        let msgs: Vec<_> = msgs.iter().map(|m| AnyMessage::pack(m).unwrap()).collect();
        let mut ctx = ctx(store, ExecMode::Deliver, 2);
        router().dispatch(&mut ctx, &msgs)
    }

    #[test]
    fn test_send() {
        let mut store = funded();
        dispatch(&mut store, vec![send("alice", "bob", 30)]).unwrap();
        assert_eq!(store.get_balance(&addr("alice"), "umrd"), 70);
        assert_eq!(store.get_balance(&addr("bob"), "umrd"), 30);

        assert_matches!(
            dispatch(&mut store, vec![send("alice", "bob", 71)]),
            Err(RouterError::Ledger(LedgerError::InsufficientFunds { .. }))
        );
    }

    #[test]
    fn test_mint_requires_admin() {
        let mut store = funded();
        let mint = |sender: &str| Message::Mint {
            sender: addr(sender),
            amount: Coin::new("umrd", 5),
        };
        dispatch(&mut store, vec![mint("admin")]).unwrap();
        assert_eq!(store.get_balance(&addr("admin"), "umrd"), 5);

        assert_eq!(
            dispatch(&mut store, vec![mint("alice")]),
            Err(RouterError::NotPrivileged(addr("alice")))
        );
    }

    #[test]
    fn test_exec_requires_grant() {
        let mut store = funded();
        let wrapped = exec("bob", vec![send("alice", "carol", 10)]);
        assert_matches!(
            dispatch(&mut store, vec![wrapped.clone()]),
            Err(RouterError::NoAuthorization { .. })
        );

        store.grant(&addr("alice"), &addr("bob"), MSG_SEND);
        dispatch(&mut store, vec![wrapped]).unwrap();
        assert_eq!(store.get_balance(&addr("carol"), "umrd"), 10);
    }

    #[test]
    fn test_exec_rejects_invalid_inner_message() {
        let mut store = funded();
        store.grant(&addr("alice"), &addr("bob"), MSG_SEND);
        store.grant(&addr("alice"), &addr("bob"), MSG_MULTI_SEND);

        assert_matches!(
            dispatch(&mut store, vec![exec("bob", vec![send("alice", "", 7)])]),
            Err(RouterError::Decode(MessageError::Invalid(_)))
        );
        assert_eq!(store.get_balance(&addr(""), "umrd"), 0);

        let unbalanced = Message::MultiSend {
            inputs: vec![Input {
                address: addr("alice"),
                coins: vec![Coin::new("umrd", 1)],
            }],
            outputs: vec![Output {
                address: addr("bob"),
                coins: vec![Coin::new("umrd", 100)],
            }],
        };
        assert_matches!(
            dispatch(&mut store, vec![exec("bob", vec![unbalanced])]),
            Err(RouterError::Decode(MessageError::Invalid(_)))
        );
        assert_eq!(store.get_balance(&addr("alice"), "umrd"), 100);
        assert_eq!(store.get_balance(&addr("bob"), "umrd"), 0);
    }

    #[test]
    fn test_stakeholder_update_requires_authority() {
        let mut store = funded();
        let params = StakeholderParams::new(vec![StakeHolder::new("alice", 100_000_000)]);
        let update = |authority: &str, params: StakeholderParams| Message::UpdateStakeholders {
            authority: addr(authority),
            params,
        };

        assert_matches!(
            dispatch(&mut store, vec![update("alice", params.clone())]),
            Err(RouterError::InvalidAuthority { .. })
        );
        dispatch(&mut store, vec![update("gov", params.clone())]).unwrap();
        assert_eq!(store.get_stakeholder_params().unwrap(), params);

        let invalid = StakeholderParams::new(vec![StakeHolder::new("bob", 1)]);
        assert_matches!(
            dispatch(&mut store, vec![update("gov", invalid)]),
            Err(RouterError::Ledger(LedgerError::InvalidParams(_)))
        );
        assert_eq!(store.get_stakeholder_params().unwrap(), params);
    }

    #[test]
    fn test_relay_bookkeeping() {
        let mut store = MemLedger::default();
        store.set_packet_commitment("channel-0", 4);
        let packet = Packet {
            source_channel: "channel-0".to_string(),
            destination_channel: "channel-1".to_string(),
            sequence: 4,
        };
        dispatch(
            &mut store,
            vec![
                Message::RecvPacket {
                    signer: addr("relayer"),
                    packet: packet.clone(),
                },
                Message::Acknowledgement {
                    signer: addr("relayer"),
                    packet,
                },
            ],
        )
        .unwrap();
        assert!(store.has_packet_receipt("channel-1", 4));
        assert!(!store.has_packet_commitment("channel-0", 4));
    }

    #[test]
    fn test_staking_unroutable() {
        let mut store = funded();
        let delegate = Message::Delegate {
            delegator: addr("alice"),
            validator: addr("val"),
            amount: Coin::new("umrd", 1),
        };
        assert_matches!(
            dispatch(&mut store, vec![delegate]),
            Err(RouterError::Unroutable(_))
        );
    }
}
