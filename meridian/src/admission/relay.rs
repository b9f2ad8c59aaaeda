// Copyright (c) 2024 Botho Foundation

use super::{AdmissionError, Gatekeeper, Next};
use crate::{
    context::Context,
    types::{Message, Tx},
};

/// Rejects relayer transactions in which every packet message has already
/// been processed.
///
/// Only applies in check and re-check mode; a redundant relay inside a block
/// is harmless. Client updates are not packet messages and never make a
/// transaction redundant on their own.
#[derive(Debug, Clone, Copy, Default)]
pub struct RedundantRelay;

impl Gatekeeper for RedundantRelay {
    fn name(&self) -> &'static str {
        "redundant_relay"
    }

    fn evaluate(
        &self,
        ctx: &mut Context<'_>,
        tx: &Tx,
        simulate: bool,
        next: Next<'_>,
    ) -> Result<(), AdmissionError> {
        if !ctx.mode.is_check() {
            return next.run(ctx, tx, simulate);
        }

        let mut packet_msgs = 0usize;
        let mut redundancies = 0usize;
        for msg in tx.messages()? {
            let redundant = match &msg {
                Message::RecvPacket { packet, .. } => ctx
                    .store
                    .has_packet_receipt(&packet.destination_channel, packet.sequence),
                Message::Acknowledgement { packet, .. } | Message::Timeout { packet, .. } => !ctx
                    .store
                    .has_packet_commitment(&packet.source_channel, packet.sequence),
                _ => continue,
            };
            packet_msgs += 1;
            if redundant {
                redundancies += 1;
            }
        }

        if packet_msgs > 0 && redundancies == packet_msgs {
            return Err(AdmissionError::RedundantRelay);
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
            AdmissionChain,
        },
        context::ExecMode,
        ledger::{MemLedger, RelayStore},
        types::Packet,
    };
    use mrd_mint_policy::Address;

    fn packet(sequence: u64) -> Packet {
        Packet {
            source_channel: "channel-0".to_string(),
            destination_channel: "channel-7".to_string(),
            sequence,
        }
    }

    fn recv(sequence: u64) -> Message {
        Message::RecvPacket {
            signer: Address::from("relayer"),
            packet: packet(sequence),
        }
    }

    fn ack(sequence: u64) -> Message {
        Message::Acknowledgement {
            signer: Address::from("relayer"),
            packet: packet(sequence),
        }
    }

    fn run(store: &mut MemLedger, mode: ExecMode, msgs: Vec<Message>) -> Result<(), AdmissionError> {
        let chain = AdmissionChain::from_gatekeepers(vec![Box::new(RedundantRelay)]);
        let mut ctx = ctx(store, mode, 3);
        chain.evaluate(&mut ctx, &tx_of(msgs), false)
    }

    #[test]
    fn test_all_redundant_rejected() {
        let mut store = MemLedger::default();
        store.set_packet_receipt("channel-7", 1);
        store.set_packet_receipt("channel-7", 2);

        assert_eq!(
            run(&mut store, ExecMode::Check, vec![recv(1), recv(2)]),
            Err(AdmissionError::RedundantRelay)
        );
        assert_eq!(
            run(&mut store, ExecMode::ReCheck, vec![recv(1)]),
            Err(AdmissionError::RedundantRelay)
        );
        // Acknowledging a packet with no commitment is redundant too.
        assert_eq!(
            run(&mut store, ExecMode::Check, vec![ack(5)]),
            Err(AdmissionError::RedundantRelay)
        );
    }

    #[test]
    fn test_partially_redundant_passes() {
        let mut store = MemLedger::default();
        store.set_packet_receipt("channel-7", 1);
        store.set_packet_commitment("channel-0", 9);

        assert!(run(&mut store, ExecMode::Check, vec![recv(1), recv(2)]).is_ok());
        assert!(run(&mut store, ExecMode::Check, vec![recv(1), ack(9)]).is_ok());
    }

    #[test]
    fn test_only_in_check_mode() {
        let mut store = MemLedger::default();
        store.set_packet_receipt("channel-7", 1);
        assert!(run(&mut store, ExecMode::Deliver, vec![recv(1)]).is_ok());
        assert!(run(&mut store, ExecMode::Simulate, vec![recv(1)]).is_ok());
    }

    #[test]
    fn test_non_packet_messages_ignored() {
        let mut store = MemLedger::default();
        assert!(run(&mut store, ExecMode::Check, vec![send("alice", "bob", 1)]).is_ok());
    }
}
