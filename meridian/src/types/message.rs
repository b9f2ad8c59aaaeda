// Copyright (c) 2024 Botho Foundation

//! Ledger messages and their encoded envelope.

use mrd_mint_policy::{validate_coins, Address, Coin, Dec, StakeholderParams};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

pub const MSG_SEND: &str = "/meridian.bank.v1.MsgSend";
pub const MSG_MULTI_SEND: &str = "/meridian.bank.v1.MsgMultiSend";
pub const MSG_MINT: &str = "/meridian.issuance.v1.MsgMint";
pub const MSG_EXEC: &str = "/meridian.authz.v1.MsgExec";
pub const MSG_DELEGATE: &str = "/meridian.staking.v1.MsgDelegate";
pub const MSG_UNDELEGATE: &str = "/meridian.staking.v1.MsgUndelegate";
pub const MSG_CREATE_VALIDATOR: &str = "/meridian.staking.v1.MsgCreateValidator";
pub const MSG_EDIT_VALIDATOR: &str = "/meridian.staking.v1.MsgEditValidator";
pub const MSG_UPDATE_STAKEHOLDERS: &str = "/meridian.mint.v1.MsgUpdateStakeholders";
pub const MSG_BURN_HOLDING_REMAINDER: &str = "/meridian.mint.v1.MsgBurnHoldingRemainder";
pub const MSG_RECV_PACKET: &str = "/meridian.relay.v1.MsgRecvPacket";
pub const MSG_ACKNOWLEDGEMENT: &str = "/meridian.relay.v1.MsgAcknowledgement";
pub const MSG_TIMEOUT: &str = "/meridian.relay.v1.MsgTimeout";
pub const MSG_UPDATE_CLIENT: &str = "/meridian.relay.v1.MsgUpdateClient";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessageError {
    #[error("failed to decode {kind}: {reason}")]
    Decode { kind: String, reason: String },

    #[error("failed to encode message: {0}")]
    Encode(String),

    #[error("message kind mismatch: envelope says {expected}, payload is {found}")]
    KindMismatch { expected: String, found: String },

    #[error("{0}")]
    Invalid(String),
}

/// A message in its encoded form, as carried by a transaction.
///
/// `kind` is the canonical message-kind identifier and is what the circuit
/// breaker and the message filter compare against. `value` is the bincode
/// encoding of the [`Message`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnyMessage {
    pub kind: String,
    pub value: Vec<u8>,
}

impl AnyMessage {
    pub fn pack(msg: &Message) -> Result<Self, MessageError> {
        let value = bincode::serialize(msg).map_err(|e| MessageError::Encode(e.to_string()))?;
        Ok(Self {
            kind: msg.kind().to_string(),
            value,
        })
    }

    /// An envelope with an arbitrary payload. Used for extension options and
    /// by clients that relay foreign messages.
    pub fn raw(kind: impl Into<String>, value: Vec<u8>) -> Self {
        Self {
            kind: kind.into(),
            value,
        }
    }

    pub fn unpack(&self) -> Result<Message, MessageError> {
        let msg: Message =
            bincode::deserialize(&self.value).map_err(|e| MessageError::Decode {
                kind: self.kind.clone(),
                reason: e.to_string(),
            })?;
        if msg.kind() != self.kind {
            return Err(MessageError::KindMismatch {
                expected: self.kind.clone(),
                found: msg.kind().to_string(),
            });
        }
        Ok(msg)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Input {
    pub address: Address,
    pub coins: Vec<Coin>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Output {
    pub address: Address,
    pub coins: Vec<Coin>,
}

/// Identifies a relayed packet on both ends of a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Packet {
    pub source_channel: String,
    pub destination_channel: String,
    pub sequence: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Message {
    Send {
        from: Address,
        to: Address,
        amount: Vec<Coin>,
    },
    MultiSend {
        inputs: Vec<Input>,
        outputs: Vec<Output>,
    },
    /// Privileged issuance into the sender's account.
    Mint {
        sender: Address,
        amount: Coin,
    },
    /// Execute `msgs` on behalf of their signers.
    Exec {
        grantee: Address,
        msgs: Vec<AnyMessage>,
    },
    Delegate {
        delegator: Address,
        validator: Address,
        amount: Coin,
    },
    Undelegate {
        delegator: Address,
        validator: Address,
        amount: Coin,
    },
    CreateValidator {
        operator: Address,
        commission_rate: Dec,
    },
    EditValidator {
        operator: Address,
        commission_rate: Option<Dec>,
    },
    UpdateStakeholders {
        authority: Address,
        params: StakeholderParams,
    },
    BurnHoldingRemainder {
        authority: Address,
        amount: Coin,
    },
    RecvPacket {
        signer: Address,
        packet: Packet,
    },
    Acknowledgement {
        signer: Address,
        packet: Packet,
    },
    Timeout {
        signer: Address,
        packet: Packet,
    },
    UpdateClient {
        signer: Address,
        client_id: String,
    },
    /// Any other message, known only by kind and signer.
    Generic {
        kind: String,
        signer: Address,
    },
}

impl Message {
    pub fn kind(&self) -> &str {
        match self {
            Self::Send { .. } => MSG_SEND,
            Self::MultiSend { .. } => MSG_MULTI_SEND,
            Self::Mint { .. } => MSG_MINT,
            Self::Exec { .. } => MSG_EXEC,
            Self::Delegate { .. } => MSG_DELEGATE,
            Self::Undelegate { .. } => MSG_UNDELEGATE,
            Self::CreateValidator { .. } => MSG_CREATE_VALIDATOR,
            Self::EditValidator { .. } => MSG_EDIT_VALIDATOR,
            Self::UpdateStakeholders { .. } => MSG_UPDATE_STAKEHOLDERS,
            Self::BurnHoldingRemainder { .. } => MSG_BURN_HOLDING_REMAINDER,
            Self::RecvPacket { .. } => MSG_RECV_PACKET,
            Self::Acknowledgement { .. } => MSG_ACKNOWLEDGEMENT,
            Self::Timeout { .. } => MSG_TIMEOUT,
            Self::UpdateClient { .. } => MSG_UPDATE_CLIENT,
            Self::Generic { kind, .. } => kind,
        }
    }

    /// The address that must sign for this message.
    pub fn signer(&self) -> Option<&Address> {
        match self {
            Self::Send { from, .. } => Some(from),
            Self::MultiSend { inputs, .. } => inputs.first().map(|i| &i.address),
            Self::Mint { sender, .. } => Some(sender),
            Self::Exec { grantee, .. } => Some(grantee),
            Self::Delegate { delegator, .. } | Self::Undelegate { delegator, .. } => Some(delegator),
            Self::CreateValidator { operator, .. } | Self::EditValidator { operator, .. } => {
                Some(operator)
            }
            Self::UpdateStakeholders { authority, .. }
            | Self::BurnHoldingRemainder { authority, .. } => Some(authority),
            Self::RecvPacket { signer, .. }
            | Self::Acknowledgement { signer, .. }
            | Self::Timeout { signer, .. }
            | Self::UpdateClient { signer, .. }
            | Self::Generic { signer, .. } => Some(signer),
        }
    }

    /// Delegation moves stake. Validator create and edit do not count.
    pub fn is_delegation(&self) -> bool {
        matches!(self, Self::Delegate { .. } | Self::Undelegate { .. })
    }

    /// Stateless checks.
    pub fn validate_basic(&self) -> Result<(), MessageError> {
        if let Some(signer) = self.signer() {
            require_address(signer, "signer")?;
        }

        match self {
            Self::Send { to, amount, .. } => {
                require_address(to, "recipient")?;
                require_coins(amount)
            }
            Self::MultiSend { inputs, outputs } => validate_multi_send(inputs, outputs),
            Self::Mint { amount, .. }
            | Self::BurnHoldingRemainder { amount, .. }
            | Self::Delegate { amount, .. }
            | Self::Undelegate { amount, .. } => {
                if let Self::Delegate { validator, .. } | Self::Undelegate { validator, .. } = self {
                    require_address(validator, "validator")?;
                }
                require_coins(std::slice::from_ref(amount))
            }
            // Wrapped messages are validated where they are unpacked.
            Self::Exec { msgs, .. } => {
                if msgs.is_empty() {
                    return Err(invalid("exec must contain at least one message"));
                }
                Ok(())
            }
            Self::CreateValidator {
                commission_rate, ..
            } => require_rate(*commission_rate),
            Self::EditValidator {
                commission_rate, ..
            } => commission_rate.map_or(Ok(()), require_rate),
            Self::UpdateStakeholders { params, .. } => {
                params.validate().map_err(|e| invalid(e.to_string()))
            }
            Self::RecvPacket { packet, .. }
            | Self::Acknowledgement { packet, .. }
            | Self::Timeout { packet, .. } => {
                if packet.source_channel.is_empty() || packet.destination_channel.is_empty() {
                    return Err(invalid("packet channels must not be empty"));
                }
                if packet.sequence == 0 {
                    return Err(invalid("packet sequence must be positive"));
                }
                Ok(())
            }
            Self::UpdateClient { client_id, .. } => {
                if client_id.is_empty() {
                    return Err(invalid("client id must not be empty"));
                }
                Ok(())
            }
            Self::Generic { kind, .. } => {
                if kind.is_empty() {
                    return Err(invalid("message kind must not be empty"));
                }
                Ok(())
            }
        }
    }
}

fn invalid(msg: impl Into<String>) -> MessageError {
    MessageError::Invalid(msg.into())
}

fn require_address(address: &Address, role: &str) -> Result<(), MessageError> {
    if address.is_valid() {
        Ok(())
    } else {
        Err(invalid(format!("invalid {role} address {address:?}")))
    }
}

fn require_coins(coins: &[Coin]) -> Result<(), MessageError> {
    if coins.is_empty() {
        return Err(invalid("amount must not be empty"));
    }
    validate_coins(coins).map_err(|e| invalid(e.to_string()))
}

fn require_rate(rate: Dec) -> Result<(), MessageError> {
    if rate > Dec::ONE {
        return Err(invalid(format!("commission rate {rate} exceeds 1")));
    }
    Ok(())
}

fn validate_multi_send(inputs: &[Input], outputs: &[Output]) -> Result<(), MessageError> {
    // Only a single input is supported, so the input address is the signer.
    if inputs.len() != 1 {
        return Err(invalid("multi-send requires exactly one input"));
    }
    if outputs.is_empty() {
        return Err(invalid("multi-send requires at least one output"));
    }

    let mut totals: BTreeMap<&str, i128> = BTreeMap::new();
    for input in inputs {
        require_coins(&input.coins)?;
        for coin in &input.coins {
            *totals.entry(coin.denom.as_str()).or_default() += i128::try_from(coin.amount)
                .map_err(|_| invalid("multi-send amount overflow"))?;
        }
    }
    for output in outputs {
        require_address(&output.address, "output")?;
        require_coins(&output.coins)?;
        for coin in &output.coins {
            *totals.entry(coin.denom.as_str()).or_default() -= i128::try_from(coin.amount)
                .map_err(|_| invalid("multi-send amount overflow"))?;
        }
    }

    if totals.values().any(|v| *v != 0) {
        return Err(invalid("sum of inputs does not match sum of outputs"));
    }
    Ok(())
}
