// Copyright (c) 2024 Botho Foundation

//! Transactions, fees and sign bytes.

use mrd_mint_policy::{Address, Coin};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::message::{AnyMessage, Message, MessageError};

/// Upper bound on a transaction's gas limit.
pub const MAX_GAS_WANTED: u64 = u64::MAX / 2;

/// An ed25519 public key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PubKey(pub [u8; 32]);

impl PubKey {
    /// `hex(sha256(key)[..20])`
    pub fn address(&self) -> Address {
        let digest = Sha256::digest(self.0);
        Address::new(hex::encode(&digest[..20]))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tx {
    pub body: TxBody,
    pub auth_info: AuthInfo,
    /// One signature per signer, in signer order.
    pub signatures: Vec<Vec<u8>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxBody {
    pub messages: Vec<AnyMessage>,
    pub memo: String,
    /// Last block height at which the transaction may be included. Zero means
    /// no timeout.
    pub timeout_height: u64,
    pub extension_options: Vec<AnyMessage>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthInfo {
    pub signer_infos: Vec<SignerInfo>,
    pub fee: Fee,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignerInfo {
    /// Omitted once the key is recorded on the account.
    pub public_key: Option<PubKey>,
    pub sequence: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fee {
    pub amount: Vec<Coin>,
    pub gas_limit: u64,
    pub payer: Option<Address>,
    pub granter: Option<Address>,
}

/// The document each signer signs.
#[derive(Serialize)]
struct SignDoc<'a> {
    body: &'a TxBody,
    auth_info: &'a AuthInfo,
    chain_id: &'a str,
    account_number: u64,
}

impl Tx {
    pub fn new(messages: Vec<AnyMessage>, fee: Fee) -> Self {
        Self {
            body: TxBody {
                messages,
                ..Default::default()
            },
            auth_info: AuthInfo {
                signer_infos: Vec::new(),
                fee,
            },
            signatures: Vec::new(),
        }
    }

    /// Decode all top-level messages.
    pub fn messages(&self) -> Result<Vec<Message>, MessageError> {
        self.body.messages.iter().map(AnyMessage::unpack).collect()
    }

    /// Signers of the top-level messages, in first-seen order.
    pub fn signers(&self) -> Result<Vec<Address>, MessageError> {
        let mut signers: Vec<Address> = Vec::new();
        for msg in self.messages()? {
            let signer = msg
                .signer()
                .ok_or_else(|| MessageError::Invalid(format!("{} has no signer", msg.kind())))?;
            if !signers.contains(signer) {
                signers.push(signer.clone());
            }
        }
        Ok(signers)
    }

    /// The explicit fee payer, or the first signer.
    pub fn fee_payer(&self) -> Result<Address, MessageError> {
        if let Some(payer) = &self.auth_info.fee.payer {
            return Ok(payer.clone());
        }
        self.signers()?
            .into_iter()
            .next()
            .ok_or_else(|| MessageError::Invalid("transaction has no signers".to_string()))
    }

    pub fn encoded_len(&self) -> Result<u64, MessageError> {
        bincode::serialized_size(self).map_err(|e| MessageError::Encode(e.to_string()))
    }

    pub fn sign_bytes(&self, chain_id: &str, account_number: u64) -> Result<Vec<u8>, MessageError> {
        let doc = SignDoc {
            body: &self.body,
            auth_info: &self.auth_info,
            chain_id,
            account_number,
        };
        bincode::serialize(&doc).map_err(|e| MessageError::Encode(e.to_string()))
    }
}
