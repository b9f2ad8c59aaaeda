// Copyright (c) 2024 Botho Foundation

use mrd_mint_policy::{Address, Dec};
use thiserror::Error;

use crate::{ledger::LedgerError, types::MessageError};

/// Construction-time failures. Fatal at startup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("admission chain requires a {0}")]
    MissingCollaborator(&'static str),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Why a transaction was rejected.
///
/// The message is surfaced to the submitter; [`AdmissionError::code`] is
/// stable across releases.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdmissionError {
    #[error("tx parse error: {0}")]
    TxDecode(String),

    #[error("account sequence mismatch, expected {expected}, got {got}: incorrect account sequence")]
    WrongSequence { expected: u64, got: u64 },

    #[error("{0}: unauthorized")]
    Unauthorized(String),

    #[error("{0}: insufficient funds")]
    InsufficientFunds(String),

    #[error("{0}: invalid pubkey")]
    InvalidPubKey(String),

    #[error("account {0} does not exist: unknown address")]
    UnknownAddress(Address),

    #[error("{0}: invalid coins")]
    InvalidCoins(String),

    #[error("out of gas in location: {location}; gasWanted: {gas_wanted}, gasUsed: {gas_used}: out of gas")]
    OutOfGas {
        location: String,
        gas_wanted: u64,
        gas_used: u64,
    },

    #[error("maximum number of characters is {max} but received {got} characters: memo too large")]
    MemoTooLarge { max: usize, got: usize },

    #[error("{0}: insufficient fee")]
    InsufficientFee(String),

    #[error("signatures: {got}, limit: {max}: too many signatures")]
    TooManySignatures { max: u64, got: u64 },

    #[error("no signatures supplied")]
    NoSignatures,

    #[error("{0}: invalid request")]
    InvalidRequest(String),

    #[error("{0}: invalid gas limit")]
    InvalidGasLimit(String),

    #[error("block height: {height}, timeout height: {timeout}: tx timeout height")]
    TxTimeoutHeight { timeout: u64, height: u64 },

    #[error("unknown extension options")]
    UnknownExtensionOptions,

    #[error("tx type not allowed")]
    TxTypeNotAllowed,

    #[error("{kind} is not allowed: staking is disabled on this chain")]
    StakingDisabled { kind: String },

    #[error("commission rate {rate} is below the minimum of {min}")]
    CommissionTooLow { rate: Dec, min: Dec },

    #[error("manual minting is disabled while inflation is active (inflation: {inflation})")]
    ManualMintDisabled { inflation: Dec },

    #[error("tx contains unsupported message types at height {height}")]
    UnsupportedMessages { height: u64 },

    #[error("tx message nesting exceeds depth {max_depth} at height {height}")]
    NestingTooDeep { max_depth: usize, height: u64 },

    #[error("packet messages are redundant")]
    RedundantRelay,

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl AdmissionError {
    pub fn code(&self) -> u32 {
        match self {
            Self::TxDecode(_) => 2,
            Self::WrongSequence { .. } => 3,
            Self::Unauthorized(_) => 4,
            Self::InsufficientFunds(_) => 5,
            Self::InvalidPubKey(_) => 8,
            Self::UnknownAddress(_) => 9,
            Self::InvalidCoins(_) => 10,
            Self::OutOfGas { .. } => 11,
            Self::MemoTooLarge { .. } => 12,
            Self::InsufficientFee(_) => 13,
            Self::TooManySignatures { .. } => 14,
            Self::NoSignatures => 15,
            Self::InvalidRequest(_) => 18,
            Self::InvalidGasLimit(_) => 25,
            Self::TxTimeoutHeight { .. } => 30,
            Self::UnknownExtensionOptions => 31,
            Self::TxTypeNotAllowed => 40,
            Self::StakingDisabled { .. } => 41,
            Self::CommissionTooLow { .. } => 42,
            Self::ManualMintDisabled { .. } => 43,
            Self::UnsupportedMessages { .. } => 44,
            Self::NestingTooDeep { .. } => 45,
            Self::RedundantRelay => 46,
            Self::Ledger(_) => 50,
        }
    }
}

impl From<MessageError> for AdmissionError {
    fn from(err: MessageError) -> Self {
        match err {
            MessageError::Invalid(msg) => Self::InvalidRequest(msg),
            other => Self::TxDecode(other.to_string()),
        }
    }
}
