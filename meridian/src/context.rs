// Copyright (c) 2024 Botho Foundation

//! Execution context shared by gatekeepers, the policy engine and the router.

use mrd_mint_policy::DecCoin;

use crate::{admission::AdmissionError, ledger::LedgerStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecMode {
    /// First admission into the mempool.
    Check,
    /// Re-admission of a mempool transaction after a block commits.
    ReCheck,
    /// Gas estimation; signatures are not verified.
    Simulate,
    /// Execution inside a block.
    Deliver,
}

impl ExecMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Check => "check",
            Self::ReCheck => "recheck",
            Self::Simulate => "simulate",
            Self::Deliver => "deliver",
        }
    }

    pub fn is_check(&self) -> bool {
        matches!(self, Self::Check | Self::ReCheck)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockHeader {
    pub chain_id: String,
    pub height: u64,
}

/// Tracks gas consumed against an optional limit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GasMeter {
    limit: Option<u64>,
    consumed: u64,
}

impl GasMeter {
    pub fn new(limit: u64) -> Self {
        Self {
            limit: Some(limit),
            consumed: 0,
        }
    }

    pub fn infinite() -> Self {
        Self::default()
    }

    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    pub fn consumed(&self) -> u64 {
        self.consumed
    }

    pub fn consume(&mut self, amount: u64, location: &str) -> Result<(), AdmissionError> {
        self.consumed = self.consumed.saturating_add(amount);
        match self.limit {
            Some(limit) if self.consumed > limit => Err(AdmissionError::OutOfGas {
                location: location.to_string(),
                gas_wanted: limit,
                gas_used: self.consumed,
            }),
            _ => Ok(()),
        }
    }
}

/// A typed event with string attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub kind: String,
    pub attributes: Vec<(String, String)>,
}

impl Event {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            attributes: Vec::new(),
        }
    }

    pub fn attr(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.attributes.push((key.into(), value.to_string()));
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

pub struct Context<'a> {
    pub header: BlockHeader,
    pub mode: ExecMode,
    pub store: &'a mut dyn LedgerStore,
    pub gas_meter: GasMeter,
    /// Local minimum gas prices, enforced in check mode only.
    pub min_gas_prices: Vec<DecCoin>,
    pub block_max_gas: Option<u64>,
    pub priority: u64,
    pub events: Vec<Event>,
    /// Name of the gatekeeper that rejected the transaction, if any.
    pub rejected_by: Option<&'static str>,
}

impl<'a> Context<'a> {
    pub fn new(header: BlockHeader, mode: ExecMode, store: &'a mut dyn LedgerStore) -> Self {
        Self {
            header,
            mode,
            store,
            gas_meter: GasMeter::infinite(),
            min_gas_prices: Vec::new(),
            block_max_gas: None,
            priority: 0,
            events: Vec::new(),
            rejected_by: None,
        }
    }

    pub fn with_min_gas_prices(mut self, prices: Vec<DecCoin>) -> Self {
        self.min_gas_prices = prices;
        self
    }

    pub fn with_block_max_gas(mut self, max_gas: Option<u64>) -> Self {
        self.block_max_gas = max_gas;
        self
    }

    pub fn height(&self) -> u64 {
        self.header.height
    }

    pub fn chain_id(&self) -> &str {
        &self.header.chain_id
    }

    pub fn consume_gas(&mut self, amount: u64, location: &str) -> Result<(), AdmissionError> {
        self.gas_meter.consume(amount, location)
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }
}
