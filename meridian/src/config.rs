// Copyright (c) 2024 Botho Foundation

//! Node configuration file.

use anyhow::{Context, Result};
use mrd_mint_policy::{
    Address, Coin, Dec, DecCoin, MintParams, MinterState, StakeholderParams, DEC_SCALE,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::{
    admission::{AdmissionConfig, ConfigurationError, FEE_COLLECTOR},
    ledger::{AccountStore, BalanceLedger, MemLedger, ParameterStore},
    telemetry::TelemetryConfig,
};

/// Main configuration for a Meridian node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeConfig {
    pub chain_id: String,

    /// Governance account allowed to update stakeholders and burn holding
    /// remainders
    pub authority: Address,

    /// Addresses allowed to mint manually
    #[serde(default)]
    pub privileged_admins: Vec<Address>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_max_gas: Option<u64>,

    /// Local minimum gas prices, enforced when admitting to the mempool
    #[serde(default)]
    pub min_gas_prices: Vec<DecCoin>,

    #[serde(default)]
    pub modules: ModuleAccounts,

    #[serde(default)]
    pub admission: AdmissionConfig,

    #[serde(default)]
    pub genesis: GenesisConfig,

    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Names of the module accounts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleAccounts {
    #[serde(default = "default_fee_collector")]
    pub fee_collector: Address,

    /// Receives each block's provision before stakeholder payouts
    #[serde(default = "default_mint_holding")]
    pub mint_holding: Address,
}

fn default_fee_collector() -> Address {
    Address::from(FEE_COLLECTOR)
}

fn default_mint_holding() -> Address {
    Address::from("mint")
}

impl Default for ModuleAccounts {
    fn default() -> Self {
        Self {
            fee_collector: default_fee_collector(),
            mint_holding: default_mint_holding(),
        }
    }
}

/// Initial ledger state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisConfig {
    /// Accounts created without a balance
    #[serde(default)]
    pub accounts: Vec<Address>,

    /// Initial inflation rate
    #[serde(default = "default_inflation")]
    pub inflation: Dec,

    /// Message kinds disabled in the circuit breaker
    #[serde(default)]
    pub disabled_kinds: Vec<String>,

    #[serde(default)]
    pub balances: Vec<GenesisBalance>,

    #[serde(default)]
    pub mint_params: MintParams,

    #[serde(default)]
    pub stakeholders: StakeholderParams,

    #[serde(default)]
    pub grants: Vec<GenesisGrant>,
}

fn default_inflation() -> Dec {
    Dec::from_raw(13 * DEC_SCALE / 100)
}

impl Default for GenesisConfig {
    fn default() -> Self {
        Self {
            balances: Vec::new(),
            accounts: Vec::new(),
            inflation: default_inflation(),
            disabled_kinds: Vec::new(),
            mint_params: MintParams::default(),
            stakeholders: StakeholderParams::default(),
            grants: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisBalance {
    pub address: Address,
    pub denom: String,
    pub amount: u64,
}

/// `granter` lets `grantee` execute messages of `kind` on its behalf
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisGrant {
    pub granter: Address,
    pub grantee: Address,
    pub kind: String,
}

impl GenesisConfig {
    /// Build the genesis ledger state.
    pub fn build_state(&self, modules: &ModuleAccounts) -> Result<MemLedger, ConfigurationError> {
        let invalid = |what: &str, err: &dyn std::fmt::Display| {
            ConfigurationError::Invalid(format!("genesis {what}: {err}"))
        };

        let mut state = MemLedger::new(modules.fee_collector.clone());
        for address in &self.accounts {
            if state.get_account(address).is_none() {
                state.new_account(address);
            }
        }
        for balance in &self.balances {
            let coin = Coin::new(balance.denom.clone(), balance.amount as u128);
            state
                .mint_coins(&balance.address, &coin)
                .map_err(|e| invalid("balance", &e))?;
        }

        state
            .set_mint_params(self.mint_params.clone())
            .map_err(|e| invalid("mint params", &e))?;
        if self.inflation > Dec::ONE {
            return Err(invalid("inflation", &self.inflation));
        }
        state
            .set_minter_state(MinterState::initial(self.inflation))
            .map_err(|e| invalid("minter state", &e))?;
        state
            .set_stakeholder_params(self.stakeholders.clone())
            .map_err(|e| invalid("stakeholders", &e))?;

        for grant in &self.grants {
            state.grant(&grant.granter, &grant.grantee, &grant.kind);
        }
        for kind in &self.disabled_kinds {
            state.set_kind_disabled(kind, true);
        }

        Ok(state)
    }
}

impl NodeConfig {
    /// A config with defaults for everything but the chain id and authority.
    pub fn new(chain_id: impl Into<String>, authority: Address) -> Self {
        Self {
            chain_id: chain_id.into(),
            authority,
            privileged_admins: Vec::new(),
            block_max_gas: None,
            min_gas_prices: Vec::new(),
            modules: ModuleAccounts::default(),
            admission: AdmissionConfig::default(),
            genesis: GenesisConfig::default(),
            telemetry: TelemetryConfig::default(),
        }
    }

    /// Load config from a file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// Save config to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, contents)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;

        Ok(())
    }
}
