// Copyright (c) 2024 Botho Foundation

//! Block executor.
//!
//! The node owns ledger state and drives the two entry points into it: the
//! monetary policy engine at the start of every block, and the admission
//! chain plus message router for every transaction.
//!
//! - `check_tx`, `recheck_tx` and `simulate_tx` run against a snapshot that
//!   is thrown away afterwards.
//! - `deliver_tx` runs the admission chain on a branch and commits it once
//!   the chain passes, so fees and sequences stick even if a message later
//!   fails. Messages run on a second branch, committed only on success.
//! - `begin_block` runs the engine on a branch. A policy error is fatal: the
//!   node halts and refuses all further work.

use mrd_mint_policy::{Address, DecCoin};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::{
    admission::{
        AccountKeeper, AdmissionChain, AdmissionError, ConfigurationError, Ed25519Verifier,
        MinGasPriceChecker, PrivilegedAdmin, StaticAdmins,
    },
    config::NodeConfig,
    context::{BlockHeader, Context, Event, ExecMode},
    ledger::{LedgerError, MemLedger},
    metrics::NodeMetrics,
    monetary::{InflationFn, MintOutcome, MonetaryPolicyEngine, PolicyError},
    router::{MessageRouter, RouterError},
    types::Tx,
};

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("node halted: {0}")]
    Halted(String),

    #[error(transparent)]
    Admission(#[from] AdmissionError),

    #[error(transparent)]
    Policy(#[from] PolicyError),

    #[error(transparent)]
    Router(#[from] RouterError),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockOutcome {
    pub mint: MintOutcome,
    pub events: Vec<Event>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxOutcome {
    pub gas_wanted: u64,
    pub gas_used: u64,
    pub priority: u64,
    pub events: Vec<Event>,
}

pub struct Node {
    chain_id: String,
    height: u64,
    state: MemLedger,
    chain: AdmissionChain,
    engine: Arc<MonetaryPolicyEngine>,
    router: MessageRouter,
    min_gas_prices: Vec<DecCoin>,
    block_max_gas: Option<u64>,
    metrics: Arc<NodeMetrics>,
    /// Why the node stopped, once it has.
    halted: Option<String>,
}

impl Node {
    pub fn new(
        chain_id: impl Into<String>,
        state: MemLedger,
        chain: AdmissionChain,
        engine: Arc<MonetaryPolicyEngine>,
        router: MessageRouter,
    ) -> Self {
        Self {
            chain_id: chain_id.into(),
            height: 0,
            state,
            chain,
            engine,
            router,
            min_gas_prices: Vec::new(),
            block_max_gas: None,
            metrics: Arc::new(NodeMetrics::new()),
            halted: None,
        }
    }

    /// Build a node and its genesis state from config.
    pub fn from_config(config: &NodeConfig) -> Result<Self, NodeError> {
        Self::build(config, None)
    }

    /// Like [`Node::from_config`], with a custom inflation function.
    pub fn from_config_with(config: &NodeConfig, inflation_fn: InflationFn) -> Result<Self, NodeError> {
        Self::build(config, Some(inflation_fn))
    }

    fn build(config: &NodeConfig, inflation_fn: Option<InflationFn>) -> Result<Self, NodeError> {
        let metrics = Arc::new(NodeMetrics::new());
        let state = config.genesis.build_state(&config.modules)?;

        let admins: Arc<dyn PrivilegedAdmin> =
            Arc::new(StaticAdmins::new(config.privileged_admins.iter().cloned()));
        let keeper = AccountKeeper::new(config.admission.auth.clone())
            .with_fee_collector(config.modules.fee_collector.clone());
        let chain = AdmissionChain::builder()
            .config(config.admission.clone())
            .account_keeper(keeper)
            .fee_checker(Arc::new(MinGasPriceChecker))
            .sig_verifier(Arc::new(Ed25519Verifier))
            .privileged_admin(admins.clone())
            .build()?;

        let mut engine = MonetaryPolicyEngine::new(config.modules.mint_holding.clone())
            .with_metrics(metrics.clone());
        if let Some(inflation_fn) = inflation_fn {
            engine = engine.with_inflation_fn(inflation_fn);
        }
        let engine = Arc::new(engine);
        let router = MessageRouter::new(
            config.authority.clone(),
            admins,
            engine.clone(),
            config.admission.max_nesting_depth,
        );

        info!(
            chain_id = %config.chain_id,
            admins = config.privileged_admins.len(),
            blocked_kinds = config.admission.blocked_message_kinds.len(),
            "node initialized"
        );

        Ok(Self::new(config.chain_id.clone(), state, chain, engine, router)
            .with_metrics(metrics)
            .with_min_gas_prices(config.min_gas_prices.clone())
            .with_block_max_gas(config.block_max_gas))
    }

    pub fn with_metrics(mut self, metrics: Arc<NodeMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_min_gas_prices(mut self, prices: Vec<DecCoin>) -> Self {
        self.min_gas_prices = prices;
        self
    }

    pub fn with_block_max_gas(mut self, max_gas: Option<u64>) -> Self {
        self.block_max_gas = max_gas;
        self
    }

    pub fn chain_id(&self) -> &str {
        &self.chain_id
    }

    /// Height of the current block.
    pub fn height(&self) -> u64 {
        self.height
    }

    /// Committed ledger state.
    pub fn state(&self) -> &MemLedger {
        &self.state
    }

    pub fn metrics(&self) -> &Arc<NodeMetrics> {
        &self.metrics
    }

    pub fn holding_account(&self) -> &Address {
        self.engine.holding_account()
    }

    pub fn is_halted(&self) -> bool {
        self.halted.is_some()
    }

    fn ensure_running(&self) -> Result<(), NodeError> {
        match &self.halted {
            Some(reason) => Err(NodeError::Halted(reason.clone())),
            None => Ok(()),
        }
    }

    fn context<'s>(&self, store: &'s mut MemLedger, height: u64, mode: ExecMode) -> Context<'s> {
        let header = BlockHeader {
            chain_id: self.chain_id.clone(),
            height,
        };
        Context::new(header, mode, store)
            .with_min_gas_prices(self.min_gas_prices.clone())
            .with_block_max_gas(self.block_max_gas)
    }

    /// Start block `height` by running the monetary policy engine.
    pub fn begin_block(&mut self, height: u64) -> Result<BlockOutcome, NodeError> {
        self.ensure_running()?;

        let mut branch = self.state.clone();
        let mut ctx = self.context(&mut branch, height, ExecMode::Deliver);
        let mint = match self.engine.begin_block(&mut ctx) {
            Ok(mint) => mint,
            Err(err) => {
                error!(height, error = %err, "monetary policy failed, halting");
                self.halted = Some(format!("monetary policy failed at height {height}: {err}"));
                return Err(err.into());
            }
        };
        let events = std::mem::take(&mut ctx.events);
        drop(ctx);

        self.state = branch;
        self.height = height;
        self.metrics.block_height.set(height as i64);
        Ok(BlockOutcome { mint, events })
    }

    /// Admission for the mempool.
    pub fn check_tx(&self, tx: &Tx) -> Result<TxOutcome, NodeError> {
        self.run_snapshot(tx, ExecMode::Check, false)
    }

    /// Re-admission of a mempool transaction after a commit.
    pub fn recheck_tx(&self, tx: &Tx) -> Result<TxOutcome, NodeError> {
        self.run_snapshot(tx, ExecMode::ReCheck, false)
    }

    /// Gas estimation. Signatures are not verified.
    pub fn simulate_tx(&self, tx: &Tx) -> Result<TxOutcome, NodeError> {
        self.run_snapshot(tx, ExecMode::Simulate, true)
    }

    fn run_snapshot(&self, tx: &Tx, mode: ExecMode, simulate: bool) -> Result<TxOutcome, NodeError> {
        self.ensure_running()?;

        let mut snapshot = self.state.clone();
        let mut ctx = self.context(&mut snapshot, self.height, mode);
        self.admit(&mut ctx, tx, simulate)?;

        Ok(TxOutcome {
            gas_wanted: tx.auth_info.fee.gas_limit,
            gas_used: ctx.gas_meter.consumed(),
            priority: ctx.priority,
            events: ctx.events,
        })
    }

    fn admit(&self, ctx: &mut Context<'_>, tx: &Tx, simulate: bool) -> Result<(), AdmissionError> {
        match self.chain.evaluate(ctx, tx, simulate) {
            Ok(()) => {
                self.metrics.record_admitted(ctx.mode.as_str());
                Ok(())
            }
            Err(err) => {
                self.metrics
                    .record_rejected(ctx.rejected_by.unwrap_or("unknown"));
                Err(err)
            }
        }
    }

    /// Execute `tx` in the current block.
    pub fn deliver_tx(&mut self, tx: &Tx) -> Result<TxOutcome, NodeError> {
        self.ensure_running()?;

        let mut ante = self.state.clone();
        let mut ctx = self.context(&mut ante, self.height, ExecMode::Deliver);
        self.admit(&mut ctx, tx, false)?;
        let gas_used = ctx.gas_meter.consumed();
        let priority = ctx.priority;
        let mut events = std::mem::take(&mut ctx.events);
        drop(ctx);
        self.state = ante;

        let mut branch = self.state.clone();
        let mut ctx = self.context(&mut branch, self.height, ExecMode::Deliver);
        if let Err(err) = self.router.dispatch(&mut ctx, &tx.body.messages) {
            warn!(height = self.height, error = %err, "message execution failed");
            return Err(err.into());
        }
        events.append(&mut ctx.events);
        drop(ctx);
        self.state = branch;

        Ok(TxOutcome {
            gas_wanted: tx.auth_info.fee.gas_limit,
            gas_used,
            priority,
            events,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{BalanceLedger, ParameterStore};
    use assert_matches::assert_matches;

    // `assert_matches!` formats the `Result<Node, _>` on mismatch.
    impl std::fmt::Debug for Node {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("Node")
                .field("chain_id", &self.chain_id)
                .field("height", &self.height)
                .finish_non_exhaustive()
        }
    }

    fn config() -> NodeConfig {
        let mut config = NodeConfig::new("meridian-test", Address::from("gov"));
        config.genesis.balances = vec![crate::config::GenesisBalance {
            address: Address::from("treasury"),
            denom: "umrd".to_string(),
            amount: 1_000_000_000,
        }];
        config
    }

    #[test]
    fn test_begin_block_commits_mint() {
        let mut node = Node::from_config(&config()).unwrap();
        let outcome = node.begin_block(1).unwrap();

        assert_eq!(node.height(), 1);
        assert!(!outcome.mint.minted.is_zero());
        assert_eq!(outcome.events[0].kind, "mint");
        assert_eq!(
            node.state().get_balance(node.holding_account(), "umrd"),
            outcome.mint.minted.amount
        );
        assert_eq!(
            node.state().get_minter_state().unwrap().inflation,
            outcome.mint.inflation
        );
        assert_eq!(node.metrics().block_height.get(), 1);
    }

    #[test]
    fn test_policy_failure_halts() {
        let config = config();
        let state = MemLedger::new(config.modules.fee_collector.clone());
        let admins: Arc<dyn PrivilegedAdmin> = Arc::new(StaticAdmins::default());
        let chain = AdmissionChain::builder()
            .account_keeper(AccountKeeper::new(Default::default()))
            .fee_checker(Arc::new(MinGasPriceChecker))
            .sig_verifier(Arc::new(Ed25519Verifier))
            .privileged_admin(admins.clone())
            .build()
            .unwrap();
        let engine = Arc::new(MonetaryPolicyEngine::new(Address::from("mint")));
        let router = MessageRouter::new(Address::from("gov"), admins, engine.clone(), 8);
        let mut node = Node::new("meridian-test", state, chain, engine, router);

        assert_matches!(node.begin_block(1), Err(NodeError::Policy(_)));
        assert!(node.is_halted());
        assert_matches!(node.begin_block(2), Err(NodeError::Halted(_)));
        assert_matches!(
            node.check_tx(&Tx::new(vec![], Default::default())),
            Err(NodeError::Halted(_))
        );
    }

    #[test]
    fn test_invalid_genesis_is_a_configuration_error() {
        let mut config = config();
        config.genesis.mint_params.blocks_per_year = 0;
        assert_matches!(
            Node::from_config(&config),
            Err(NodeError::Configuration(ConfigurationError::Invalid(_)))
        );
    }

    #[test]
    fn test_rejection_is_counted() {
        let mut node = Node::from_config(&config()).unwrap();
        node.begin_block(1).unwrap();

        let empty = Tx::new(vec![], Default::default());
        assert_matches!(node.check_tx(&empty), Err(NodeError::Admission(_)));
        let output = node.metrics().encode().unwrap();
        assert!(output.contains("gatekeeper=\"validate_basic\""));
    }
}
