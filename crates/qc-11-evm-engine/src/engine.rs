//! # EVM Engine
//!
//! Public surface of the execution engine.
//!
//! - [`EvmEngine::run_call`]: executes a message against the current state
//! - [`EvmEngine::run_code`]: executes raw code at a fixed address
//! - [`Clone`]: an independent engine sharing the immutable revision rules
//!
//! Each top-level execution gets its own dispatcher and substate, so the
//! warm set, transient storage and self-destruct list never leak from one
//! execution into the next.
//!
//! ## Suspension
//!
//! State access is `async`; every call is awaited to completion before the
//! next instruction runs. An engine may be shared between tasks, but each
//! execution mutates state through the collaborator's own checkpoint
//! discipline and is not isolated from a concurrent one. Run parallel
//! executions on clones.

use crate::adapters::block_hashes::InMemoryBlockHashes;
use crate::config::{EngineConfig, RevisionRules};
use crate::domain::entities::{Environment, ExecutionResult, Message};
use crate::domain::value_objects::{Address, Bytes, U256};
use crate::evm::analysis::CodeCache;
use crate::evm::dispatcher::{CallDispatcher, FrameOutcome};
use crate::evm::gas;
use crate::evm::substate::Substate;
use crate::ports::inbound::ExecutionApi;
use crate::ports::outbound::{BlockHashOracle, StateCollaborator};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tracing::{info, instrument, warn};
use uuid::Uuid;

// =============================================================================
// ABORT HANDLE
// =============================================================================

/// Cancels executions from outside the engine.
///
/// Once [`abort`](Self::abort) is called, every running execution fails
/// with `OutOfGas` before its next instruction, unwinding through the
/// normal revert path. Executions started afterwards fail the same way
/// until [`reset`](Self::reset).
#[derive(Clone, Debug, Default)]
pub struct AbortHandle {
    flag: Arc<AtomicBool>,
}

impl AbortHandle {
    /// Creates a handle in the running state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn abort(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// True once cancellation was requested.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Clears a previous cancellation.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

// =============================================================================
// STATISTICS
// =============================================================================

/// Counters kept per engine instance.
#[derive(Debug, Default, Clone)]
pub struct EngineStats {
    /// Top-level executions completed.
    pub executions: u64,
    /// Executions that succeeded.
    pub successes: u64,
    /// Executions that failed, reverts included.
    pub failures: u64,
    /// Gas used by all executions, before refunds.
    pub total_gas_used: u64,
    /// Average wall time per execution in microseconds.
    pub avg_execution_time_us: u64,
}

impl EngineStats {
    fn record(&mut self, result: &ExecutionResult, elapsed_us: u64) {
        self.executions += 1;
        if result.success {
            self.successes += 1;
        } else {
            self.failures += 1;
        }
        self.total_gas_used = self.total_gas_used.saturating_add(result.gas_used);
        let total = self.executions;
        self.avg_execution_time_us =
            self.avg_execution_time_us.saturating_mul(total - 1).saturating_add(elapsed_us) / total;
    }
}

// =============================================================================
// ENGINE
// =============================================================================

/// The execution engine.
pub struct EvmEngine<S> {
    config: EngineConfig,
    rules: Arc<RevisionRules>,
    state: S,
    block_hashes: Arc<dyn BlockHashOracle>,
    code_cache: CodeCache,
    abort: AbortHandle,
    stats: RwLock<EngineStats>,
}

impl<S: StateCollaborator> EvmEngine<S> {
    /// Creates an engine over `state`.
    ///
    /// BLOCKHASH answers zero until an oracle is supplied with
    /// [`with_block_hashes`](Self::with_block_hashes).
    pub fn new(state: S, config: EngineConfig) -> Self {
        let rules = Arc::new(RevisionRules::new(Arc::clone(&config.protocol)));
        info!(
            revision = config.protocol.revision.name(),
            precompiles = rules.precompiles().len(),
            "EVM engine created"
        );
        Self {
            code_cache: CodeCache::new(config.jumpdest_cache_capacity),
            config,
            rules,
            state,
            block_hashes: Arc::new(InMemoryBlockHashes::new()),
            abort: AbortHandle::new(),
            stats: RwLock::new(EngineStats::default()),
        }
    }

    /// Replaces the block hash oracle.
    #[must_use]
    pub fn with_block_hashes(mut self, oracle: Arc<dyn BlockHashOracle>) -> Self {
        self.block_hashes = oracle;
        self
    }

    /// The state collaborator.
    #[must_use]
    pub fn state(&self) -> &S {
        &self.state
    }

    /// Engine configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Revision rules shared with clones.
    #[must_use]
    pub fn rules(&self) -> &Arc<RevisionRules> {
        &self.rules
    }

    /// Handle cancelling this engine's executions.
    #[must_use]
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    /// Snapshot of the execution counters.
    pub async fn stats(&self) -> EngineStats {
        self.stats.read().await.clone()
    }

    /// Executes `message` against the current state.
    ///
    /// Never fails: errors are encoded in the returned result.
    #[instrument(
        skip(self, message, env),
        fields(
            execution_id = %Uuid::new_v4(),
            kind = message.kind.label(),
            gas_limit = message.gas_limit,
            depth = message.depth,
        )
    )]
    pub async fn run_call(&self, message: Message, env: &Environment) -> ExecutionResult {
        let started = Instant::now();
        let gas_limit = message.gas_limit;

        let mut dispatcher = self.dispatcher(env);
        self.prewarm(dispatcher.substate_mut(), &message, env);
        let outcome = dispatcher.execute(message).await;
        let mut result = self.finish(outcome, gas_limit);
        result.stack.clear();

        self.record(&result, started).await;
        result
    }

    /// Executes `code` as a CALL frame at the zero address with
    /// `env.origin` as caller. The final operand stack is returned.
    pub async fn run_code(&self, code: Bytes, gas_limit: u64, env: &Environment) -> ExecutionResult {
        self.run_code_at(Address::ZERO, code, gas_limit, env).await
    }

    /// Executes `code` as a CALL frame against `address`.
    ///
    /// Storage and balance reads resolve against `address`; the code stored
    /// there, if any, is ignored.
    #[instrument(
        skip(self, code, env),
        fields(
            execution_id = %Uuid::new_v4(),
            kind = "code",
            gas_limit = gas_limit,
            depth = 0,
        )
    )]
    pub async fn run_code_at(
        &self,
        address: Address,
        code: Bytes,
        gas_limit: u64,
        env: &Environment,
    ) -> ExecutionResult {
        let started = Instant::now();
        let message = Message::call(env.origin, address, U256::zero(), Bytes::new(), gas_limit);

        let mut dispatcher = self.dispatcher(env);
        self.prewarm(dispatcher.substate_mut(), &message, env);
        let outcome = dispatcher.execute_code(message, code).await;
        let result = self.finish(outcome, gas_limit);

        self.record(&result, started).await;
        result
    }

    fn dispatcher<'a>(&'a self, env: &'a Environment) -> CallDispatcher<'a, S> {
        CallDispatcher::new(
            &self.rules,
            env,
            &self.state,
            self.block_hashes.as_ref(),
            &self.code_cache,
            &self.abort,
        )
    }

    /// Warms what EIP-2929 and EIP-2930 treat as accessed before the first
    /// instruction.
    fn prewarm(&self, substate: &mut Substate, message: &Message, env: &Environment) {
        let features = self.rules.features();
        if !features.access_lists {
            return;
        }
        substate.access_account(env.origin);
        substate.access_account(message.caller);
        if let Some(target) = message.recipient() {
            substate.access_account(target);
        }
        for address in self.rules.precompiles().addresses() {
            substate.access_account(address);
        }
        if features.warm_coinbase {
            substate.access_account(env.block.coinbase);
        }
        for item in &env.access_list {
            substate.access_account(item.address);
            for key in &item.storage_keys {
                substate.access_slot(item.address, *key);
            }
        }
    }

    /// Builds the outward result of a finished top-level message.
    fn finish(&self, outcome: FrameOutcome, gas_limit: u64) -> ExecutionResult {
        if self.abort.is_aborted() {
            warn!("execution aborted");
        }

        let gas_used = gas_limit.saturating_sub(outcome.gas_left);
        let gas_refund = if outcome.success {
            gas::capped_refund(gas_used, outcome.refund, self.rules.protocol().refund_quotient)
        } else {
            0
        };

        info!(
            success = outcome.success,
            gas_used,
            gas_refund,
            failure = ?outcome.failure,
            "execution completed"
        );

        ExecutionResult {
            success: outcome.success,
            output: outcome.output,
            gas_used,
            gas_refund,
            logs: outcome.logs,
            created_address: outcome.created_address,
            failure: outcome.failure,
            stack: outcome.stack,
        }
    }

    async fn record(&self, result: &ExecutionResult, started: Instant) {
        let elapsed_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        self.stats.write().await.record(result, elapsed_us);
    }
}

impl<S: StateCollaborator + Clone> Clone for EvmEngine<S> {
    /// Copies the state and shares the revision rules. The clone starts
    /// with empty statistics, an empty code cache and its own abort handle.
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            rules: Arc::clone(&self.rules),
            state: self.state.clone(),
            block_hashes: Arc::clone(&self.block_hashes),
            code_cache: CodeCache::new(self.config.jumpdest_cache_capacity),
            abort: AbortHandle::new(),
            stats: RwLock::new(EngineStats::default()),
        }
    }
}

#[async_trait]
impl<S: StateCollaborator> ExecutionApi for EvmEngine<S> {
    async fn run_call(&self, message: Message, env: &Environment) -> ExecutionResult {
        EvmEngine::run_call(self, message, env).await
    }

    async fn run_code(&self, code: Bytes, gas_limit: u64, env: &Environment) -> ExecutionResult {
        EvmEngine::run_code(self, code, gas_limit, env).await
    }
}

// =============================================================================
// TESTS
// =============================================================================
