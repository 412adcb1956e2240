//! # Call/Create Dispatcher
//!
//! Drives one top-level message to completion.
//!
//! Suspended frames live in an explicit stack owned by the dispatcher. The
//! interpreter never recurses: when a frame issues a CALL or CREATE the
//! dispatcher enters the child, runs it to completion, and resumes the
//! parent with the child's [`FrameOutcome`].
//!
//! ## Checkpoint discipline
//!
//! Every entered message opens a state checkpoint and a substate checkpoint
//! before its first write. A frame that halts successfully commits both; a
//! REVERT or an exceptional halt reverts both. Failures detected before the
//! checkpoint exists (depth, balance) touch nothing.

use crate::config::RevisionRules;
use crate::domain::entities::{CallKind, Environment, Log, Message};
use crate::domain::services::{create2_address, create_address};
use crate::domain::value_objects::{Address, Bytes, U256};
use crate::engine::AbortHandle;
use crate::errors::{FailureKind, PrecompileError, VmError};
use crate::evm::analysis::{AnalyzedCode, CodeCache};
use crate::evm::frame::{Frame, FrameAction, Halt, PendingReturn};
use crate::evm::gas::GasMeter;
use crate::evm::interpreter::Interpreter;
use crate::evm::precompiles::PrecompileOutput;
use crate::evm::substate::{Substate, SubstateCheckpoint};
use crate::ports::outbound::{BlockHashOracle, Checkpoint, StateCollaborator};
use std::sync::Arc;
use tracing::{debug, warn};

/// First byte reserved for EOF containers (EIP-3541).
const EOF_PREFIX: u8 = 0xEF;

/// Result of one entered message, handed to its caller.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FrameOutcome {
    /// True when the message halted with STOP or RETURN.
    pub success: bool,
    /// Failure kind when `success` is false.
    pub failure: Option<FailureKind>,
    /// Return data, revert data, or deployed code.
    pub output: Bytes,
    /// Gas handed back to the caller.
    pub gas_left: u64,
    /// Refund counter accumulated by the message and its committed children.
    pub refund: i64,
    /// Logs of the message and its committed children.
    pub logs: Vec<Log>,
    /// Address of the deployed contract.
    pub created_address: Option<Address>,
    /// Final operand stack of a top-level frame, bottom first.
    pub stack: Vec<U256>,
}

impl FrameOutcome {
    fn succeeded(output: Bytes, gas_left: u64) -> Self {
        Self {
            success: true,
            output,
            gas_left,
            ..Self::default()
        }
    }

    fn failed(kind: FailureKind, gas_left: u64) -> Self {
        Self {
            failure: Some(kind),
            gas_left,
            ..Self::default()
        }
    }

    /// True when the message ended with REVERT.
    #[must_use]
    pub fn is_revert(&self) -> bool {
        self.failure == Some(FailureKind::RevertedByContract)
    }
}

/// What entering a message produced.
enum Entry {
    /// Bytecode to run.
    Frame(Box<Frame>),
    /// Finished without interpretation (precompile, empty code, early failure).
    Finished(FrameOutcome),
}

/// Runs nested calls and creations for one top-level message.
pub struct CallDispatcher<'a, S: ?Sized> {
    rules: &'a RevisionRules,
    env: &'a Environment,
    state: &'a S,
    block_hashes: &'a dyn BlockHashOracle,
    code_cache: &'a CodeCache,
    abort: &'a AbortHandle,
    substate: Substate,
    frames: Vec<Frame>,
}

impl<'a, S> CallDispatcher<'a, S>
where
    S: StateCollaborator + ?Sized,
{
    /// Creates a dispatcher with an empty substate.
    pub fn new(
        rules: &'a RevisionRules,
        env: &'a Environment,
        state: &'a S,
        block_hashes: &'a dyn BlockHashOracle,
        code_cache: &'a CodeCache,
        abort: &'a AbortHandle,
    ) -> Self {
        Self {
            rules,
            env,
            state,
            block_hashes,
            code_cache,
            abort,
            substate: Substate::new(),
            frames: Vec::new(),
        }
    }

    /// Mutable substate, for pre-warming before execution.
    pub fn substate_mut(&mut self) -> &mut Substate {
        &mut self.substate
    }

    /// Executes `message` and every sub-call it makes.
    pub async fn execute(&mut self, message: Message) -> FrameOutcome {
        match self.enter(message).await {
            Entry::Frame(frame) => self.drive(*frame).await,
            Entry::Finished(outcome) => outcome,
        }
    }

    /// Executes `code` as a CALL frame against `message.target` without
    /// loading code from state or transferring value.
    pub async fn execute_code(&mut self, message: Message, code: Bytes) -> FrameOutcome {
        let address = message.recipient().unwrap_or(Address::ZERO);
        let code = Arc::new(AnalyzedCode::new(code));
        match self.open_frame(message, address, code).await {
            Ok(frame) => self.drive(frame).await,
            Err(error) => collaborator_failure(&error),
        }
    }

    // =========================================================================
    // FRAME LOOP
    // =========================================================================

    async fn drive(&mut self, mut frame: Frame) -> FrameOutcome {
        let mut action = self.run_frame(&mut frame).await;
        loop {
            match action {
                FrameAction::SubCall(message) => match self.enter(*message).await {
                    Entry::Frame(child) => {
                        self.frames.push(frame);
                        frame = *child;
                        action = self.run_frame(&mut frame).await;
                    }
                    Entry::Finished(outcome) => {
                        action = self.resume_and_run(&mut frame, outcome).await;
                    }
                },
                FrameAction::Halt(halt) => {
                    let outcome = self.exit(frame, halt).await;
                    let Some(parent) = self.frames.pop() else {
                        return outcome;
                    };
                    frame = parent;
                    action = self.resume_and_run(&mut frame, outcome).await;
                }
            }
        }
    }

    async fn run_frame(&mut self, frame: &mut Frame) -> FrameAction {
        let mut interpreter = Interpreter::new(
            self.rules,
            self.env,
            self.state,
            &mut self.substate,
            self.block_hashes,
            self.abort,
        );
        interpreter.run(frame).await
    }

    async fn resume_and_run(&mut self, frame: &mut Frame, outcome: FrameOutcome) -> FrameAction {
        match resume(frame, outcome) {
            Ok(()) => self.run_frame(frame).await,
            Err(error) => FrameAction::Halt(Halt::Failed(error)),
        }
    }

    // =========================================================================
    // ENTRY
    // =========================================================================

    async fn enter(&mut self, message: Message) -> Entry {
        let max = self.rules.protocol().max_call_depth;
        if message.depth > max {
            debug!(depth = message.depth, max, "call depth exceeded");
            let error = VmError::CallDepthExceeded {
                depth: message.depth,
                max,
            };
            return Entry::Finished(FrameOutcome::failed(error.kind(), message.gas_limit));
        }

        debug!(
            kind = message.kind.label(),
            depth = message.depth,
            gas_limit = message.gas_limit,
            "entering frame"
        );
        let entered = if message.kind.is_create() {
            self.enter_create(message).await
        } else {
            self.enter_call(message).await
        };
        entered.unwrap_or_else(|error| Entry::Finished(collaborator_failure(&error)))
    }

    /// Checks that `caller` can pay `value`.
    async fn can_pay(&self, message: &Message) -> Result<Option<FrameOutcome>, VmError> {
        if !message.kind.transfers_value() || message.value.is_zero() {
            return Ok(None);
        }
        let available = self.state.get_balance(message.caller).await?;
        if available < message.value {
            debug!(%available, required = %message.value, "insufficient balance");
            let error = VmError::InsufficientBalance {
                required: message.value,
                available,
            };
            return Ok(Some(FrameOutcome::failed(error.kind(), message.gas_limit)));
        }
        Ok(None)
    }

    async fn enter_call(&mut self, message: Message) -> Result<Entry, VmError> {
        if let Some(outcome) = self.can_pay(&message).await? {
            return Ok(Entry::Finished(outcome));
        }
        let target = message.recipient().unwrap_or(Address::ZERO);
        let code_address = message.code_source().unwrap_or(target);

        let checkpoint = self.state.checkpoint().await?;
        let substate_checkpoint = self.substate.checkpoint();

        if message.kind == CallKind::Call {
            if let Err(error) = self
                .state
                .transfer(message.caller, target, message.value)
                .await
            {
                self.abandon(checkpoint, substate_checkpoint).await;
                return Err(error.into());
            }
        }

        if let Some(result) = self.rules.precompiles().invoke(
            &code_address,
            message.input.as_slice(),
            message.gas_limit,
        ) {
            return Ok(Entry::Finished(
                self.finish_precompile(
                    &message,
                    code_address,
                    result,
                    checkpoint,
                    substate_checkpoint,
                )
                .await,
            ));
        }

        let code = match self.load_code(code_address).await {
            Ok(code) => code,
            Err(error) => {
                self.abandon(checkpoint, substate_checkpoint).await;
                return Err(error);
            }
        };
        if code.is_empty() {
            self.state.commit(checkpoint).await?;
            return Ok(Entry::Finished(FrameOutcome::succeeded(
                Bytes::new(),
                message.gas_limit,
            )));
        }

        let frame = Frame::new(
            message,
            target,
            code,
            checkpoint,
            substate_checkpoint,
            self.rules.protocol(),
        );
        Ok(Entry::Frame(Box::new(frame)))
    }

    async fn finish_precompile(
        &mut self,
        message: &Message,
        address: Address,
        result: Result<PrecompileOutput, PrecompileError>,
        checkpoint: Checkpoint,
        substate_checkpoint: SubstateCheckpoint,
    ) -> FrameOutcome {
        match result {
            Ok(output) => {
                debug!(?address, gas_used = output.gas_used, "precompile succeeded");
                if let Err(error) = self.state.commit(checkpoint).await {
                    return collaborator_failure(&error.into());
                }
                FrameOutcome::succeeded(
                    output.output,
                    message.gas_limit.saturating_sub(output.gas_used),
                )
            }
            Err(error) => {
                debug!(?address, %error, "precompile failed");
                self.abandon(checkpoint, substate_checkpoint).await;
                FrameOutcome::failed(VmError::from(error).kind(), 0)
            }
        }
    }

    async fn enter_create(&mut self, message: Message) -> Result<Entry, VmError> {
        if message.is_static {
            return Ok(Entry::Finished(FrameOutcome::failed(
                VmError::WriteInStaticContext.kind(),
                0,
            )));
        }
        if let Some(outcome) = self.can_pay(&message).await? {
            return Ok(Entry::Finished(outcome));
        }

        let nonce = self.state.get_nonce(message.caller).await?;
        let Some(next_nonce) = nonce.checked_add(1) else {
            debug!(caller = ?message.caller, "creator nonce overflow");
            let error = VmError::NonceOverflow(message.caller);
            return Ok(Entry::Finished(FrameOutcome::failed(
                error.kind(),
                message.gas_limit,
            )));
        };
        let address = match message.kind {
            CallKind::Create2 { salt } => {
                create2_address(message.caller, salt, message.input.as_slice())
            }
            _ => create_address(message.caller, nonce),
        };

        // The nonce bump survives a failed creation
        self.state.set_nonce(message.caller, next_nonce).await?;
        self.substate.access_account(address);

        let checkpoint = self.state.checkpoint().await?;
        let substate_checkpoint = self.substate.checkpoint();

        let collision = match self.state.get_account(address).await {
            Ok(account) => account.is_some_and(|a| a.has_code() || a.nonce > 0),
            Err(error) => {
                self.abandon(checkpoint, substate_checkpoint).await;
                return Err(error.into());
            }
        };
        if collision {
            debug!(?address, "create collision");
            self.abandon(checkpoint, substate_checkpoint).await;
            let error = VmError::ContractAlreadyExists(address);
            return Ok(Entry::Finished(FrameOutcome::failed(error.kind(), 0)));
        }

        if let Err(error) = self.initialise_account(&message, address).await {
            self.abandon(checkpoint, substate_checkpoint).await;
            return Err(error);
        }
        self.substate.mark_created(address);

        if message.input.is_empty() {
            self.state.commit(checkpoint).await?;
            return Ok(Entry::Finished(FrameOutcome {
                created_address: Some(address),
                ..FrameOutcome::succeeded(Bytes::new(), message.gas_limit)
            }));
        }

        let code = Arc::new(AnalyzedCode::new(message.input.clone()));
        let frame = Frame::new(
            message,
            address,
            code,
            checkpoint,
            substate_checkpoint,
            self.rules.protocol(),
        );
        Ok(Entry::Frame(Box::new(frame)))
    }

    async fn initialise_account(&self, message: &Message, address: Address) -> Result<(), VmError> {
        self.state.set_nonce(address, 1).await?;
        self.state
            .transfer(message.caller, address, message.value)
            .await?;
        Ok(())
    }

    /// Opens checkpoints and builds a frame for already-known code.
    async fn open_frame(
        &mut self,
        message: Message,
        address: Address,
        code: Arc<AnalyzedCode>,
    ) -> Result<Frame, VmError> {
        let checkpoint = self.state.checkpoint().await?;
        let substate_checkpoint = self.substate.checkpoint();
        Ok(Frame::new(
            message,
            address,
            code,
            checkpoint,
            substate_checkpoint,
            self.rules.protocol(),
        ))
    }

    async fn load_code(&self, address: Address) -> Result<Arc<AnalyzedCode>, VmError> {
        let Some(hash) = self.state.get_code_hash(address).await? else {
            return Ok(Arc::new(AnalyzedCode::new(Bytes::new())));
        };
        let code = self.state.get_code(address).await?;
        if code.is_empty() {
            return Ok(Arc::new(AnalyzedCode::with_hash(code, hash)));
        }
        Ok(self.code_cache.get_or_analyze(hash, code))
    }

    // =========================================================================
    // EXIT
    // =========================================================================

    async fn exit(&mut self, frame: Frame, halt: Halt) -> FrameOutcome {
        let Frame {
            message,
            address,
            stack,
            mut meter,
            logs,
            checkpoint,
            substate_checkpoint,
            ..
        } = frame;
        let is_create = message.kind.is_create();
        let stack = if message.depth == 0 {
            stack.into_vec()
        } else {
            Vec::new()
        };

        let (halt, output) = match halt {
            Halt::Stop => (Ok(()), Bytes::new()),
            Halt::Return(data) => (Ok(()), data),
            Halt::Revert(data) => (Err(None), data),
            Halt::Failed(error) => (Err(Some(error)), Bytes::new()),
        };

        let completed = match halt {
            Ok(()) if is_create => self.deposit_code(address, &output, &mut meter).await,
            Ok(()) => Ok(()),
            Err(failure) => Err(failure),
        };
        // Deletions belong to the outermost checkpoint
        let completed = match completed {
            Ok(()) if self.frames.is_empty() => self.delete_destructed().await,
            other => other,
        };
        let completed = match completed {
            Ok(()) => self
                .state
                .commit(checkpoint)
                .await
                .map_err(|error| Some(error.into())),
            Err(failure) => Err(failure),
        };

        match completed {
            Ok(()) => {
                debug!(
                    depth = message.depth,
                    gas_used = meter.used(),
                    gas_left = meter.remaining(),
                    "frame succeeded"
                );
                FrameOutcome {
                    success: true,
                    failure: None,
                    output,
                    gas_left: meter.remaining(),
                    refund: meter.refund(),
                    logs,
                    created_address: is_create.then_some(address),
                    stack,
                }
            }
            Err(None) => {
                debug!(depth = message.depth, "frame reverted");
                self.abandon(checkpoint, substate_checkpoint).await;
                FrameOutcome {
                    output,
                    gas_left: meter.remaining(),
                    stack,
                    ..FrameOutcome::failed(FailureKind::RevertedByContract, 0)
                }
            }
            Err(Some(error)) => {
                match &error {
                    VmError::State(cause) => warn!(%cause, depth = message.depth, "state error"),
                    VmError::Aborted => warn!(depth = message.depth, "execution aborted"),
                    _ => debug!(depth = message.depth, %error, "frame failed"),
                }
                self.abandon(checkpoint, substate_checkpoint).await;
                FrameOutcome {
                    stack,
                    ..FrameOutcome::failed(error.kind(), 0)
                }
            }
        }
    }

    /// Validates and stores the code returned by init code.
    async fn deposit_code(
        &self,
        address: Address,
        code: &Bytes,
        meter: &mut GasMeter,
    ) -> Result<(), Option<VmError>> {
        let protocol = self.rules.protocol();
        if protocol.features.reject_ef_code && code.as_slice().first() == Some(&EOF_PREFIX) {
            return Err(Some(VmError::InvalidCodePrefix));
        }
        if code.len() > protocol.max_code_size {
            return Err(Some(VmError::CodeSizeExceeded {
                size: code.len(),
                max: protocol.max_code_size,
            }));
        }
        let cost = protocol
            .code_deposit_cost
            .saturating_mul(code.len() as u64);
        meter.charge(cost).map_err(Some)?;
        self.state
            .set_code(address, code.clone())
            .await
            .map_err(|error| Some(error.into()))
    }

    /// Removes every account self-destructed during the execution.
    async fn delete_destructed(&self) -> Result<(), Option<VmError>> {
        for address in self.substate.destructed() {
            if let Err(error) = self.state.delete_account(*address).await {
                warn!(%error, ?address, "failed to delete self-destructed account");
                return Err(Some(error.into()));
            }
        }
        Ok(())
    }

    /// Reverts both checkpoints; a collaborator error here is only logged.
    async fn abandon(&mut self, checkpoint: Checkpoint, substate_checkpoint: SubstateCheckpoint) {
        self.substate.revert_to(substate_checkpoint);
        if let Err(error) = self.state.revert(checkpoint).await {
            warn!(%error, checkpoint = checkpoint.id(), "checkpoint revert failed");
        }
    }
}

/// A collaborator error outside any frame consumes the message's gas.
fn collaborator_failure(error: &VmError) -> FrameOutcome {
    warn!(%error, "state collaborator failure");
    FrameOutcome::failed(error.kind(), 0)
}

/// Hands a finished child's outcome back to its suspended parent.
fn resume(parent: &mut Frame, mut child: FrameOutcome) -> Result<(), VmError> {
    parent.meter.reclaim(child.gas_left);
    if child.success {
        parent.meter.merge_refund(child.refund);
        parent.logs.append(&mut child.logs);
    }

    match parent.pending.take() {
        Some(PendingReturn::Call {
            out_offset,
            out_size,
        }) => {
            let visible = child.success || child.is_revert();
            parent.return_data = if visible { child.output } else { Bytes::new() };
            let copied = out_size.min(parent.return_data.len());
            parent
                .memory
                .write_bytes(out_offset, &parent.return_data.as_slice()[..copied]);
            parent.stack.push_bool(child.success)
        }
        Some(PendingReturn::Create) => {
            parent.return_data = if child.is_revert() {
                child.output
            } else {
                Bytes::new()
            };
            let word = match child.created_address {
                Some(address) if child.success => address.to_word(),
                _ => U256::zero(),
            };
            parent.stack.push(word)
        }
        None => Ok(()),
    }
}
