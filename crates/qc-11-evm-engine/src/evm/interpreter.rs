//! # EVM Interpreter
//!
//! Executes one [`Frame`] until it halts or issues a CALL/CREATE.
//!
//! The interpreter never recurses: a CALL or CREATE suspends the frame and
//! hands the child [`Message`] back to the dispatcher as
//! [`FrameAction::SubCall`]. The dispatcher resumes the frame once the child
//! has finished.
//!
//! ## Step order
//!
//! For every instruction:
//! 1. abort check
//! 2. decode through the revision's instruction table (end of code is STOP)
//! 3. stack arity check
//! 4. static gas
//! 5. dynamic gas (memory expansion, cold access, copies)
//! 6. the effect itself
//!
//! Any error in 3..6 halts the frame with [`Halt::Failed`].

use crate::config::RevisionRules;
use crate::domain::entities::{CallKind, Environment, Log, Message};
use crate::domain::services::keccak256;
use crate::domain::value_objects::{Address, Bytes, Hash, StorageKey, StorageValue, U256};
use crate::engine::AbortHandle;
use crate::errors::VmError;
use crate::evm::arithmetic;
use crate::evm::frame::{as_usize, Frame, FrameAction, Halt, PendingReturn};
use crate::evm::gas;
use crate::evm::opcodes::Opcode;
use crate::evm::substate::Substate;
use crate::ports::outbound::{BlockHashOracle, StateCollaborator};

/// BLOCKHASH only answers for this many preceding blocks.
const BLOCKHASH_WINDOW: u64 = 256;

/// The four CALL-family instructions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CallScheme {
    Call,
    CallCode,
    DelegateCall,
    StaticCall,
}

impl CallScheme {
    const fn kind(self) -> CallKind {
        match self {
            Self::Call => CallKind::Call,
            Self::CallCode => CallKind::CallCode,
            Self::DelegateCall => CallKind::DelegateCall,
            Self::StaticCall => CallKind::StaticCall,
        }
    }

    const fn takes_value(self) -> bool {
        matches!(self, Self::Call | Self::CallCode)
    }
}

/// Runs frames against shared execution context.
///
/// One interpreter is built per frame run; it borrows everything and owns
/// nothing.
pub struct Interpreter<'a, S: ?Sized> {
    rules: &'a RevisionRules,
    env: &'a Environment,
    state: &'a S,
    substate: &'a mut Substate,
    block_hashes: &'a dyn BlockHashOracle,
    abort: &'a AbortHandle,
}

impl<'a, S> Interpreter<'a, S>
where
    S: StateCollaborator + ?Sized,
{
    /// Borrows the execution context.
    pub fn new(
        rules: &'a RevisionRules,
        env: &'a Environment,
        state: &'a S,
        substate: &'a mut Substate,
        block_hashes: &'a dyn BlockHashOracle,
        abort: &'a AbortHandle,
    ) -> Self {
        Self {
            rules,
            env,
            state,
            substate,
            block_hashes,
            abort,
        }
    }

    /// Runs `frame` from its current program counter.
    pub async fn run(&mut self, frame: &mut Frame) -> FrameAction {
        loop {
            match self.step(frame).await {
                Ok(None) => {}
                Ok(Some(action)) => return action,
                Err(error) => return FrameAction::Halt(Halt::Failed(error)),
            }
        }
    }

    async fn step(&mut self, frame: &mut Frame) -> Result<Option<FrameAction>, VmError> {
        if self.abort.is_aborted() {
            return Err(VmError::Aborted);
        }
        if frame.pc >= frame.code.len() {
            return Ok(Some(FrameAction::Halt(Halt::Stop)));
        }

        let byte = frame.code.byte_at(frame.pc);
        let info = self
            .rules
            .instruction(byte)
            .ok_or(VmError::InvalidOpcode(byte))?;
        frame
            .stack
            .require(usize::from(info.inputs), usize::from(info.outputs))?;
        frame.meter.charge(self.rules.protocol().static_cost(byte))?;

        self.execute(frame, info.opcode).await
    }

    #[allow(clippy::too_many_lines)]
    async fn execute(
        &mut self,
        frame: &mut Frame,
        opcode: Opcode,
    ) -> Result<Option<FrameAction>, VmError> {
        match opcode {
            Opcode::Stop => return Ok(Some(FrameAction::Halt(Halt::Stop))),

            // Arithmetic
            Opcode::Add => binary(frame, |a, b| a.overflowing_add(b).0)?,
            Opcode::Mul => binary(frame, |a, b| a.overflowing_mul(b).0)?,
            Opcode::Sub => binary(frame, |a, b| a.overflowing_sub(b).0)?,
            Opcode::Div => binary(frame, arithmetic::div)?,
            Opcode::SDiv => binary(frame, arithmetic::sdiv)?,
            Opcode::Mod => binary(frame, arithmetic::rem)?,
            Opcode::SMod => binary(frame, arithmetic::smod)?,
            Opcode::AddMod => {
                let [a, b, n] = frame.stack.pop_n::<3>()?;
                frame.stack.push(arithmetic::addmod(a, b, n))?;
            }
            Opcode::MulMod => {
                let [a, b, n] = frame.stack.pop_n::<3>()?;
                frame.stack.push(arithmetic::mulmod(a, b, n))?;
            }
            Opcode::Exp => {
                let [base, exponent] = frame.stack.pop_n::<2>()?;
                frame.meter.charge(gas::exp_cost(exponent))?;
                frame.stack.push(arithmetic::exp(base, exponent))?;
            }
            Opcode::SignExtend => binary(frame, arithmetic::signextend)?,

            // Comparison and bitwise
            Opcode::Lt => binary(frame, |a, b| flag(a < b))?,
            Opcode::Gt => binary(frame, |a, b| flag(a > b))?,
            Opcode::SLt => binary(frame, |a, b| flag(arithmetic::slt(a, b)))?,
            Opcode::SGt => binary(frame, |a, b| flag(arithmetic::slt(b, a)))?,
            Opcode::Eq => binary(frame, |a, b| flag(a == b))?,
            Opcode::IsZero => {
                let a = frame.stack.pop()?;
                frame.stack.push_bool(a.is_zero())?;
            }
            Opcode::And => binary(frame, |a, b| a & b)?,
            Opcode::Or => binary(frame, |a, b| a | b)?,
            Opcode::Xor => binary(frame, |a, b| a ^ b)?,
            Opcode::Not => {
                let a = frame.stack.pop()?;
                frame.stack.push(!a)?;
            }
            Opcode::Byte => binary(frame, arithmetic::byte)?,
            Opcode::Shl => binary(frame, arithmetic::shl)?,
            Opcode::Shr => binary(frame, arithmetic::shr)?,
            Opcode::Sar => binary(frame, arithmetic::sar)?,

            Opcode::Keccak256 => {
                let [offset, size] = frame.stack.pop_n::<2>()?;
                let (offset, size) = frame.touch_memory(offset, size)?;
                frame.meter.charge(gas::keccak_word_cost(size))?;
                let hash = keccak256(&frame.memory.read_bytes(offset, size));
                frame.stack.push(hash.to_u256())?;
            }

            // Execution environment
            Opcode::Address => frame.stack.push(frame.address.to_word())?,
            Opcode::Balance => {
                let address = frame.stack.pop_address()?;
                self.charge_account_access(frame, address)?;
                let balance = self.state.get_balance(address).await?;
                frame.stack.push(balance)?;
            }
            Opcode::Origin => frame.stack.push(self.env.origin.to_word())?,
            Opcode::Caller => frame.stack.push(frame.message.caller.to_word())?,
            Opcode::CallValue => frame.stack.push(frame.message.value)?,
            Opcode::CallDataLoad => {
                let offset = frame.stack.pop()?;
                let word = load_word(frame.calldata.as_slice(), offset);
                frame.stack.push(word)?;
            }
            Opcode::CallDataSize => frame.stack.push(U256::from(frame.calldata.len()))?,
            Opcode::CallDataCopy => {
                let [dest, offset, size] = frame.stack.pop_n::<3>()?;
                let (dest, size) = charge_copy(frame, dest, size)?;
                frame
                    .memory
                    .write_padded(dest, frame.calldata.as_slice(), offset, size);
            }
            Opcode::CodeSize => frame.stack.push(U256::from(frame.code.len()))?,
            Opcode::CodeCopy => {
                let [dest, offset, size] = frame.stack.pop_n::<3>()?;
                let (dest, size) = charge_copy(frame, dest, size)?;
                frame
                    .memory
                    .write_padded(dest, frame.code.bytes(), offset, size);
            }
            Opcode::GasPrice => frame.stack.push(self.env.gas_price)?,
            Opcode::ExtCodeSize => {
                let address = frame.stack.pop_address()?;
                self.charge_account_access(frame, address)?;
                let code = self.state.get_code(address).await?;
                frame.stack.push(U256::from(code.len()))?;
            }
            Opcode::ExtCodeCopy => {
                let address = frame.stack.pop_address()?;
                let [dest, offset, size] = frame.stack.pop_n::<3>()?;
                let (dest, size) = charge_copy(frame, dest, size)?;
                self.charge_account_access(frame, address)?;
                let code = self.state.get_code(address).await?;
                frame
                    .memory
                    .write_padded(dest, code.as_slice(), offset, size);
            }
            Opcode::ReturnDataSize => frame.stack.push(U256::from(frame.return_data.len()))?,
            Opcode::ReturnDataCopy => {
                let [dest, offset, size] = frame.stack.pop_n::<3>()?;
                let available = frame.return_data.len();
                let in_bounds = offset
                    .checked_add(size)
                    .is_some_and(|end| end <= U256::from(available));
                if !in_bounds {
                    return Err(VmError::ReturnDataOutOfBounds {
                        offset,
                        size,
                        available,
                    });
                }
                let (dest, size) = charge_copy(frame, dest, size)?;
                frame
                    .memory
                    .write_padded(dest, frame.return_data.as_slice(), offset, size);
            }
            Opcode::ExtCodeHash => {
                let address = frame.stack.pop_address()?;
                self.charge_account_access(frame, address)?;
                let hash = if self.state.is_empty(address).await? {
                    U256::zero()
                } else {
                    self.state
                        .get_code_hash(address)
                        .await?
                        .map_or_else(U256::zero, |hash| hash.to_u256())
                };
                frame.stack.push(hash)?;
            }

            // Block information
            Opcode::BlockHash => {
                let number = frame.stack.pop()?;
                let hash = self.block_hash(number).await;
                frame.stack.push(hash)?;
            }
            Opcode::Coinbase => frame.stack.push(self.env.block.coinbase.to_word())?,
            Opcode::Timestamp => frame.stack.push(U256::from(self.env.block.timestamp))?,
            Opcode::Number => frame.stack.push(U256::from(self.env.block.number))?,
            Opcode::PrevRandao => {
                let value = if self.rules.features().prevrandao {
                    self.env.block.prev_randao.to_u256()
                } else {
                    self.env.block.difficulty
                };
                frame.stack.push(value)?;
            }
            Opcode::GasLimit => frame.stack.push(U256::from(self.env.block.gas_limit))?,
            Opcode::ChainId => frame.stack.push(U256::from(self.env.block.chain_id))?,
            Opcode::SelfBalance => {
                let balance = self.state.get_balance(frame.address).await?;
                frame.stack.push(balance)?;
            }
            Opcode::BaseFee => frame.stack.push(self.env.block.base_fee)?,

            // Stack, memory, storage and flow
            Opcode::Pop => {
                frame.stack.pop()?;
            }
            Opcode::MLoad => {
                let offset = frame.stack.pop()?;
                let (offset, _) = frame.touch_memory(offset, U256::from(32))?;
                let word = frame.memory.read_word(offset);
                frame.stack.push(word)?;
            }
            Opcode::MStore => {
                let [offset, value] = frame.stack.pop_n::<2>()?;
                let (offset, _) = frame.touch_memory(offset, U256::from(32))?;
                frame.memory.write_word(offset, value);
            }
            Opcode::MStore8 => {
                let [offset, value] = frame.stack.pop_n::<2>()?;
                let (offset, _) = frame.touch_memory(offset, U256::one())?;
                frame.memory.write_byte(offset, value.byte(0));
            }
            Opcode::SLoad => self.sload(frame).await?,
            Opcode::SStore => self.sstore(frame).await?,
            Opcode::Jump => {
                let dest = frame.stack.pop()?;
                frame.pc = jump_target(frame, dest)?;
                return Ok(None);
            }
            Opcode::JumpI => {
                let [dest, condition] = frame.stack.pop_n::<2>()?;
                if !condition.is_zero() {
                    frame.pc = jump_target(frame, dest)?;
                    return Ok(None);
                }
            }
            Opcode::Pc => frame.stack.push(U256::from(frame.pc))?,
            Opcode::MSize => frame.stack.push(U256::from(frame.memory.len()))?,
            Opcode::Gas => frame.stack.push(U256::from(frame.meter.remaining()))?,
            Opcode::JumpDest => {}
            Opcode::TLoad => {
                let key = StorageKey::from_u256(frame.stack.pop()?);
                let value = self.substate.transient_load(frame.address, key);
                frame.stack.push(value.to_u256())?;
            }
            Opcode::TStore => {
                frame.ensure_writable()?;
                let [key, value] = frame.stack.pop_n::<2>()?;
                self.substate.transient_store(
                    frame.address,
                    StorageKey::from_u256(key),
                    StorageValue::from_u256(value),
                );
            }
            Opcode::MCopy => {
                let [dest, src, size] = frame.stack.pop_n::<3>()?;
                let (src, _) = frame.touch_memory(src, size)?;
                let (dest, size) = charge_copy(frame, dest, size)?;
                frame.memory.copy_within(dest, src, size);
            }
            Opcode::Push0 => frame.stack.push(U256::zero())?,

            // Logging
            Opcode::Log0 => Self::log(frame, 0)?,
            Opcode::Log1 => Self::log(frame, 1)?,
            Opcode::Log2 => Self::log(frame, 2)?,
            Opcode::Log3 => Self::log(frame, 3)?,
            Opcode::Log4 => Self::log(frame, 4)?,

            // System
            Opcode::Create => return self.create(frame, false).map(Some),
            Opcode::Create2 => return self.create(frame, true).map(Some),
            Opcode::Call => return self.call(frame, CallScheme::Call).await.map(Some),
            Opcode::CallCode => return self.call(frame, CallScheme::CallCode).await.map(Some),
            Opcode::DelegateCall => {
                return self.call(frame, CallScheme::DelegateCall).await.map(Some)
            }
            Opcode::StaticCall => {
                return self.call(frame, CallScheme::StaticCall).await.map(Some)
            }
            Opcode::Return => {
                let data = halt_data(frame)?;
                return Ok(Some(FrameAction::Halt(Halt::Return(data))));
            }
            Opcode::Revert => {
                let data = halt_data(frame)?;
                return Ok(Some(FrameAction::Halt(Halt::Revert(data))));
            }
            Opcode::Invalid => return Err(VmError::InvalidOpcode(opcode.byte())),
            Opcode::SelfDestruct => {
                self.selfdestruct(frame).await?;
                return Ok(Some(FrameAction::Halt(Halt::Stop)));
            }

            // PUSHn, DUPn and SWAPn are decoded from the byte
            _ => return stack_family(frame, opcode.byte()),
        }

        frame.pc += 1;
        Ok(None)
    }

    // =========================================================================
    // STATE ACCESS
    // =========================================================================

    fn charge_account_access(&mut self, frame: &mut Frame, address: Address) -> Result<(), VmError> {
        if self.substate.access_account(address).is_cold() {
            frame
                .meter
                .charge(self.rules.protocol().cold_account_surcharge)?;
        }
        Ok(())
    }

    async fn block_hash(&self, number: U256) -> U256 {
        let current = self.env.block.number;
        match u64::try_from(number) {
            Ok(number) if number < current && current - number <= BLOCKHASH_WINDOW => self
                .block_hashes
                .block_hash(number)
                .await
                .map_or_else(U256::zero, |hash| hash.to_u256()),
            _ => U256::zero(),
        }
    }

    async fn sload(&mut self, frame: &mut Frame) -> Result<(), VmError> {
        let key = StorageKey::from_u256(frame.stack.pop()?);
        if self.substate.access_slot(frame.address, key).is_cold() {
            frame
                .meter
                .charge(self.rules.protocol().cold_slot_surcharge)?;
        }
        let value = self.state.get_storage(frame.address, key).await?;
        self.substate.original_value(frame.address, key, value);
        frame.stack.push(value.to_u256())
    }

    async fn sstore(&mut self, frame: &mut Frame) -> Result<(), VmError> {
        frame.ensure_writable()?;
        let protocol = self.rules.protocol();
        if frame.meter.remaining() <= protocol.sstore_sentry {
            return Err(VmError::OutOfGas);
        }

        let [key, value] = frame.stack.pop_n::<2>()?;
        let key = StorageKey::from_u256(key);
        let new = StorageValue::from_u256(value);

        let cold = self.substate.access_slot(frame.address, key).is_cold();
        let current = self.state.get_storage(frame.address, key).await?;
        let original = self.substate.original_value(frame.address, key, current);

        let cost = gas::sstore_cost(protocol, original, current, new, cold);
        frame.meter.charge(cost.gas)?;
        if cost.refund_delta >= 0 {
            frame.meter.add_refund(cost.refund_delta.unsigned_abs());
        } else {
            frame.meter.remove_refund(cost.refund_delta.unsigned_abs());
        }

        if current != new {
            self.state.set_storage(frame.address, key, new).await?;
        }
        Ok(())
    }

    fn log(frame: &mut Frame, topic_count: usize) -> Result<(), VmError> {
        frame.ensure_writable()?;
        let [offset, size] = frame.stack.pop_n::<2>()?;
        let mut topics = Vec::with_capacity(topic_count);
        for _ in 0..topic_count {
            topics.push(Hash::from_u256(frame.stack.pop()?));
        }
        let (offset, size) = frame.touch_memory(offset, size)?;
        frame.meter.charge(gas::log_cost(topic_count, size))?;

        let data = Bytes::from_vec(frame.memory.read_bytes(offset, size));
        frame.logs.push(Log::new(frame.address, topics, data));
        Ok(())
    }

    // =========================================================================
    // CALL / CREATE
    // =========================================================================

    async fn call(&mut self, frame: &mut Frame, scheme: CallScheme) -> Result<FrameAction, VmError> {
        let requested_gas = frame.stack.pop()?;
        let target = frame.stack.pop_address()?;
        let value = if scheme.takes_value() {
            frame.stack.pop()?
        } else {
            U256::zero()
        };
        let [in_offset, in_size, out_offset, out_size] = frame.stack.pop_n::<4>()?;

        if scheme == CallScheme::Call && !value.is_zero() {
            frame.ensure_writable()?;
        }

        let (in_offset, in_size) = frame.touch_memory(in_offset, in_size)?;
        let (out_offset, out_size) = frame.touch_memory(out_offset, out_size)?;

        self.charge_account_access(frame, target)?;
        let protocol = self.rules.protocol();
        if !value.is_zero() {
            frame.meter.charge(protocol.call_value_cost)?;
            if scheme == CallScheme::Call && self.state.is_empty(target).await? {
                frame.meter.charge(protocol.new_account_cost)?;
            }
        }

        let forwarded = gas::forwarded_gas(frame.meter.remaining(), requested_gas);
        frame.meter.charge(forwarded)?;
        let gas_limit = if value.is_zero() {
            forwarded
        } else {
            forwarded.saturating_add(protocol.call_stipend)
        };

        let input = Bytes::from_vec(frame.memory.read_bytes(in_offset, in_size));
        let (caller, recipient, code_address, value) = match scheme {
            CallScheme::Call | CallScheme::StaticCall => (frame.address, target, None, value),
            CallScheme::CallCode => (frame.address, frame.address, Some(target), value),
            CallScheme::DelegateCall => (
                frame.message.caller,
                frame.address,
                Some(target),
                frame.message.value,
            ),
        };
        let message = Message {
            kind: scheme.kind(),
            caller,
            target: Some(recipient),
            code_address,
            value,
            input,
            gas_limit,
            is_static: frame.is_static() || scheme == CallScheme::StaticCall,
            depth: frame.depth() + 1,
        };

        frame.pending = Some(PendingReturn::Call {
            out_offset,
            out_size,
        });
        frame.pc += 1;
        Ok(FrameAction::SubCall(Box::new(message)))
    }

    fn create(&self, frame: &mut Frame, salted: bool) -> Result<FrameAction, VmError> {
        frame.ensure_writable()?;
        let [value, offset, size] = frame.stack.pop_n::<3>()?;
        let salt = if salted {
            Some(frame.stack.pop()?)
        } else {
            None
        };
        let (offset, size) = frame.touch_memory(offset, size)?;

        let protocol = self.rules.protocol();
        if protocol.features.initcode_limit {
            if size > protocol.max_initcode_size {
                return Err(VmError::InitCodeSizeExceeded {
                    size,
                    max: protocol.max_initcode_size,
                });
            }
            frame
                .meter
                .charge(protocol.initcode_word_cost.saturating_mul(gas::word_count(size)))?;
        }
        if salted {
            frame.meter.charge(gas::keccak_word_cost(size))?;
        }

        let gas_limit = gas::create_gas(frame.meter.remaining());
        frame.meter.charge(gas_limit)?;

        let init_code = Bytes::from_vec(frame.memory.read_bytes(offset, size));
        let message = match salt {
            Some(salt) => Message::create2(
                frame.address,
                value,
                init_code,
                Hash::from_u256(salt),
                gas_limit,
            ),
            None => Message::create(frame.address, value, init_code, gas_limit),
        }
        .with_depth(frame.depth() + 1);

        frame.pending = Some(PendingReturn::Create);
        frame.pc += 1;
        Ok(FrameAction::SubCall(Box::new(message)))
    }

    async fn selfdestruct(&mut self, frame: &mut Frame) -> Result<(), VmError> {
        frame.ensure_writable()?;
        let beneficiary = frame.stack.pop_address()?;
        let protocol = self.rules.protocol();

        if self.substate.access_account(beneficiary).is_cold() {
            frame.meter.charge(protocol.selfdestruct_cold_cost)?;
        }
        let balance = self.state.get_balance(frame.address).await?;
        if !balance.is_zero() && self.state.is_empty(beneficiary).await? {
            frame.meter.charge(protocol.new_account_cost)?;
        }

        let deletes = !protocol.features.selfdestruct_only_same_tx
            || self.substate.was_created(&frame.address);
        if deletes && self.substate.schedule_destruct(frame.address) {
            frame.meter.add_refund(protocol.selfdestruct_refund);
        }

        if beneficiary != frame.address {
            self.state
                .transfer(frame.address, beneficiary, balance)
                .await?;
        }
        if deletes {
            self.state.set_balance(frame.address, U256::zero()).await?;
        }
        Ok(())
    }
}

// =============================================================================
// HELPERS
// =============================================================================

fn stack_family(frame: &mut Frame, byte: u8) -> Result<Option<FrameAction>, VmError> {
    match byte {
        0x60..=0x7F => {
            let size = usize::from(byte - 0x5F);
            let word = push_immediate(frame.code.bytes(), frame.pc + 1, size);
            frame.stack.push(word)?;
            frame.pc += 1 + size;
            return Ok(None);
        }
        0x80..=0x8F => frame.stack.dup(usize::from(byte - 0x80))?,
        0x90..=0x9F => frame.stack.swap(usize::from(byte - 0x8F))?,
        _ => return Err(VmError::InvalidOpcode(byte)),
    }
    frame.pc += 1;
    Ok(None)
}

fn flag(value: bool) -> U256 {
    if value {
        U256::one()
    } else {
        U256::zero()
    }
}

fn binary(frame: &mut Frame, op: impl FnOnce(U256, U256) -> U256) -> Result<(), VmError> {
    let [a, b] = frame.stack.pop_n::<2>()?;
    frame.stack.push(op(a, b))
}

/// Prices a copy into `[dest, dest + size)`: memory growth plus the
/// per-word copy charge.
fn charge_copy(frame: &mut Frame, dest: U256, size: U256) -> Result<(usize, usize), VmError> {
    let (dest, size) = frame.touch_memory(dest, size)?;
    frame.meter.charge(gas::copy_cost(size))?;
    Ok((dest, size))
}

fn jump_target(frame: &Frame, dest: U256) -> Result<usize, VmError> {
    if !frame.code.is_valid_jump(dest) {
        return Err(VmError::InvalidJump(dest));
    }
    as_usize(dest)
}

fn halt_data(frame: &mut Frame) -> Result<Bytes, VmError> {
    let [offset, size] = frame.stack.pop_n::<2>()?;
    let (offset, size) = frame.touch_memory(offset, size)?;
    Ok(Bytes::from_vec(frame.memory.read_bytes(offset, size)))
}

/// 32 bytes of `data` from `offset`, zero-padded past the end.
fn load_word(data: &[u8], offset: U256) -> U256 {
    let mut word = [0u8; 32];
    if let Ok(start) = usize::try_from(offset) {
        if start < data.len() {
            let available = (data.len() - start).min(32);
            word[..available].copy_from_slice(&data[start..start + available]);
        }
    }
    U256::from_big_endian(&word)
}

/// PUSHn immediate starting at `start`; bytes past the end of code read as
/// zero and the value stays right-aligned as if they were present.
fn push_immediate(code: &[u8], start: usize, size: usize) -> U256 {
    let mut word = [0u8; 32];
    let available = code.len().saturating_sub(start).min(size);
    let first = 32 - size;
    word[first..first + available].copy_from_slice(&code[start..start + available]);
    U256::from_big_endian(&word)
}

// =============================================================================
// TESTS
// =============================================================================
