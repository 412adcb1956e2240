//! # Execution Frame
//!
//! Mutable state of one call or creation. Frames live in the dispatcher's
//! frame stack; a frame never references its parent. What it needs to hand
//! a sub-call's result back to its own stack and memory is kept in
//! [`PendingReturn`].

use crate::config::ProtocolConfig;
use crate::domain::entities::{Log, Message};
use crate::domain::value_objects::{Address, Bytes, U256};
use crate::errors::VmError;
use crate::evm::analysis::AnalyzedCode;
use crate::evm::gas::GasMeter;
use crate::evm::memory::Memory;
use crate::evm::stack::Stack;
use crate::evm::substate::SubstateCheckpoint;
use crate::ports::outbound::Checkpoint;
use std::sync::Arc;

/// Where a suspended CALL or CREATE wants its result.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PendingReturn {
    /// CALL family: push the success flag, copy output to memory.
    Call {
        /// Memory offset of the output area.
        out_offset: usize,
        /// Size of the output area.
        out_size: usize,
    },
    /// CREATE family: push the new address, or zero on failure.
    Create,
}

/// How an interpreter run ended.
#[derive(Debug)]
pub enum FrameAction {
    /// The frame issued a CALL or CREATE and is suspended until the
    /// dispatcher resumes it with the result.
    SubCall(Box<Message>),
    /// The frame is finished.
    Halt(Halt),
}

/// Terminal state of a frame.
#[derive(Debug)]
pub enum Halt {
    /// STOP, end of code, or SELFDESTRUCT.
    Stop,
    /// RETURN with its data.
    Return(Bytes),
    /// REVERT with its data.
    Revert(Bytes),
    /// Exceptional abort.
    Failed(VmError),
}

/// Per-call execution state.
#[derive(Debug)]
pub struct Frame {
    /// The message being executed.
    pub message: Message,
    /// Account whose storage and balance the code runs against.
    pub address: Address,
    /// CALLDATA (empty for init code).
    pub calldata: Bytes,
    /// Code being executed.
    pub code: Arc<AnalyzedCode>,
    /// Program counter.
    pub pc: usize,
    /// Operand stack.
    pub stack: Stack,
    /// Linear memory.
    pub memory: Memory,
    /// Output of the most recent sub-call.
    pub return_data: Bytes,
    /// Gas budget and refund counter.
    pub meter: GasMeter,
    /// Logs emitted by this frame and its committed children.
    pub logs: Vec<Log>,
    /// State checkpoint opened when the frame was entered.
    pub checkpoint: Checkpoint,
    /// Substate position at entry.
    pub substate_checkpoint: SubstateCheckpoint,
    /// Set while a sub-call is outstanding.
    pub pending: Option<PendingReturn>,
}

impl Frame {
    /// Builds a frame for `message` running `code` against `address`.
    #[must_use]
    pub fn new(
        message: Message,
        address: Address,
        code: Arc<AnalyzedCode>,
        checkpoint: Checkpoint,
        substate_checkpoint: SubstateCheckpoint,
        config: &ProtocolConfig,
    ) -> Self {
        let calldata = if message.kind.is_create() {
            Bytes::new()
        } else {
            message.input.clone()
        };
        Self {
            meter: GasMeter::new(message.gas_limit),
            message,
            address,
            calldata,
            code,
            pc: 0,
            stack: Stack::with_limit(config.max_stack_size),
            memory: Memory::with_limit(config.max_memory_size),
            return_data: Bytes::new(),
            logs: Vec::new(),
            checkpoint,
            substate_checkpoint,
            pending: None,
        }
    }

    /// Static context flag.
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.message.is_static
    }

    /// Call depth.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.message.depth
    }

    /// Fails with `WriteInStaticContext` inside a static frame.
    ///
    /// # Errors
    ///
    /// `WriteInStaticContext` when the frame is static.
    pub fn ensure_writable(&self) -> Result<(), VmError> {
        if self.is_static() {
            return Err(VmError::WriteInStaticContext);
        }
        Ok(())
    }

    /// Prices and performs the memory growth needed to touch
    /// `[offset, offset + size)`, returning the region as `usize`.
    ///
    /// A zero-size region touches nothing and costs nothing regardless of
    /// `offset`.
    ///
    /// # Errors
    ///
    /// `OutOfGas` when the region is unaddressable or unaffordable.
    pub fn touch_memory(&mut self, offset: U256, size: U256) -> Result<(usize, usize), VmError> {
        if size.is_zero() {
            return Ok((0, 0));
        }
        let offset = as_usize(offset)?;
        let size = as_usize(size)?;
        let end = offset.checked_add(size).ok_or(VmError::OutOfGas)?;
        let cost = self.memory.expansion_cost(end)?;
        self.meter.charge(cost)?;
        self.memory.expand(end)?;
        Ok((offset, size))
    }
}

/// Converts a stack word used as a size or offset; anything that does not
/// fit could never be paid for.
///
/// # Errors
///
/// `OutOfGas` when `value` exceeds `usize::MAX`.
pub fn as_usize(value: U256) -> Result<usize, VmError> {
    usize::try_from(value).map_err(|_| VmError::OutOfGas)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Revision;
    use crate::evm::substate::Substate;

    fn frame(gas: u64) -> Frame {
        let config = ProtocolConfig::for_revision(Revision::Cancun);
        let message = Message::call(
            Address::ZERO,
            Address::new([1u8; 20]),
            U256::zero(),
            Bytes::from_vec(vec![1, 2, 3]),
            gas,
        );
        Frame::new(
            message,
            Address::new([1u8; 20]),
            Arc::new(AnalyzedCode::new(Bytes::new())),
            Checkpoint::new(0),
            Substate::new().checkpoint(),
            &config,
        )
    }

    #[test]
    fn test_touch_memory_charges_expansion() {
        let mut f = frame(100);
        assert_eq!(f.touch_memory(U256::zero(), U256::from(32)).unwrap(), (0, 32));
        assert_eq!(f.meter.remaining(), 97);
        assert_eq!(f.memory.len(), 32);
        // Already paid
        f.touch_memory(U256::from(10), U256::from(10)).unwrap();
        assert_eq!(f.meter.remaining(), 97);
    }

    #[test]
    fn test_touch_memory_zero_size_is_free() {
        let mut f = frame(0);
        assert_eq!(f.touch_memory(U256::MAX, U256::zero()).unwrap(), (0, 0));
        assert!(f.memory.is_empty());
    }

    #[test]
    fn test_touch_memory_unaffordable_leaves_memory_alone() {
        let mut f = frame(2);
        assert!(matches!(
            f.touch_memory(U256::zero(), U256::from(32)),
            Err(VmError::OutOfGas)
        ));
        assert!(f.memory.is_empty());
        assert!(matches!(
            f.touch_memory(U256::MAX, U256::one()),
            Err(VmError::OutOfGas)
        ));
    }

    #[test]
    fn test_calldata_for_call() {
        let f = frame(10);
        assert_eq!(f.calldata.as_slice(), &[1, 2, 3]);
        assert!(!f.is_static());
        assert_eq!(f.depth(), 0);
    }
}
