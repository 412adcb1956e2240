//! # Error Types
//!
//! In-frame aborts ([`VmError`]), the outward [`FailureKind`] every
//! execution result carries, and the collaborator/config error enums.

use crate::domain::value_objects::{Address, U256};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// FAILURE KIND
// =============================================================================

/// Why an execution did not succeed.
///
/// Exactly one kind is attached to every unsuccessful [`ExecutionResult`].
///
/// [`ExecutionResult`]: crate::domain::entities::ExecutionResult
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureKind {
    /// Gas exhausted (also used for aborts and collaborator failures).
    OutOfGas,
    /// Instruction needed more operands than the stack held.
    StackUnderflow,
    /// Instruction would push past the stack limit.
    StackOverflow,
    /// Unknown or inactive opcode, or INVALID (0xFE).
    InvalidInstruction,
    /// Jump to a byte that is not a JUMPDEST instruction.
    InvalidJumpTarget,
    /// State mutation attempted in a static context.
    StaticStateChangeError,
    /// Sender cannot cover the transferred value.
    InsufficientBalance,
    /// Creation target already has code or a non-zero nonce.
    CreateCollision,
    /// Deployed code or init code over the configured limit.
    CodeSizeExceeded,
    /// Explicit REVERT. The only kind that preserves return data.
    RevertedByContract,
    /// Nested call beyond the depth limit.
    CallDepthExceeded,
}

impl FailureKind {
    /// True when the failure consumes every unit of gas granted to the frame.
    #[must_use]
    pub const fn consumes_all_gas(&self) -> bool {
        !matches!(self, Self::RevertedByContract)
    }
}

// =============================================================================
// VM ERRORS
// =============================================================================

/// Errors that abort an executing frame.
#[derive(Debug, Error, Clone)]
pub enum VmError {
    /// Execution ran out of gas.
    #[error("out of gas")]
    OutOfGas,

    /// Stack overflow (>1024 items).
    #[error("stack overflow")]
    StackOverflow,

    /// Stack underflow (pop from empty stack).
    #[error("stack underflow")]
    StackUnderflow,

    /// Invalid opcode encountered.
    #[error("invalid opcode: 0x{0:02X}")]
    InvalidOpcode(u8),

    /// Invalid jump destination.
    #[error("invalid jump destination: {0}")]
    InvalidJump(U256),

    /// Call depth exceeded maximum.
    #[error("call depth exceeded: {depth} > {max}")]
    CallDepthExceeded {
        /// Depth the call would have run at.
        depth: usize,
        /// Configured limit.
        max: usize,
    },

    /// Deployed code size exceeded limit (EIP-170).
    #[error("code size exceeded: {size} > {max} bytes")]
    CodeSizeExceeded {
        /// Returned code length.
        size: usize,
        /// Configured limit.
        max: usize,
    },

    /// Init code size exceeded limit (EIP-3860).
    #[error("init code size exceeded: {size} > {max} bytes")]
    InitCodeSizeExceeded {
        /// Init code length.
        size: usize,
        /// Configured limit.
        max: usize,
    },

    /// Attempted to modify state in static context.
    #[error("write operation in static context")]
    WriteInStaticContext,

    /// Insufficient balance for transfer.
    #[error("insufficient balance: required {required}, available {available}")]
    InsufficientBalance {
        /// Value to transfer.
        required: U256,
        /// Sender balance.
        available: U256,
    },

    /// Contract already exists at CREATE address.
    #[error("contract already exists at address: {0:?}")]
    ContractAlreadyExists(Address),

    /// Creator nonce cannot be incremented.
    #[error("nonce overflow for {0:?}")]
    NonceOverflow(Address),

    /// Code starts with 0xEF (EIP-3541).
    #[error("code starts with 0xEF byte")]
    InvalidCodePrefix,

    /// Memory expansion would exceed limit.
    #[error("memory limit exceeded: {requested} > {max} bytes")]
    MemoryLimitExceeded {
        /// Requested size in bytes.
        requested: usize,
        /// Configured limit.
        max: usize,
    },

    /// Return data out of bounds (RETURNDATACOPY).
    #[error("return data out of bounds: offset {offset}, size {size}, available {available}")]
    ReturnDataOutOfBounds {
        /// Requested offset.
        offset: U256,
        /// Requested size.
        size: U256,
        /// Buffer length.
        available: usize,
    },

    /// State access error.
    #[error("state error: {0}")]
    State(#[from] StateError),

    /// Precompile failure.
    #[error("precompile error: {0}")]
    Precompile(#[from] PrecompileError),

    /// Execution cancelled through an abort handle.
    #[error("execution aborted")]
    Aborted,
}

impl VmError {
    /// Maps the error to its outward failure kind.
    #[must_use]
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::OutOfGas
            | Self::MemoryLimitExceeded { .. }
            | Self::ReturnDataOutOfBounds { .. }
            | Self::State(_)
            | Self::Precompile(_)
            | Self::Aborted => FailureKind::OutOfGas,
            Self::StackOverflow => FailureKind::StackOverflow,
            Self::StackUnderflow => FailureKind::StackUnderflow,
            Self::InvalidOpcode(_) | Self::InvalidCodePrefix => FailureKind::InvalidInstruction,
            Self::InvalidJump(_) => FailureKind::InvalidJumpTarget,
            Self::CallDepthExceeded { .. } => FailureKind::CallDepthExceeded,
            Self::CodeSizeExceeded { .. } | Self::InitCodeSizeExceeded { .. } => {
                FailureKind::CodeSizeExceeded
            }
            Self::WriteInStaticContext => FailureKind::StaticStateChangeError,
            Self::InsufficientBalance { .. } => FailureKind::InsufficientBalance,
            Self::ContractAlreadyExists(_) | Self::NonceOverflow(_) => FailureKind::CreateCollision,
        }
    }
}

// =============================================================================
// STATE ERRORS
// =============================================================================

/// Errors raised by the state collaborator.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StateError {
    /// Checkpoint token is not the innermost open checkpoint.
    #[error("checkpoint {0} is not the innermost open checkpoint")]
    InvalidCheckpoint(u64),

    /// Balance arithmetic overflowed.
    #[error("balance overflow for {0:?}")]
    BalanceOverflow(Address),

    /// Balance would go negative.
    #[error("balance underflow for {0:?}")]
    BalanceUnderflow(Address),

    /// State backend unavailable.
    #[error("state backend unavailable")]
    Unavailable,

    /// Other state error.
    #[error("state error: {0}")]
    Other(String),
}

// =============================================================================
// PRECOMPILE ERRORS
// =============================================================================

/// Errors from precompiled contract execution.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PrecompileError {
    /// Invalid input length.
    #[error("invalid input length: expected {expected}, got {actual}")]
    InvalidInputLength {
        /// Required length.
        expected: usize,
        /// Supplied length.
        actual: usize,
    },

    /// Invalid input data.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Gas limit below the built-in's cost.
    #[error("precompile out of gas: cost {cost}, limit {limit}")]
    OutOfGas {
        /// Required gas.
        cost: u64,
        /// Gas available.
        limit: u64,
    },
}

// =============================================================================
// CONFIG ERRORS
// =============================================================================

/// Errors loading or validating protocol configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Static cost table does not cover every opcode byte.
    #[error("static cost table has {0} entries, expected 256")]
    CostTableLength(usize),

    /// Revision name not recognised.
    #[error("unknown protocol revision: {0}")]
    UnknownRevision(String),

    /// Numeric knob out of range.
    #[error("invalid value for {field}: {reason}")]
    InvalidValue {
        /// Field name.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },

    /// JSON could not be parsed.
    #[error("protocol config parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Configuration file could not be read.
    #[error("cannot read {path}: {source}")]
    Io {
        /// File path.
        path: String,
        /// Underlying error.
        source: std::io::Error,
    },
}

// =============================================================================
// TESTS
// =============================================================================
