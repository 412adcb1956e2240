//! # QC-11 EVM Engine - Bytecode Execution Subsystem
//!
//! **Subsystem ID:** 11
//!
//! ## Purpose
//!
//! Deterministic EVM execution: instruction interpretation, gas metering,
//! nested call and creation dispatch, precompiled contracts, and the
//! checkpoint/commit/revert discipline tying execution to an external state
//! collaborator. Revisions Istanbul through Cancun are supported through
//! data-driven [`config::ProtocolConfig`] tables.
//!
//! ## Domain Invariants
//!
//! | Invariant | Enforcement Location |
//! |-----------|---------------------|
//! | Operand stack depth within `[0, 1024]` | `evm/stack.rs` - `Stack::require()` before every instruction |
//! | Gas never negative; failed charges leave no side effect | `evm/gas.rs` - `GasMeter::charge()` |
//! | Memory charged for the highest byte ever touched | `evm/frame.rs` - `Frame::touch_memory()` |
//! | Jump targets only on instruction-start JUMPDEST | `evm/analysis.rs` - `JumpTable::analyze()` |
//! | Call depth within `[0, 1024]` | `evm/dispatcher.rs` - `CallDispatcher::enter()` |
//! | No state change survives a revert | `evm/dispatcher.rs` - checkpoint per entered message |
//! | No writes in a static context | `evm/frame.rs` - `Frame::ensure_writable()` |
//!
//! ## Outbound Dependencies
//!
//! | Collaborator | Trait | Purpose |
//! |--------------|-------|---------|
//! | State | `StateAccess` + `JournalBridge` | Accounts, storage, checkpoints |
//! | Chain | `BlockHashOracle` | BLOCKHASH for the 256 preceding blocks |
//!
//! ## EVM Components
//!
//! | Component | Location | Purpose |
//! |-----------|----------|---------|
//! | Interpreter | `evm/interpreter.rs` | Fetch, check, charge, execute |
//! | Dispatcher | `evm/dispatcher.rs` | Frame stack, CALL/CREATE, checkpoints |
//! | Frame | `evm/frame.rs` | Per-call stack, memory, gas |
//! | Gas | `evm/gas.rs` | Meter, dynamic costs, SSTORE netting |
//! | Substate | `evm/substate.rs` | Warm set, transient storage, self-destructs |
//! | Precompiles | `evm/precompiles/` | ecrecover, sha256, ripemd160, identity, modexp, blake2f |
//!
//! ## Usage Example
//!
//! ```ignore
//! use qc_11_evm_engine::prelude::*;
//!
//! let state = JournaledState::new();
//! state.seed_balance(sender, U256::from(1_000_000));
//! let engine = EvmEngine::new(state, EngineConfig::for_revision(Revision::Cancun));
//!
//! let message = Message::call(sender, contract, U256::zero(), calldata, 100_000);
//! let result = engine.run_call(message, &env).await;
//! if result.success {
//!     tracing::info!(gas_used = result.gas_used, "call succeeded");
//! }
//! ```

// Crate-level lints
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::similar_names)]

// =============================================================================
// MODULES
// =============================================================================

pub mod adapters;
pub mod config;
pub mod domain;
pub mod engine;
pub mod errors;
pub mod evm;
pub mod ports;

// =============================================================================
// PRELUDE
// =============================================================================

/// Convenient re-exports for common usage.
pub mod prelude {
    // Domain entities
    pub use crate::domain::entities::{
        AccessListItem, AccountState, BlockContext, CallKind, Environment, ExecutionResult, Log,
        Message,
    };

    // Value objects
    pub use crate::domain::value_objects::{
        Address, Bytes, Hash, StorageKey, StorageValue, U256,
    };

    // Domain services
    pub use crate::domain::services::{create2_address, create_address, keccak256};

    // Configuration
    pub use crate::config::{EngineConfig, FeatureFlags, ProtocolConfig, Revision};

    // Ports
    pub use crate::ports::inbound::ExecutionApi;
    pub use crate::ports::outbound::{
        BlockHashOracle, Checkpoint, JournalBridge, StateAccess, StateCollaborator,
    };

    // Errors
    pub use crate::errors::{ConfigError, FailureKind, PrecompileError, StateError, VmError};

    // Adapters
    pub use crate::adapters::{InMemoryBlockHashes, JournaledState};

    // Engine
    pub use crate::engine::{AbortHandle, EngineStats, EvmEngine};
}

// =============================================================================
// CRATE INFO
// =============================================================================

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Subsystem ID.
pub const SUBSYSTEM_ID: u8 = 11;

/// Subsystem name.
pub const SUBSYSTEM_NAME: &str = "EVM Engine";

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subsystem_id() {
        assert_eq!(SUBSYSTEM_ID, 11);
    }

    #[test]
    fn test_prelude_exports() {
        use prelude::*;
        let _ = EngineConfig::default();
        let _ = Address::ZERO;
        assert_eq!(Revision::default(), Revision::Cancun);
    }
}
