//! # EVM Implementation
//!
//! ## Components
//!
//! - `opcodes.rs` - instruction set and dispatch table
//! - `interpreter.rs` - Interpreter Loop
//! - `dispatcher.rs` - Call/Create Dispatcher and frame stack
//! - `frame.rs` - Execution Frame
//! - `gas.rs` - Resource Meter and dynamic costs
//! - `memory.rs`, `stack.rs` - frame storage
//! - `analysis.rs` - jump destinations and the code cache
//! - `arithmetic.rs` - 256-bit signed and modular helpers
//! - `substate.rs` - per-transaction warm set, transient storage, self-destructs
//! - `precompiles/` - Precompile Dispatcher

pub mod analysis;
pub mod arithmetic;
pub mod dispatcher;
pub mod frame;
pub mod gas;
pub mod interpreter;
pub mod memory;
pub mod opcodes;
pub mod precompiles;
pub mod stack;
pub mod substate;

pub use analysis::{AnalyzedCode, CodeCache};
pub use dispatcher::{CallDispatcher, FrameOutcome};
pub use frame::{Frame, FrameAction, Halt};
pub use gas::GasMeter;
pub use interpreter::Interpreter;
pub use memory::Memory;
pub use opcodes::{InstructionInfo, Opcode, INSTRUCTION_TABLE};
pub use stack::Stack;
pub use substate::{AccessStatus, Substate};
