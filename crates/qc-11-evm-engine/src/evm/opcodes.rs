//! # EVM Opcodes
//!
//! The closed instruction set (one [`Opcode`] variant per defined byte) and
//! the 256-entry [`INSTRUCTION_TABLE`] the interpreter dispatches through.
//! Each entry carries the operand-stack arity checked before execution.
//!
//! Instructions introduced after Istanbul name the [`Feature`] that must be
//! active; [`instruction_table_for`] filters the table for one protocol
//! configuration.

use crate::config::FeatureFlags;

/// Static facts about one instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InstructionInfo {
    /// The instruction.
    pub opcode: Opcode,
    /// Words popped.
    pub inputs: u8,
    /// Words pushed.
    pub outputs: u8,
}

/// Revision feature an instruction depends on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Feature {
    /// BASEFEE (EIP-3198).
    BaseFee,
    /// PUSH0 (EIP-3855).
    Push0,
    /// TLOAD / TSTORE (EIP-1153).
    TransientStorage,
    /// MCOPY (EIP-5656).
    MCopy,
}

impl Feature {
    /// True when `flags` enables this feature.
    #[must_use]
    pub const fn enabled_in(self, flags: &FeatureFlags) -> bool {
        match self {
            Self::BaseFee => flags.base_fee_opcode,
            Self::Push0 => flags.push0,
            Self::TransientStorage => flags.transient_storage,
            Self::MCopy => flags.mcopy,
        }
    }
}

macro_rules! instruction_set {
    ($($name:ident = $byte:literal, $inputs:literal, $outputs:literal;)*) => {
        /// One variant per defined opcode byte.
        #[allow(missing_docs)]
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        #[repr(u8)]
        pub enum Opcode {
            $($name = $byte,)*
        }

        /// Dispatch table indexed by opcode byte; `None` for undefined bytes.
        pub static INSTRUCTION_TABLE: [Option<InstructionInfo>; 256] = {
            let mut table: [Option<InstructionInfo>; 256] = [None; 256];
            $(
                table[$byte] = Some(InstructionInfo {
                    opcode: Opcode::$name,
                    inputs: $inputs,
                    outputs: $outputs,
                });
            )*
            table
        };
    };
}

#[rustfmt::skip]
instruction_set! {
    // 0x00 - Stop and Arithmetic
    Stop = 0x00, 0, 0;
    Add = 0x01, 2, 1;
    Mul = 0x02, 2, 1;
    Sub = 0x03, 2, 1;
    Div = 0x04, 2, 1;
    SDiv = 0x05, 2, 1;
    Mod = 0x06, 2, 1;
    SMod = 0x07, 2, 1;
    AddMod = 0x08, 3, 1;
    MulMod = 0x09, 3, 1;
    Exp = 0x0A, 2, 1;
    SignExtend = 0x0B, 2, 1;

    // 0x10 - Comparison & Bitwise
    Lt = 0x10, 2, 1;
    Gt = 0x11, 2, 1;
    SLt = 0x12, 2, 1;
    SGt = 0x13, 2, 1;
    Eq = 0x14, 2, 1;
    IsZero = 0x15, 1, 1;
    And = 0x16, 2, 1;
    Or = 0x17, 2, 1;
    Xor = 0x18, 2, 1;
    Not = 0x19, 1, 1;
    Byte = 0x1A, 2, 1;
    Shl = 0x1B, 2, 1;
    Shr = 0x1C, 2, 1;
    Sar = 0x1D, 2, 1;

    Keccak256 = 0x20, 2, 1;

    // 0x30 - Environmental Information
    Address = 0x30, 0, 1;
    Balance = 0x31, 1, 1;
    Origin = 0x32, 0, 1;
    Caller = 0x33, 0, 1;
    CallValue = 0x34, 0, 1;
    CallDataLoad = 0x35, 1, 1;
    CallDataSize = 0x36, 0, 1;
    CallDataCopy = 0x37, 3, 0;
    CodeSize = 0x38, 0, 1;
    CodeCopy = 0x39, 3, 0;
    GasPrice = 0x3A, 0, 1;
    ExtCodeSize = 0x3B, 1, 1;
    ExtCodeCopy = 0x3C, 4, 0;
    ReturnDataSize = 0x3D, 0, 1;
    ReturnDataCopy = 0x3E, 3, 0;
    ExtCodeHash = 0x3F, 1, 1;

    // 0x40 - Block Information
    BlockHash = 0x40, 1, 1;
    Coinbase = 0x41, 0, 1;
    Timestamp = 0x42, 0, 1;
    Number = 0x43, 0, 1;
    PrevRandao = 0x44, 0, 1;
    GasLimit = 0x45, 0, 1;
    ChainId = 0x46, 0, 1;
    SelfBalance = 0x47, 0, 1;
    BaseFee = 0x48, 0, 1;

    // 0x50 - Stack, Memory, Storage, Flow
    Pop = 0x50, 1, 0;
    MLoad = 0x51, 1, 1;
    MStore = 0x52, 2, 0;
    MStore8 = 0x53, 2, 0;
    SLoad = 0x54, 1, 1;
    SStore = 0x55, 2, 0;
    Jump = 0x56, 1, 0;
    JumpI = 0x57, 2, 0;
    Pc = 0x58, 0, 1;
    MSize = 0x59, 0, 1;
    Gas = 0x5A, 0, 1;
    JumpDest = 0x5B, 0, 0;
    TLoad = 0x5C, 1, 1;
    TStore = 0x5D, 2, 0;
    MCopy = 0x5E, 3, 0;
    Push0 = 0x5F, 0, 1;

    // 0x60 - Push
    Push1 = 0x60, 0, 1;
    Push2 = 0x61, 0, 1;
    Push3 = 0x62, 0, 1;
    Push4 = 0x63, 0, 1;
    Push5 = 0x64, 0, 1;
    Push6 = 0x65, 0, 1;
    Push7 = 0x66, 0, 1;
    Push8 = 0x67, 0, 1;
    Push9 = 0x68, 0, 1;
    Push10 = 0x69, 0, 1;
    Push11 = 0x6A, 0, 1;
    Push12 = 0x6B, 0, 1;
    Push13 = 0x6C, 0, 1;
    Push14 = 0x6D, 0, 1;
    Push15 = 0x6E, 0, 1;
    Push16 = 0x6F, 0, 1;
    Push17 = 0x70, 0, 1;
    Push18 = 0x71, 0, 1;
    Push19 = 0x72, 0, 1;
    Push20 = 0x73, 0, 1;
    Push21 = 0x74, 0, 1;
    Push22 = 0x75, 0, 1;
    Push23 = 0x76, 0, 1;
    Push24 = 0x77, 0, 1;
    Push25 = 0x78, 0, 1;
    Push26 = 0x79, 0, 1;
    Push27 = 0x7A, 0, 1;
    Push28 = 0x7B, 0, 1;
    Push29 = 0x7C, 0, 1;
    Push30 = 0x7D, 0, 1;
    Push31 = 0x7E, 0, 1;
    Push32 = 0x7F, 0, 1;

    // 0x80 - Dup (DUPn needs n words and adds one)
    Dup1 = 0x80, 1, 2;
    Dup2 = 0x81, 2, 3;
    Dup3 = 0x82, 3, 4;
    Dup4 = 0x83, 4, 5;
    Dup5 = 0x84, 5, 6;
    Dup6 = 0x85, 6, 7;
    Dup7 = 0x86, 7, 8;
    Dup8 = 0x87, 8, 9;
    Dup9 = 0x88, 9, 10;
    Dup10 = 0x89, 10, 11;
    Dup11 = 0x8A, 11, 12;
    Dup12 = 0x8B, 12, 13;
    Dup13 = 0x8C, 13, 14;
    Dup14 = 0x8D, 14, 15;
    Dup15 = 0x8E, 15, 16;
    Dup16 = 0x8F, 16, 17;

    // 0x90 - Swap (SWAPn touches n+1 words)
    Swap1 = 0x90, 2, 2;
    Swap2 = 0x91, 3, 3;
    Swap3 = 0x92, 4, 4;
    Swap4 = 0x93, 5, 5;
    Swap5 = 0x94, 6, 6;
    Swap6 = 0x95, 7, 7;
    Swap7 = 0x96, 8, 8;
    Swap8 = 0x97, 9, 9;
    Swap9 = 0x98, 10, 10;
    Swap10 = 0x99, 11, 11;
    Swap11 = 0x9A, 12, 12;
    Swap12 = 0x9B, 13, 13;
    Swap13 = 0x9C, 14, 14;
    Swap14 = 0x9D, 15, 15;
    Swap15 = 0x9E, 16, 16;
    Swap16 = 0x9F, 17, 17;

    // 0xA0 - Log
    Log0 = 0xA0, 2, 0;
    Log1 = 0xA1, 3, 0;
    Log2 = 0xA2, 4, 0;
    Log3 = 0xA3, 5, 0;
    Log4 = 0xA4, 6, 0;

    // 0xF0 - System
    Create = 0xF0, 3, 1;
    Call = 0xF1, 7, 1;
    CallCode = 0xF2, 7, 1;
    Return = 0xF3, 2, 0;
    DelegateCall = 0xF4, 6, 1;
    Create2 = 0xF5, 4, 1;
    StaticCall = 0xFA, 6, 1;
    Revert = 0xFD, 2, 0;
    Invalid = 0xFE, 0, 0;
    SelfDestruct = 0xFF, 1, 0;
}

impl Opcode {
    /// The opcode byte.
    #[must_use]
    pub const fn byte(self) -> u8 {
        self as u8
    }

    /// Feature that must be active for the opcode to be defined.
    #[must_use]
    pub const fn required_feature(self) -> Option<Feature> {
        match self {
            Self::BaseFee => Some(Feature::BaseFee),
            Self::Push0 => Some(Feature::Push0),
            Self::TLoad | Self::TStore => Some(Feature::TransientStorage),
            Self::MCopy => Some(Feature::MCopy),
            _ => None,
        }
    }
}

/// Copies [`INSTRUCTION_TABLE`], dropping instructions `flags` leaves inactive.
#[must_use]
pub fn instruction_table_for(flags: &FeatureFlags) -> [Option<InstructionInfo>; 256] {
    let mut table = INSTRUCTION_TABLE;
    for entry in &mut table {
        let inactive = entry
            .and_then(|info| info.opcode.required_feature())
            .is_some_and(|feature| !feature.enabled_in(flags));
        if inactive {
            *entry = None;
        }
    }
    table
}

// =============================================================================
// TESTS
// =============================================================================
