//! # Protocol Configuration
//!
//! Versioned, immutable protocol parameters: which instructions and
//! precompiles exist, what every opcode costs statically, and the numeric
//! knobs of the dynamic cost rules. Tables are plain data. They can be built
//! for a known [`Revision`] or loaded wholesale from JSON, and the engine
//! never mutates them after construction.
//!
//! ## Environment Variables
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | `QC_EVM_REVISION` | `cancun` | revision whose default table is used |
//! | `QC_EVM_PROTOCOL_FILE` | unset | JSON [`ProtocolConfig`] replacing the default table |
//! | `QC_EVM_JUMPDEST_CACHE` | `1024` | analysed-code cache capacity |

use crate::errors::ConfigError;
use crate::evm::opcodes::{instruction_table_for, InstructionInfo};
use crate::evm::precompiles::PrecompileTable;
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

// =============================================================================
// REVISION
// =============================================================================

/// Protocol revision (hard fork).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Revision {
    /// Istanbul.
    Istanbul,
    /// Berlin (EIP-2929 warm/cold accounting).
    Berlin,
    /// London (EIP-3529 refunds, BASEFEE).
    London,
    /// Paris (PREVRANDAO).
    Paris,
    /// Shanghai (PUSH0, init code limit).
    Shanghai,
    /// Cancun (transient storage, MCOPY, EIP-6780).
    #[default]
    Cancun,
}

impl Revision {
    /// Every supported revision, oldest first.
    pub const ALL: [Self; 6] = [
        Self::Istanbul,
        Self::Berlin,
        Self::London,
        Self::Paris,
        Self::Shanghai,
        Self::Cancun,
    ];

    /// Lower-case name used in configuration.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Istanbul => "istanbul",
            Self::Berlin => "berlin",
            Self::London => "london",
            Self::Paris => "paris",
            Self::Shanghai => "shanghai",
            Self::Cancun => "cancun",
        }
    }

    /// Feature flags active in this revision.
    #[must_use]
    pub fn features(self) -> FeatureFlags {
        FeatureFlags {
            access_lists: self >= Self::Berlin,
            modexp_eip2565: self >= Self::Berlin,
            base_fee_opcode: self >= Self::London,
            reject_ef_code: self >= Self::London,
            prevrandao: self >= Self::Paris,
            push0: self >= Self::Shanghai,
            warm_coinbase: self >= Self::Shanghai,
            initcode_limit: self >= Self::Shanghai,
            transient_storage: self >= Self::Cancun,
            mcopy: self >= Self::Cancun,
            selfdestruct_only_same_tx: self >= Self::Cancun,
            kzg_point_evaluation: self >= Self::Cancun,
        }
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Revision {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|rev| rev.name() == wanted)
            .ok_or_else(|| ConfigError::UnknownRevision(s.to_string()))
    }
}

// =============================================================================
// FEATURE FLAGS
// =============================================================================

/// Behaviour switches, each tied to one protocol change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct FeatureFlags {
    /// EIP-2929 warm/cold surcharges.
    pub access_lists: bool,
    /// EIP-2565 modexp pricing.
    pub modexp_eip2565: bool,
    /// EIP-3198 BASEFEE opcode.
    pub base_fee_opcode: bool,
    /// EIP-3541 rejection of deployed code starting with 0xEF.
    pub reject_ef_code: bool,
    /// EIP-4399 opcode 0x44 returns randomness instead of difficulty.
    pub prevrandao: bool,
    /// EIP-3855 PUSH0.
    pub push0: bool,
    /// EIP-3651 coinbase pre-warmed.
    pub warm_coinbase: bool,
    /// EIP-3860 init code limit and per-word charge.
    pub initcode_limit: bool,
    /// EIP-1153 TLOAD/TSTORE.
    pub transient_storage: bool,
    /// EIP-5656 MCOPY.
    pub mcopy: bool,
    /// EIP-6780 SELFDESTRUCT deletes only same-transaction creations.
    pub selfdestruct_only_same_tx: bool,
    /// EIP-4844 point evaluation built-in at 0x0a.
    pub kzg_point_evaluation: bool,
}

// =============================================================================
// PRECOMPILE IDS
// =============================================================================

/// Built-in contracts a configuration can enable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrecompileId {
    /// 0x01
    Ecrecover,
    /// 0x02
    Sha256,
    /// 0x03
    Ripemd160,
    /// 0x04
    Identity,
    /// 0x05
    #[serde(rename = "modexp")]
    ModExp,
    /// 0x06
    Bn128Add,
    /// 0x07
    Bn128Mul,
    /// 0x08
    Bn128Pairing,
    /// 0x09
    Blake2f,
    /// 0x0a, from Cancun (EIP-4844)
    PointEvaluation,
}

impl PrecompileId {
    /// Built-ins available from Istanbul onward.
    pub const ISTANBUL_SET: [Self; 9] = [
        Self::Ecrecover,
        Self::Sha256,
        Self::Ripemd160,
        Self::Identity,
        Self::ModExp,
        Self::Bn128Add,
        Self::Bn128Mul,
        Self::Bn128Pairing,
        Self::Blake2f,
    ];

    /// Built-ins enabled by `features`, in address order.
    #[must_use]
    pub fn enabled_by(features: &FeatureFlags) -> Vec<Self> {
        let mut set = Self::ISTANBUL_SET.to_vec();
        if features.kzg_point_evaluation {
            set.push(Self::PointEvaluation);
        }
        set
    }
}

// =============================================================================
// PROTOCOL CONFIG
// =============================================================================

/// Immutable parameter table for one protocol revision.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolConfig {
    /// Revision this table describes.
    pub revision: Revision,
    /// Active behaviour switches.
    pub features: FeatureFlags,
    /// Static gas per opcode byte, exactly 256 entries.
    pub static_costs: Vec<u64>,
    /// Extra charge for a cold account touch (BALANCE, EXT*, CALL*).
    pub cold_account_surcharge: u64,
    /// Charge for a cold SELFDESTRUCT beneficiary.
    pub selfdestruct_cold_cost: u64,
    /// Extra charge for a cold SLOAD.
    pub cold_slot_surcharge: u64,
    /// Charge for SSTORE on a cold slot.
    pub sstore_cold_cost: u64,
    /// Warm storage read; also the SSTORE no-op and dirty-slot cost.
    pub warm_storage_read_cost: u64,
    /// SSTORE turning a clean zero slot non-zero.
    pub sstore_set_cost: u64,
    /// SSTORE changing a clean non-zero slot.
    pub sstore_reset_cost: u64,
    /// Refund for clearing a slot.
    pub sstore_clear_refund: u64,
    /// SSTORE fails when no more than this much gas remains.
    pub sstore_sentry: u64,
    /// Refund for SELFDESTRUCT (zero from London).
    pub selfdestruct_refund: u64,
    /// Refund cap divisor: refund <= `gas_used` / quotient.
    pub refund_quotient: u64,
    /// Extra charge for a value-bearing call.
    pub call_value_cost: u64,
    /// Extra charge for sending value to an empty account.
    pub new_account_cost: u64,
    /// Gas added to the callee's allowance on value-bearing calls.
    pub call_stipend: u64,
    /// Charge per deployed code byte.
    pub code_deposit_cost: u64,
    /// Charge per init code word (EIP-3860).
    pub initcode_word_cost: u64,
    /// Largest deployable code (EIP-170).
    pub max_code_size: usize,
    /// Largest init code (EIP-3860).
    pub max_initcode_size: usize,
    /// Deepest nested call.
    pub max_call_depth: usize,
    /// Operand stack limit.
    pub max_stack_size: usize,
    /// Frame memory ceiling in bytes.
    pub max_memory_size: usize,
    /// Enabled built-in contracts.
    pub precompiles: Vec<PrecompileId>,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self::for_revision(Revision::default())
    }
}

impl ProtocolConfig {
    /// Builds the standard table for `revision`.
    #[must_use]
    pub fn for_revision(revision: Revision) -> Self {
        let features = revision.features();
        let berlin = features.access_lists;
        let london = revision >= Revision::London;

        Self {
            revision,
            features,
            static_costs: static_cost_table(berlin),
            cold_account_surcharge: if berlin { 2500 } else { 0 },
            selfdestruct_cold_cost: if berlin { 2600 } else { 0 },
            cold_slot_surcharge: if berlin { 2000 } else { 0 },
            sstore_cold_cost: if berlin { 2100 } else { 0 },
            warm_storage_read_cost: if berlin { 100 } else { 800 },
            sstore_set_cost: 20_000,
            sstore_reset_cost: if berlin { 2900 } else { 5000 },
            sstore_clear_refund: if london { 4800 } else { 15_000 },
            sstore_sentry: 2300,
            selfdestruct_refund: if london { 0 } else { 24_000 },
            refund_quotient: if london { 5 } else { 2 },
            call_value_cost: 9000,
            new_account_cost: 25_000,
            call_stipend: 2300,
            code_deposit_cost: 200,
            initcode_word_cost: 2,
            max_code_size: 24_576,
            max_initcode_size: 49_152,
            max_call_depth: 1024,
            max_stack_size: 1024,
            max_memory_size: 16 * 1024 * 1024,
            precompiles: PrecompileId::enabled_by(&features),
        }
    }

    /// Parses and validates a JSON table.
    ///
    /// # Errors
    ///
    /// `Parse` for malformed JSON, otherwise whatever [`Self::validate`] rejects.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serializes the table to pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns `Parse` if serialization fails.
    pub fn to_json_string(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Checks structural constraints the engine relies on.
    ///
    /// # Errors
    ///
    /// `CostTableLength` for a table that is not 256 long, `InvalidValue` for
    /// a zero refund quotient or zero limits.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.static_costs.len() != 256 {
            return Err(ConfigError::CostTableLength(self.static_costs.len()));
        }
        if self.refund_quotient == 0 {
            return Err(ConfigError::InvalidValue {
                field: "refund_quotient",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.max_stack_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_stack_size",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Static gas for an opcode byte.
    #[must_use]
    pub fn static_cost(&self, byte: u8) -> u64 {
        self.static_costs
            .get(usize::from(byte))
            .copied()
            .unwrap_or(0)
    }
}

/// Static costs. From Berlin, state-touching instructions pay the warm cost
/// up front and the cold surcharge dynamically.
fn static_cost_table(access_lists: bool) -> Vec<u64> {
    const BASE: u64 = 2;
    const VERY_LOW: u64 = 3;
    const LOW: u64 = 5;
    const MID: u64 = 8;
    const HIGH: u64 = 10;

    let account_read = if access_lists { 100 } else { 700 };
    let sload = if access_lists { 100 } else { 800 };
    let call = if access_lists { 100 } else { 700 };

    let mut table = vec![0u64; 256];

    table[0x01] = VERY_LOW; // ADD
    table[0x02] = LOW; // MUL
    table[0x03] = VERY_LOW; // SUB
    for byte in 0x04..=0x07 {
        table[byte] = LOW; // DIV SDIV MOD SMOD
    }
    table[0x08] = MID; // ADDMOD
    table[0x09] = MID; // MULMOD
    table[0x0A] = HIGH; // EXP
    table[0x0B] = LOW; // SIGNEXTEND
    for byte in 0x10..=0x1D {
        table[byte] = VERY_LOW;
    }
    table[0x20] = 30; // KECCAK256

    for byte in [0x30, 0x32, 0x33, 0x34, 0x36, 0x38, 0x3A, 0x3D] {
        table[byte] = BASE;
    }
    for byte in [0x35, 0x37, 0x39, 0x3E] {
        table[byte] = VERY_LOW;
    }
    for byte in [0x31, 0x3B, 0x3C, 0x3F] {
        table[byte] = account_read;
    }

    table[0x40] = 20; // BLOCKHASH
    for byte in [0x41, 0x42, 0x43, 0x44, 0x45, 0x46, 0x48] {
        table[byte] = BASE;
    }
    table[0x47] = LOW; // SELFBALANCE

    table[0x50] = BASE; // POP
    table[0x51] = VERY_LOW; // MLOAD
    table[0x52] = VERY_LOW; // MSTORE
    table[0x53] = VERY_LOW; // MSTORE8
    table[0x54] = sload; // SLOAD
    table[0x56] = MID; // JUMP
    table[0x57] = HIGH; // JUMPI
    table[0x58] = BASE; // PC
    table[0x59] = BASE; // MSIZE
    table[0x5A] = BASE; // GAS
    table[0x5B] = 1; // JUMPDEST
    table[0x5C] = 100; // TLOAD
    table[0x5D] = 100; // TSTORE
    table[0x5E] = VERY_LOW; // MCOPY
    table[0x5F] = BASE; // PUSH0
    for byte in 0x60..=0x9F {
        table[byte] = VERY_LOW; // PUSH, DUP, SWAP
    }
    for byte in 0xA0..=0xA4 {
        table[byte] = 375; // LOG base
    }

    table[0xF0] = 32_000; // CREATE
    table[0xF5] = 32_000; // CREATE2
    for byte in [0xF1, 0xF2, 0xF4, 0xFA] {
        table[byte] = call;
    }
    table[0xFF] = 5000; // SELFDESTRUCT

    table
}

// =============================================================================
// REVISION RULES
// =============================================================================

/// A [`ProtocolConfig`] together with the lookup structures derived from it.
///
/// Built once per engine and shared read-only by every execution.
#[derive(Debug)]
pub struct RevisionRules {
    protocol: Arc<ProtocolConfig>,
    instructions: [Option<InstructionInfo>; 256],
    precompiles: PrecompileTable,
}

impl RevisionRules {
    /// Derives the instruction and precompile tables from `protocol`.
    #[must_use]
    pub fn new(protocol: Arc<ProtocolConfig>) -> Self {
        let instructions = instruction_table_for(&protocol.features);
        let precompiles = PrecompileTable::for_config(&protocol);
        Self {
            protocol,
            instructions,
            precompiles,
        }
    }

    /// The underlying parameter table.
    #[must_use]
    pub fn protocol(&self) -> &ProtocolConfig {
        &self.protocol
    }

    /// Shared handle to the parameter table.
    #[must_use]
    pub fn protocol_arc(&self) -> Arc<ProtocolConfig> {
        Arc::clone(&self.protocol)
    }

    /// Active features.
    #[must_use]
    pub fn features(&self) -> &FeatureFlags {
        &self.protocol.features
    }

    /// Instruction active at `byte`, if any.
    #[must_use]
    pub fn instruction(&self, byte: u8) -> Option<InstructionInfo> {
        self.instructions[usize::from(byte)]
    }

    /// Active built-in contracts.
    #[must_use]
    pub fn precompiles(&self) -> &PrecompileTable {
        &self.precompiles
    }
}

// =============================================================================
// ENGINE CONFIG
// =============================================================================

/// Default capacity of the analysed-code cache.
pub const DEFAULT_JUMPDEST_CACHE: usize = 1024;

/// Engine construction parameters.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Protocol table shared by every execution and every clone.
    pub protocol: Arc<ProtocolConfig>,
    /// Analysed-code cache capacity (0 disables caching).
    pub jumpdest_cache_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::for_revision(Revision::default())
    }
}

impl EngineConfig {
    /// Standard configuration for `revision`.
    #[must_use]
    pub fn for_revision(revision: Revision) -> Self {
        Self::with_protocol(ProtocolConfig::for_revision(revision))
    }

    /// Wraps an explicit protocol table.
    #[must_use]
    pub fn with_protocol(protocol: ProtocolConfig) -> Self {
        Self {
            protocol: Arc::new(protocol),
            jumpdest_cache_capacity: DEFAULT_JUMPDEST_CACHE,
        }
    }

    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Unknown revision names, unreadable or invalid protocol files.
    pub fn from_env() -> Result<Self, ConfigError> {
        let revision = match env::var("QC_EVM_REVISION") {
            Ok(name) => name.parse()?,
            Err(_) => Revision::default(),
        };

        let protocol = match env::var("QC_EVM_PROTOCOL_FILE") {
            Ok(path) => {
                let json = std::fs::read_to_string(&path)
                    .map_err(|source| ConfigError::Io { path, source })?;
                ProtocolConfig::from_json_str(&json)?
            }
            Err(_) => ProtocolConfig::for_revision(revision),
        };

        let jumpdest_cache_capacity = env::var("QC_EVM_JUMPDEST_CACHE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_JUMPDEST_CACHE);

        Ok(Self {
            protocol: Arc::new(protocol),
            jumpdest_cache_capacity,
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================
