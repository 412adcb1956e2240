//! # Resource Meter
//!
//! [`GasMeter`] tracks one frame's budget and refund counter. The free
//! functions price the dynamic parts of instructions. Static per-opcode
//! costs live in [`ProtocolConfig::static_costs`].
//!
//! [`ProtocolConfig::static_costs`]: crate::config::ProtocolConfig

use crate::config::ProtocolConfig;
use crate::domain::value_objects::{StorageValue, U256};
use crate::errors::VmError;

// =============================================================================
// FIXED COSTS
// =============================================================================

/// Dynamic cost constants shared by every supported revision.
pub mod costs {
    /// Gas per word for memory copy.
    pub const COPY_WORD: u64 = 3;
    /// KECCAK256 cost per word (also CREATE2 hashing).
    pub const KECCAK256_WORD: u64 = 6;
    /// LOG cost per topic.
    pub const LOG_TOPIC: u64 = 375;
    /// LOG cost per byte of data.
    pub const LOG_DATA: u64 = 8;
    /// EXP cost per byte of exponent.
    pub const EXP_BYTE: u64 = 50;
}

// =============================================================================
// GAS METER
// =============================================================================

/// Gas budget of one frame.
///
/// ## Invariants
/// - `remaining <= limit`
/// - A failed [`charge`](Self::charge) leaves the meter untouched.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GasMeter {
    limit: u64,
    remaining: u64,
    refund: i64,
}

impl GasMeter {
    /// Creates a meter with `limit` available.
    #[must_use]
    pub const fn new(limit: u64) -> Self {
        Self {
            limit,
            remaining: limit,
            refund: 0,
        }
    }

    /// Gas still available.
    #[must_use]
    pub const fn remaining(&self) -> u64 {
        self.remaining
    }

    /// Gas spent so far.
    #[must_use]
    pub const fn used(&self) -> u64 {
        self.limit - self.remaining
    }

    /// Refund counter. Can be negative inside a frame that undoes a refund
    /// granted by an ancestor.
    #[must_use]
    pub const fn refund(&self) -> i64 {
        self.refund
    }

    /// Deducts `amount`.
    ///
    /// # Errors
    ///
    /// Returns `OutOfGas` when `amount` exceeds what remains.
    pub fn charge(&mut self, amount: u64) -> Result<(), VmError> {
        if amount > self.remaining {
            return Err(VmError::OutOfGas);
        }
        self.remaining -= amount;
        Ok(())
    }

    /// Gives back gas a child frame did not use.
    pub fn reclaim(&mut self, amount: u64) {
        self.remaining = self.remaining.saturating_add(amount).min(self.limit);
    }

    /// Credits the refund counter.
    pub fn add_refund(&mut self, amount: u64) {
        self.refund = self.refund.saturating_add(to_signed(amount));
    }

    /// Takes back a refund credited earlier.
    pub fn remove_refund(&mut self, amount: u64) {
        self.refund = self.refund.saturating_sub(to_signed(amount));
    }

    /// Adds a committed child's refund counter.
    pub fn merge_refund(&mut self, child_refund: i64) {
        self.refund = self.refund.saturating_add(child_refund);
    }
}

fn to_signed(amount: u64) -> i64 {
    i64::try_from(amount).unwrap_or(i64::MAX)
}

/// Refund actually granted: the counter, floored at zero and capped at
/// `gas_used / quotient`.
#[must_use]
pub fn capped_refund(gas_used: u64, refund: i64, quotient: u64) -> u64 {
    let refund = u64::try_from(refund).unwrap_or(0);
    refund.min(gas_used / quotient.max(1))
}

// =============================================================================
// DYNAMIC COSTS
// =============================================================================

/// Number of 32-byte words covering `size` bytes.
#[must_use]
pub fn word_count(size: usize) -> u64 {
    size.div_ceil(32) as u64
}

/// Per-byte part of EXP.
#[must_use]
pub fn exp_cost(exponent: U256) -> u64 {
    let bytes = u64::from(256 - exponent.leading_zeros()).div_ceil(8);
    costs::EXP_BYTE * bytes
}

/// Per-word part of KECCAK256 and of CREATE2 init code hashing.
#[must_use]
pub fn keccak_word_cost(size: usize) -> u64 {
    costs::KECCAK256_WORD.saturating_mul(word_count(size))
}

/// Per-word part of the copy instructions.
#[must_use]
pub fn copy_cost(size: usize) -> u64 {
    costs::COPY_WORD.saturating_mul(word_count(size))
}

/// Topic and data part of LOGn.
#[must_use]
pub fn log_cost(topics: usize, size: usize) -> u64 {
    (topics as u64 * costs::LOG_TOPIC).saturating_add((size as u64).saturating_mul(costs::LOG_DATA))
}

/// Gas a CALL-family instruction hands to its callee (EIP-150): the
/// requested amount, capped at all but one 64th of what remains.
#[must_use]
pub fn forwarded_gas(remaining: u64, requested: U256) -> u64 {
    let cap = remaining - remaining / 64;
    if requested > U256::from(cap) {
        cap
    } else {
        requested.low_u64()
    }
}

/// Gas a CREATE-family instruction hands to the init code.
#[must_use]
pub const fn create_gas(remaining: u64) -> u64 {
    remaining - remaining / 64
}

// =============================================================================
// SSTORE
// =============================================================================

/// Charge and refund adjustment for one SSTORE.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SstoreCost {
    /// Gas to charge.
    pub gas: u64,
    /// Change to the refund counter.
    pub refund_delta: i64,
}

/// Prices an SSTORE from the slot's transaction-start (`original`),
/// current and new values (EIP-2200, EIP-2929 and EIP-3529 rules, with
/// magnitudes from `config`).
#[must_use]
pub fn sstore_cost(
    config: &ProtocolConfig,
    original: StorageValue,
    current: StorageValue,
    new: StorageValue,
    cold: bool,
) -> SstoreCost {
    let warm_read = config.warm_storage_read_cost;
    let clear = to_signed(config.sstore_clear_refund);
    let mut gas = if cold { config.sstore_cold_cost } else { 0 };
    let mut refund_delta = 0i64;

    if current == new {
        return SstoreCost {
            gas: gas + warm_read,
            refund_delta,
        };
    }

    if original == current {
        if original.is_zero() {
            gas += config.sstore_set_cost;
        } else {
            gas += config.sstore_reset_cost;
            if new.is_zero() {
                refund_delta += clear;
            }
        }
        return SstoreCost { gas, refund_delta };
    }

    // Slot already dirty in this transaction
    gas += warm_read;
    if !original.is_zero() {
        if current.is_zero() {
            refund_delta -= clear;
        } else if new.is_zero() {
            refund_delta += clear;
        }
    }
    if original == new {
        let restored = if original.is_zero() {
            config.sstore_set_cost
        } else {
            config.sstore_reset_cost
        };
        refund_delta += to_signed(restored.saturating_sub(warm_read));
    }

    SstoreCost { gas, refund_delta }
}

// =============================================================================
// TESTS
// =============================================================================
