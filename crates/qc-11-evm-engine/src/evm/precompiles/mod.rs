//! # Precompile Dispatcher
//!
//! Built-in contracts at fixed low addresses. A call whose code address is
//! an enabled built-in never reaches the interpreter: the dispatcher prices
//! the input, charges it against the forwarded gas and runs the native
//! routine.
//!
//! | Address | Contract | Pricing |
//! |---------|----------|---------|
//! | `0x01` | ecrecover | 3000 |
//! | `0x02` | SHA-256 | 60 + 12/word |
//! | `0x03` | RIPEMD-160 | 600 + 120/word |
//! | `0x04` | identity | 15 + 3/word |
//! | `0x05` | modexp | EIP-198 or EIP-2565 |
//! | `0x06` | alt_bn128 add | 150 |
//! | `0x07` | alt_bn128 mul | 6000 |
//! | `0x08` | alt_bn128 pairing | 45000 + 34000/pair |
//! | `0x09` | blake2f | 1/round |
//! | `0x0a` | KZG point evaluation (Cancun) | 50000 |
//!
//! The set is taken from [`ProtocolConfig::precompiles`]; an address whose
//! built-in is not active behaves like an empty account.

pub mod blake2f;
pub mod bn128;
pub mod ecrecover;
pub mod identity;
pub mod modexp;
pub mod point_evaluation;
pub mod ripemd160;
pub mod sha256;

use crate::config::{PrecompileId, ProtocolConfig};
use crate::domain::value_objects::{Address, Bytes};
use crate::errors::PrecompileError;
use std::collections::BTreeMap;
use std::fmt;

/// Result of a successful built-in invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrecompileOutput {
    /// Gas charged.
    pub gas_used: u64,
    /// Output data.
    pub output: Bytes,
}

/// A native contract.
pub trait Precompile: Send + Sync {
    /// Address the contract is reachable at.
    fn address(&self) -> Address;

    /// Gas needed to run on `input`. Saturates at `u64::MAX`.
    fn required_gas(&self, input: &[u8]) -> u64;

    /// Runs the contract. Only called after [`Self::required_gas`] was paid.
    ///
    /// # Errors
    ///
    /// Malformed input the contract rejects outright. Such a call fails and
    /// consumes all forwarded gas.
    fn run(&self, input: &[u8]) -> Result<Bytes, PrecompileError>;
}

/// The built-ins enabled by one protocol configuration.
pub struct PrecompileTable {
    contracts: BTreeMap<Address, Box<dyn Precompile>>,
}

impl PrecompileTable {
    /// Instantiates every built-in listed in `config.precompiles`.
    #[must_use]
    pub fn for_config(config: &ProtocolConfig) -> Self {
        let contracts = config
            .precompiles
            .iter()
            .map(|id| build(*id, config))
            .map(|contract| (contract.address(), contract))
            .collect();
        Self { contracts }
    }

    /// True when `address` hosts an enabled built-in.
    #[must_use]
    pub fn contains(&self, address: &Address) -> bool {
        self.contracts.contains_key(address)
    }

    /// Enabled addresses in ascending order.
    pub fn addresses(&self) -> impl Iterator<Item = Address> + '_ {
        self.contracts.keys().copied()
    }

    /// Number of enabled built-ins.
    #[must_use]
    pub fn len(&self) -> usize {
        self.contracts.len()
    }

    /// True when no built-in is enabled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }

    /// Runs the built-in at `address` with `gas_limit` available.
    ///
    /// Returns `None` when `address` is not a built-in. Otherwise the inner
    /// result is `OutOfGas` if the price exceeds `gas_limit`, or whatever
    /// the contract itself reports.
    #[must_use]
    pub fn invoke(
        &self,
        address: &Address,
        input: &[u8],
        gas_limit: u64,
    ) -> Option<Result<PrecompileOutput, PrecompileError>> {
        let contract = self.contracts.get(address)?;
        let cost = contract.required_gas(input);
        if cost > gas_limit {
            return Some(Err(PrecompileError::OutOfGas {
                cost,
                limit: gas_limit,
            }));
        }
        Some(contract.run(input).map(|output| PrecompileOutput {
            gas_used: cost,
            output,
        }))
    }
}

impl fmt::Debug for PrecompileTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.contracts.keys()).finish()
    }
}

fn build(id: PrecompileId, config: &ProtocolConfig) -> Box<dyn Precompile> {
    match id {
        PrecompileId::Ecrecover => Box::new(ecrecover::Ecrecover),
        PrecompileId::Sha256 => Box::new(sha256::Sha256Precompile),
        PrecompileId::Ripemd160 => Box::new(ripemd160::Ripemd160Precompile),
        PrecompileId::Identity => Box::new(identity::Identity),
        PrecompileId::ModExp => Box::new(modexp::ModExp::new(config.features.modexp_eip2565)),
        PrecompileId::Bn128Add => Box::new(bn128::Bn128Add),
        PrecompileId::Bn128Mul => Box::new(bn128::Bn128Mul),
        PrecompileId::Bn128Pairing => Box::new(bn128::Bn128Pairing),
        PrecompileId::Blake2f => Box::new(blake2f::Blake2f),
        PrecompileId::PointEvaluation => Box::new(point_evaluation::PointEvaluation),
    }
}

/// `base + per_word * ceil(len / 32)`, saturating.
pub(crate) fn linear_cost(base: u64, per_word: u64, len: usize) -> u64 {
    let words = len.div_ceil(32) as u64;
    base.saturating_add(per_word.saturating_mul(words))
}

// =============================================================================
// TESTS
// =============================================================================
