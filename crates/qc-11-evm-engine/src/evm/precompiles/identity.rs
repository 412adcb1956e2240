//! # Identity Precompile (0x04)
//!
//! Returns its input unchanged.

use super::{linear_cost, Precompile};
use crate::domain::services::precompiles;
use crate::domain::value_objects::{Address, Bytes};
use crate::errors::PrecompileError;

const IDENTITY_BASE_COST: u64 = 15;
const IDENTITY_WORD_COST: u64 = 3;

/// Identity precompile.
pub struct Identity;

impl Precompile for Identity {
    fn address(&self) -> Address {
        precompiles::IDENTITY
    }

    fn required_gas(&self, input: &[u8]) -> u64 {
        linear_cost(IDENTITY_BASE_COST, IDENTITY_WORD_COST, input.len())
    }

    fn run(&self, input: &[u8]) -> Result<Bytes, PrecompileError> {
        Ok(Bytes::from_slice(input))
    }
}
