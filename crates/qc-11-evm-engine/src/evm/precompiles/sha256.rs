//! # SHA256 Precompile (0x02)

use super::{linear_cost, Precompile};
use crate::domain::services::precompiles;
use crate::domain::value_objects::{Address, Bytes};
use crate::errors::PrecompileError;
use sha2::{Digest, Sha256};

const SHA256_BASE_COST: u64 = 60;
const SHA256_WORD_COST: u64 = 12;

/// SHA-256 of the input.
pub struct Sha256Precompile;

impl Precompile for Sha256Precompile {
    fn address(&self) -> Address {
        precompiles::SHA256
    }

    fn required_gas(&self, input: &[u8]) -> u64 {
        linear_cost(SHA256_BASE_COST, SHA256_WORD_COST, input.len())
    }

    fn run(&self, input: &[u8]) -> Result<Bytes, PrecompileError> {
        Ok(Bytes::from_slice(&Sha256::digest(input)))
    }
}
