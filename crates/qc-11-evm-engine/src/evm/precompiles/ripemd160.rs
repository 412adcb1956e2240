//! # RIPEMD-160 Precompile (0x03)
//!
//! The 20-byte digest is returned left-padded to a full word.

use super::{linear_cost, Precompile};
use crate::domain::services::precompiles;
use crate::domain::value_objects::{Address, Bytes};
use crate::errors::PrecompileError;
use ripemd::{Digest, Ripemd160};

const RIPEMD160_BASE_COST: u64 = 600;
const RIPEMD160_WORD_COST: u64 = 120;

/// RIPEMD-160 of the input.
pub struct Ripemd160Precompile;

impl Precompile for Ripemd160Precompile {
    fn address(&self) -> Address {
        precompiles::RIPEMD160
    }

    fn required_gas(&self, input: &[u8]) -> u64 {
        linear_cost(RIPEMD160_BASE_COST, RIPEMD160_WORD_COST, input.len())
    }

    fn run(&self, input: &[u8]) -> Result<Bytes, PrecompileError> {
        let digest = Ripemd160::digest(input);
        let mut word = vec![0u8; 32];
        word[12..].copy_from_slice(&digest);
        Ok(Bytes::from_vec(word))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ripemd160_empty() {
        let out = Ripemd160Precompile.run(&[]).unwrap();
        assert_eq!(out.len(), 32);
        assert_eq!(
            hex::encode(out.as_slice()),
            "0000000000000000000000009c1185a5c5e9fc54612808977ee8f548b2258d31"
        );
    }

    #[test]
    fn test_ripemd160_pricing() {
        assert_eq!(Ripemd160Precompile.required_gas(&[]), 600);
        assert_eq!(Ripemd160Precompile.required_gas(&[0u8; 64]), 840);
    }
}
